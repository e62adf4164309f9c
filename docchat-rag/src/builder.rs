//! The offline build phase: corpus → chunks → embeddings → index.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};

use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::RagConfig;
use crate::document::{Chunk, Document, IndexEntry};
use crate::embedding::EmbeddingGateway;
use crate::error::{RagError, Result};
use crate::index::VectorIndex;
use crate::loader::{CorpusLoader, SkippedFile};

/// Summary of a completed build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    /// Documents that were loaded and chunked.
    pub document_count: usize,
    /// Files that matched but could not be read.
    #[serde(skip)]
    pub skipped: Vec<SkippedFile>,
    /// Chunks written to the index.
    pub chunk_count: usize,
    /// Embedding dimension of the index.
    pub dimension: usize,
    /// Embedding model recorded in the index.
    pub model_id: String,
}

/// Builds a [`VectorIndex`] from a documentation directory.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::{IndexBuilder, RagConfig};
///
/// let builder = IndexBuilder::new(embeddings, RagConfig::default())?;
/// let report = builder.build_and_save("docs", "docchat_index").await?;
/// println!("indexed {} chunks", report.chunk_count);
/// ```
pub struct IndexBuilder {
    embeddings: EmbeddingGateway,
    chunker: Arc<dyn Chunker>,
    extensions: Vec<String>,
}

impl std::fmt::Debug for IndexBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexBuilder")
            .field("embeddings", &self.embeddings)
            .field("extensions", &self.extensions)
            .finish()
    }
}

impl IndexBuilder {
    /// Create a builder that chunks with a [`RecursiveChunker`] configured
    /// from `config` and loads `.md` files.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `config` is invalid.
    pub fn new(embeddings: EmbeddingGateway, config: RagConfig) -> Result<Self> {
        config.validate()?;
        let chunker = RecursiveChunker::from_config(&config)?;
        Ok(Self { embeddings, chunker: Arc::new(chunker), extensions: vec!["md".to_string()] })
    }

    /// Replace the chunker.
    pub fn with_chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = chunker;
        self
    }

    /// Replace the set of file extensions loaded from the corpus.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Load, chunk and embed every document under `root`.
    ///
    /// Unreadable files are skipped and listed in the report.
    ///
    /// # Errors
    ///
    /// - [`RagError::EmbeddingBackendUnavailable`] if the backend is unusable
    /// - [`RagError::CorpusNotFound`] if `root` is missing or not a directory
    /// - [`RagError::EmptyCorpus`] if `root` yields no documents or no chunks
    /// - any embedding error, which aborts the build
    pub async fn build(&self, root: impl AsRef<Path>) -> Result<(VectorIndex, BuildReport)> {
        let root = root.as_ref();
        self.embeddings.ensure_available()?;

        let loader = CorpusLoader::new(root).with_extensions(self.extensions.iter().cloned());
        let paths = loader.discover()?;
        if paths.is_empty() {
            return Err(RagError::EmptyCorpus(format!(
                "no documents under {}",
                root.display()
            )));
        }

        let mut documents = loader.documents(paths);
        let loaded: Vec<Document> = documents.by_ref().collect();
        let skipped = documents.skipped().to_vec();
        if loaded.is_empty() {
            return Err(RagError::EmptyCorpus(format!(
                "none of the files under {} could be read",
                root.display()
            )));
        }

        let (index, mut report) = self.build_from_documents(&loaded).await?;
        report.skipped = skipped;
        Ok((index, report))
    }

    /// Chunk and embed already loaded documents.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmptyCorpus`] if the documents produce no chunks,
    /// or any embedding error.
    pub async fn build_from_documents(
        &self,
        documents: &[Document],
    ) -> Result<(VectorIndex, BuildReport)> {
        let chunks: Vec<Chunk> =
            documents.iter().flat_map(|document| self.chunker.chunk(document)).collect();
        if chunks.is_empty() {
            return Err(RagError::EmptyCorpus("documents produced no chunks".to_string()));
        }

        info!(
            document_count = documents.len(),
            chunk_count = chunks.len(),
            model = self.embeddings.model_id(),
            "embedding chunks"
        );

        let texts: Vec<&str> = chunks.iter().map(|chunk| chunk.text.as_str()).collect();
        let vectors = self.embeddings.embed(&texts).await.map_err(|e| {
            error!(error = %e, "embedding failed, aborting build");
            e
        })?;

        let entries: Vec<IndexEntry> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry { chunk, vector })
            .collect();

        let index =
            VectorIndex::build(self.embeddings.model_id(), self.embeddings.dimensions(), entries)?;
        let report = BuildReport {
            document_count: documents.len(),
            skipped: Vec::new(),
            chunk_count: index.len(),
            dimension: index.dimension(),
            model_id: index.model_id().to_string(),
        };
        Ok((index, report))
    }

    /// Build the index for `root` and persist it to `index_dir`.
    ///
    /// Nothing is written unless the whole build succeeds.
    pub async fn build_and_save(
        &self,
        root: impl AsRef<Path>,
        index_dir: impl AsRef<Path>,
    ) -> Result<BuildReport> {
        let index_dir = index_dir.as_ref();
        let (index, report) = self.build(root).await?;
        index.save(index_dir)?;
        info!(
            path = %index_dir.display(),
            chunk_count = report.chunk_count,
            skipped = report.skipped.len(),
            "index saved"
        );
        Ok(report)
    }
}
