//! Wiring between settings and the `docchat-rag` build and query phases.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use docchat_rag::{AnsweringSession, BuildReport, EmbeddingGateway, IndexBuilder, VectorIndex};
use tracing::{info, warn};

use crate::settings::Settings;

/// Build the index from the docs directory and save it.
pub async fn build_index(settings: &Settings) -> Result<BuildReport> {
    let config = settings.rag_config()?;
    let embeddings = settings.embedding_gateway(&config)?;
    build_with(settings, &embeddings).await
}

async fn build_with(settings: &Settings, embeddings: &EmbeddingGateway) -> Result<BuildReport> {
    let config = settings.rag_config()?;
    let report = IndexBuilder::new(embeddings.clone(), config)?
        .build_and_save(&settings.docs_path, &settings.index_path)
        .await
        .with_context(|| format!("failed to build index from {}", settings.docs_path.display()))?;

    for skipped in &report.skipped {
        warn!(path = %skipped.path.display(), reason = %skipped.reason, "file was not indexed");
    }
    info!(
        documents = report.document_count,
        chunks = report.chunk_count,
        index = %settings.index_path.display(),
        "index built"
    );
    Ok(report)
}

/// How [`open_session`] obtains its index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSource {
    /// Load the saved index; fail if there is none.
    Existing,
    /// Load the saved index, building it first if there is none.
    BuildIfMissing,
    /// Always rebuild before loading.
    Rebuild,
}

/// Create an answering session over the saved (or freshly built) index.
pub async fn open_session(settings: &Settings, source: IndexSource) -> Result<AnsweringSession> {
    let config = settings.rag_config()?;
    let embeddings = settings.embedding_gateway(&config)?;
    let llm = settings.llm_gateway(&config)?;

    let exists = VectorIndex::file_path(&settings.index_path).exists();
    match source {
        IndexSource::Rebuild => {
            build_with(settings, &embeddings).await?;
        }
        IndexSource::BuildIfMissing if !exists => {
            info!(index = %settings.index_path.display(), "no saved index, building one");
            build_with(settings, &embeddings).await?;
        }
        IndexSource::Existing if !exists => {
            bail!(
                "no index found at {}; run `docchat build` first",
                settings.index_path.display()
            );
        }
        _ => {}
    }

    let index = VectorIndex::load_for_model(
        &settings.index_path,
        embeddings.model_id(),
        embeddings.dimensions(),
    )
    .context("failed to load index")?;

    let session = AnsweringSession::builder()
        .config(config)
        .index(Arc::new(index))
        .embeddings(embeddings)
        .llm(llm)
        .build()?;
    Ok(session)
}
