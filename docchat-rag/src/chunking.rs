//! Document chunking.
//!
//! This module provides the [`Chunker`] trait and [`RecursiveChunker`], which
//! splits text on the coarsest boundary that keeps pieces under the size limit:
//! paragraph breaks, then line breaks, then word breaks, then characters.
//!
//! Every chunk is a contiguous slice of the source text. Consecutive chunks
//! share at most `chunk_overlap` characters, and [`reconstruct`] rebuilds the
//! original text from the chunks and their offsets.

use crate::config::RagConfig;
use crate::document::{Chunk, Document};
use crate::error::{RagError, Result};

/// Separators tried in priority order. The empty separator means "split
/// between characters".
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// A strategy for splitting documents into chunks.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has empty text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Splits text hierarchically: paragraphs → lines → words → characters.
///
/// Sizes are measured in characters, not bytes.
///
/// # Example
///
/// ```rust,ignore
/// use docchat_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(1000, 200)?;
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] unless `chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 || chunk_overlap >= chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Create a chunker from the sizes in a [`RagConfig`].
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// The maximum chunk size in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// The maximum overlap in characters.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Byte ranges of the chunks of `text`.
    fn ranges(&self, text: &str) -> Vec<(usize, usize)> {
        let mut pieces = Vec::new();
        split_pieces(text, 0, text.len(), self.chunk_size, &SEPARATORS, &mut pieces);
        merge_pieces(&pieces, self.chunk_size, self.chunk_overlap)
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let text = &document.raw_text;
        if text.is_empty() {
            return Vec::new();
        }

        self.ranges(text)
            .into_iter()
            .enumerate()
            .map(|(i, (start, end))| Chunk {
                id: format!("{}_{i}", document.source_id),
                source_id: document.source_id.clone(),
                text: text[start..end].to_string(),
                sequence_index: i,
                offset: start,
            })
            .collect()
    }
}

/// A piece of text that fits in one chunk: a byte range plus its length in
/// characters.
#[derive(Debug, Clone, Copy)]
struct Piece {
    start: usize,
    end: usize,
    chars: usize,
}

/// Split `text[start..end]` into pieces of at most `chunk_size` characters,
/// using the first separator that occurs and recursing with finer separators
/// for pieces that are still too long. Separators stay attached to the
/// preceding piece, so the pieces tile the input exactly.
fn split_pieces(
    text: &str,
    start: usize,
    end: usize,
    chunk_size: usize,
    separators: &[&str],
    out: &mut Vec<Piece>,
) {
    let segment = &text[start..end];
    let chars = segment.chars().count();
    if chars <= chunk_size {
        if chars > 0 {
            out.push(Piece { start, end, chars });
        }
        return;
    }

    match separators.split_first() {
        Some((separator, remaining)) if !separator.is_empty() => {
            let mut piece_start = start;
            for (pos, _) in segment.match_indices(separator) {
                let piece_end = start + pos + separator.len();
                split_pieces(text, piece_start, piece_end, chunk_size, remaining, out);
                piece_start = piece_end;
            }
            if piece_start < end {
                split_pieces(text, piece_start, end, chunk_size, remaining, out);
            }
        }
        _ => split_chars(segment, start, chunk_size, out),
    }
}

/// Split a segment every `chunk_size` characters.
fn split_chars(segment: &str, base: usize, chunk_size: usize, out: &mut Vec<Piece>) {
    let mut piece_start = base;
    let mut count = 0;
    for (offset, _) in segment.char_indices() {
        if count == chunk_size {
            out.push(Piece { start: piece_start, end: base + offset, chars: count });
            piece_start = base + offset;
            count = 0;
        }
        count += 1;
    }
    if count > 0 {
        out.push(Piece { start: piece_start, end: base + segment.len(), chars: count });
    }
}

/// Greedily merge pieces into chunks of at most `chunk_size` characters.
///
/// When a chunk is emitted, its trailing pieces are carried into the next
/// chunk as long as they total at most `chunk_overlap` characters and still
/// leave room for the incoming piece.
fn merge_pieces(pieces: &[Piece], chunk_size: usize, chunk_overlap: usize) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut first = 0;
    let mut total = 0;

    for (i, piece) in pieces.iter().enumerate() {
        if i > first && total + piece.chars > chunk_size {
            ranges.push((pieces[first].start, pieces[i - 1].end));
            // Always drops at least one piece: the window was full.
            while total > chunk_overlap || (total > 0 && total + piece.chars > chunk_size) {
                total -= pieces[first].chars;
                first += 1;
            }
        }
        total += piece.chars;
    }

    if let Some(last) = pieces.last() {
        if first < pieces.len() {
            ranges.push((pieces[first].start, last.end));
        }
    }

    ranges
}

/// Rebuild a document's text from its chunks, dropping the overlapping
/// prefix of each chunk.
///
/// Chunks must be in `sequence_index` order, as produced by a [`Chunker`].
pub fn reconstruct(chunks: &[Chunk]) -> String {
    let mut text = String::new();
    let mut end = 0usize;
    for chunk in chunks {
        let skip = end.saturating_sub(chunk.offset);
        text.push_str(chunk.text.get(skip..).unwrap_or_default());
        end = end.max(chunk.end());
    }
    text
}
