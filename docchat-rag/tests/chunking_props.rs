//! Property tests for recursive chunking.

use docchat_rag::chunking::{Chunker, RecursiveChunker, reconstruct};
use docchat_rag::document::Document;
use proptest::prelude::*;

/// Text built from words, spaces, line breaks and paragraph breaks, with some
/// multi-byte characters mixed in.
fn arb_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            4 => "[a-zé]{1,12}",
            2 => Just(" ".to_string()),
            1 => Just("\n".to_string()),
            1 => Just("\n\n".to_string()),
            1 => "[a-z]{20,60}",
        ],
        0..120,
    )
    .prop_map(|parts| parts.concat())
}

/// A valid `(chunk_size, chunk_overlap)` pair.
fn arb_sizes() -> impl Strategy<Value = (usize, usize)> {
    (1usize..80).prop_flat_map(|size| (Just(size), 0..size))
}

mod prop_chunking {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn chunks_reconstruct_the_document(text in arb_text(), (size, overlap) in arb_sizes()) {
            let chunker = RecursiveChunker::new(size, overlap).unwrap();
            let chunks = chunker.chunk(&Document::new("doc.md", text.clone()));
            prop_assert_eq!(reconstruct(&chunks), text);
        }

        #[test]
        fn chunks_respect_the_size_limit(text in arb_text(), (size, overlap) in arb_sizes()) {
            let chunker = RecursiveChunker::new(size, overlap).unwrap();
            for chunk in chunker.chunk(&Document::new("doc.md", text)) {
                prop_assert!(!chunk.text.is_empty());
                prop_assert!(chunk.text.chars().count() <= size);
            }
        }

        #[test]
        fn consecutive_chunks_overlap_at_most_the_configured_amount(
            text in arb_text(),
            (size, overlap) in arb_sizes(),
        ) {
            let document = Document::new("doc.md", text);
            let chunker = RecursiveChunker::new(size, overlap).unwrap();
            let chunks = chunker.chunk(&document);
            for pair in chunks.windows(2) {
                prop_assert!(pair[1].offset > pair[0].offset);
                let shared = pair[0].end().saturating_sub(pair[1].offset);
                let shared_chars = document.raw_text[pair[1].offset..pair[1].offset + shared].chars().count();
                prop_assert!(shared_chars <= overlap);
            }
        }

        #[test]
        fn chunking_is_deterministic(text in arb_text(), (size, overlap) in arb_sizes()) {
            let chunker = RecursiveChunker::new(size, overlap).unwrap();
            let document = Document::new("doc.md", text);
            prop_assert_eq!(chunker.chunk(&document), chunker.chunk(&document));
        }

        #[test]
        fn chunk_ids_follow_sequence(text in arb_text(), (size, overlap) in arb_sizes()) {
            let chunker = RecursiveChunker::new(size, overlap).unwrap();
            for (i, chunk) in chunker.chunk(&Document::new("guide/doc.md", text)).iter().enumerate() {
                prop_assert_eq!(chunk.sequence_index, i);
                prop_assert_eq!(&chunk.id, &format!("guide/doc.md_{i}"));
                prop_assert_eq!(chunk.source_id.as_str(), "guide/doc.md");
            }
        }
    }
}
