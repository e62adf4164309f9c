//! Property tests for vector index search and persistence.

use docchat_rag::document::{Chunk, IndexEntry};
use docchat_rag::index::VectorIndex;
use proptest::prelude::*;

const DIM: usize = 16;

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map("non-zero embedding", |mut v| {
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm < 1e-8 {
            return None;
        }
        for val in &mut v {
            *val /= norm;
        }
        Some(v)
    })
}

fn arb_entries() -> impl Strategy<Value = Vec<IndexEntry>> {
    proptest::collection::vec(("[a-z ]{5,30}", arb_normalized_embedding(DIM)), 1..20).prop_map(
        |items| {
            items
                .into_iter()
                .enumerate()
                .map(|(i, (text, vector))| IndexEntry {
                    chunk: Chunk {
                        id: format!("doc.md_{i}"),
                        source_id: "doc.md".to_string(),
                        text,
                        sequence_index: i,
                        offset: 0,
                    },
                    vector,
                })
                .collect()
        },
    )
}

mod prop_index_search {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_bounded_by_k(
            entries in arb_entries(),
            query in arb_normalized_embedding(DIM),
            k in 1usize..25,
        ) {
            let count = entries.len();
            let index = VectorIndex::build("test-model", DIM, entries).unwrap();
            let results = index.search(&query, k).unwrap();

            prop_assert_eq!(results.len(), k.min(count));
            for pair in results.windows(2) {
                prop_assert!(
                    pair[0].score >= pair[1].score,
                    "scores not descending: {} < {}",
                    pair[0].score,
                    pair[1].score
                );
            }
        }

        #[test]
        fn saved_index_answers_like_the_original(
            entries in arb_entries(),
            query in arb_normalized_embedding(DIM),
            k in 1usize..25,
        ) {
            let dir = tempfile::tempdir().unwrap();
            let index = VectorIndex::build("test-model", DIM, entries).unwrap();
            index.save(dir.path()).unwrap();
            let loaded = VectorIndex::load(dir.path(), DIM).unwrap();

            prop_assert_eq!(&loaded, &index);
            prop_assert_eq!(loaded.search(&query, k).unwrap(), index.search(&query, k).unwrap());
        }
    }
}

#[test]
fn identical_vectors_keep_insertion_order() {
    let vector = vec![1.0, 0.0, 0.0];
    let entries = (0..4)
        .map(|i| IndexEntry {
            chunk: Chunk {
                id: format!("doc.md_{i}"),
                source_id: "doc.md".to_string(),
                text: format!("chunk {i}"),
                sequence_index: i,
                offset: 0,
            },
            vector: vector.clone(),
        })
        .collect();
    let index = VectorIndex::build("test-model", 3, entries).unwrap();

    let ids: Vec<String> =
        index.search(&vector, 3).unwrap().into_iter().map(|r| r.chunk.id).collect();
    assert_eq!(ids, vec!["doc.md_0", "doc.md_1", "doc.md_2"]);
}
