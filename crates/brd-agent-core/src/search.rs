//! Nearest-neighbor ranking over a result's vector records.
//!
//! A flat cosine-similarity scan is sufficient at the expected corpus size
//! (tens of chunks per document, content length is capped upstream), so no
//! index structure is built. Ties are broken by original insertion order.

use crate::embedding::cosine_similarity;
use crate::models::VectorRecord;

/// A record paired with its similarity score for one query.
#[derive(Debug, Clone)]
pub struct RankedRecord<'a> {
    pub record: &'a VectorRecord,
    pub score: f32,
}

/// Rank `records` by descending cosine similarity to `query` and return the
/// top `k`.
///
/// Equal scores keep their original insertion order (stable sort). Records
/// whose embedding dimensionality differs from the query score `0.0` rather
/// than erroring, so one malformed vector cannot poison retrieval.
pub fn rank_records<'a>(
    records: &'a [VectorRecord],
    query: &[f32],
    k: usize,
) -> Vec<RankedRecord<'a>> {
    let mut ranked: Vec<RankedRecord<'a>> = records
        .iter()
        .map(|record| RankedRecord {
            record,
            score: cosine_similarity(query, &record.embedding),
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(k);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Chunk;

    fn record(text: &str, offset: usize, embedding: Vec<f32>) -> VectorRecord {
        VectorRecord {
            chunk: Chunk {
                text: text.to_string(),
                offset,
            },
            embedding,
        }
    }

    #[test]
    fn test_top_k_descending() {
        let records = vec![
            record("a", 0, vec![1.0, 0.0]),
            record("b", 1, vec![0.0, 1.0]),
            record("c", 2, vec![0.9, 0.1]),
            record("d", 3, vec![0.5, 0.5]),
            record("e", 4, vec![-1.0, 0.0]),
        ];
        let query = vec![1.0, 0.0];

        let top = rank_records(&records, &query, 3);
        let texts: Vec<&str> = top.iter().map(|r| r.record.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "c", "d"]);
        assert!(top[0].score >= top[1].score && top[1].score >= top[2].score);
    }

    #[test]
    fn test_tie_break_insertion_order() {
        // Parallel vectors of different magnitude have identical cosine
        // similarity; the earlier insertion must win.
        let records = vec![
            record("first", 0, vec![2.0, 0.0]),
            record("second", 1, vec![1.0, 0.0]),
            record("third", 2, vec![0.0, 1.0]),
        ];
        let top = rank_records(&records, &[1.0, 0.0], 2);
        assert_eq!(top[0].record.chunk.text, "first");
        assert_eq!(top[1].record.chunk.text, "second");
    }

    #[test]
    fn test_k_larger_than_corpus() {
        let records = vec![record("only", 0, vec![1.0])];
        assert_eq!(rank_records(&records, &[1.0], 3).len(), 1);
    }

    #[test]
    fn test_empty_records() {
        assert!(rank_records(&[], &[1.0, 0.0], 3).is_empty());
    }

    #[test]
    fn test_mismatched_dims_score_zero() {
        let records = vec![
            record("bad", 0, vec![1.0, 0.0, 0.0]),
            record("good", 1, vec![1.0, 0.0]),
        ];
        let top = rank_records(&records, &[1.0, 0.0], 2);
        assert_eq!(top[0].record.chunk.text, "good");
        assert_eq!(top[1].score, 0.0);
    }
}
