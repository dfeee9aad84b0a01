use itertools::Itertools;
use rayon::prelude::*;

use crate::{datastore::StoreError, EmbeddingRecord, SearchHit};

/// Cosine similarity of two vectors of equal length.
///
/// A zero-norm vector on either side scores `0.0` instead of producing `NaN`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, StoreError> {
    if a.len() != b.len() {
        return Err(StoreError::DimensionMismatch {
            expected: a.len(),
            found: b.len(),
        });
    }

    let (dot, norm_a, norm_b) = a
        .iter()
        .zip(b)
        .fold((0.0_f32, 0.0_f32, 0.0_f32), |(dot, na, nb), (x, y)| {
            (dot + x * y, na + x * x, nb + y * y)
        });

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Scores every record against `query` and returns the `top_n` best matches,
/// highest score first.
#[tracing::instrument(skip_all, fields(records = records.len(), top_n = top_n))]
pub fn rank(
    query: &[f32],
    records: &[EmbeddingRecord],
    top_n: usize,
) -> Result<Vec<SearchHit>, StoreError> {
    let scores = records
        .par_iter()
        .map(|record| cosine_similarity(query, &record.embedding))
        .collect::<Result<Vec<_>, _>>()?;

    let hits = records
        .iter()
        .zip(scores)
        // stable sort keeps file order for ties
        .sorted_by(|(_, a), (_, b)| b.total_cmp(a))
        .take(top_n)
        .map(|(record, score)| SearchHit {
            text: record.text.clone(),
            source: record.source.clone(),
            score,
        })
        .collect();

    Ok(hits)
}
