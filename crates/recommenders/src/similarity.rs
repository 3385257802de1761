//! Cosine similarity over dense row vectors.
//!
//! Shared by the TF-IDF book-similarity matrix and the user-user rating
//! similarity matrix. Rows are computed in parallel with Rayon.

use rayon::prelude::*;

/// Dense square similarity table, row-aligned with the input rows
pub type SimilarityMatrix = Vec<Vec<f32>>;

/// Pairwise cosine similarity over the given rows.
///
/// The result is symmetric with a 1.0 diagonal. A pair involving an
/// all-zero row scores 0.0 (no signal), so a degenerate input (every row
/// zero) yields the identity matrix instead of NaNs: each element is
/// similar only to itself.
pub fn cosine_similarity_matrix(rows: &[Vec<f32>]) -> SimilarityMatrix {
    let norms: Vec<f32> = rows.iter().map(|row| norm(row)).collect();

    (0..rows.len())
        .into_par_iter()
        .map(|i| {
            (0..rows.len())
                .map(|j| {
                    if i == j {
                        1.0
                    } else if norms[i] == 0.0 || norms[j] == 0.0 {
                        0.0
                    } else {
                        dot(&rows[i], &rows[j]) / (norms[i] * norms[j])
                    }
                })
                .collect()
        })
        .collect()
}

/// Cosine similarity between two rows; 0.0 when either has no signal
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let (na, nb) = (norm(a), norm(b));
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot(a, b) / (na * nb)
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}
