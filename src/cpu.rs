// cpu.rs

use crate::engine::{EngineError, SimilarityEngine};
use crate::matrix::SimilarityMatrix;
use crate::vectors::VectorSet;

/// Euclidean norm of every vector in `set`, in order.
pub fn norms(set: &VectorSet) -> Vec<f64> {
    set.iter().map(norm).collect()
}

pub fn norm(v: &[f64]) -> f64 {
    dot_product(v, v).sqrt()
}

/// Linear accumulation in index order. `b` must be at least as long as `a`.
pub fn dot_product(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have the same length");
    let mut sum = 0.0;
    for i in 0..a.len() {
        sum += a[i] * b[i];
    }
    sum
}

/// Pairwise cosine similarity computed on the calling thread.
///
/// Norms are computed once per vector up front, so the pair loop only pays
/// for one dot product per entry.
pub fn cosine_similarity_cpu(lhs: &VectorSet, rhs: &VectorSet) -> SimilarityMatrix {
    let lhs_norms = norms(lhs);
    let rhs_norms = norms(rhs);

    let mut matrix = SimilarityMatrix::zeros(lhs.len(), rhs.len());
    let cols = rhs.len();
    let out = matrix.as_mut_slice();

    for (i, a) in lhs.iter().enumerate() {
        for (j, b) in rhs.iter().enumerate() {
            out[i * cols + j] = dot_product(a, b) / (lhs_norms[i] * rhs_norms[j]);
        }
    }

    matrix
}

/// Single-threaded reference engine. Its output is treated as ground truth.
#[derive(Debug, Default, Clone, Copy)]
pub struct SequentialEngine;

impl SimilarityEngine for SequentialEngine {
    fn name(&self) -> &str {
        "Serial"
    }

    fn compute(&self, lhs: &VectorSet, rhs: &VectorSet) -> Result<SimilarityMatrix, EngineError> {
        Ok(cosine_similarity_cpu(lhs, rhs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(vectors: &[&[f64]]) -> VectorSet {
        VectorSet::new(vectors.iter().map(|v| v.to_vec()).collect()).unwrap()
    }

    #[test]
    fn test_identity_basis() {
        let a = set(&[&[1.0, 0.0], &[0.0, 1.0]]);
        let m = cosine_similarity_cpu(&a, &a);
        assert_eq!(m.to_rows(), vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_known_angle() {
        let a = set(&[&[1.0, 0.0]]);
        let b = set(&[&[1.0, 1.0], &[-1.0, 0.0]]);
        let m = cosine_similarity_cpu(&a, &b);
        assert!((m.get(0, 0) - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-12);
        assert_eq!(m.get(0, 1), -1.0);
    }

    #[test]
    fn test_zero_vector_is_nan() {
        let a = set(&[&[0.0, 0.0]]);
        let b = set(&[&[1.0, 1.0]]);
        let m = cosine_similarity_cpu(&a, &b);
        assert!(m.get(0, 0).is_nan());
    }

    #[test]
    fn test_rectangular_shape() {
        let a = set(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0], &[7.0, 8.0, 9.0]]);
        let b = set(&[&[1.0, 0.0, 0.0]]);
        assert_eq!(cosine_similarity_cpu(&a, &b).shape(), (3, 1));
        assert_eq!(cosine_similarity_cpu(&b, &a).shape(), (1, 3));
    }

    #[test]
    fn test_deterministic() {
        let a = set(&[&[0.3, 0.1, 0.7], &[0.9, 0.2, 0.4]]);
        let b = set(&[&[0.5, 0.5, 0.1]]);
        let first = cosine_similarity_cpu(&a, &b);
        let second = SequentialEngine.compute(&a, &b).unwrap();
        assert_eq!(first.as_slice(), second.as_slice());
    }

    #[test]
    fn test_empty_input() {
        let empty = VectorSet::default();
        let b = set(&[&[1.0]]);
        assert_eq!(cosine_similarity_cpu(&empty, &b).shape(), (0, 1));
    }
}
