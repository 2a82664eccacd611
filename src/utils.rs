//! Cross-checking of two similarity matrices.
//!
//! The comparison uses an absolute difference only, so large-magnitude
//! values get no relative slack, and it stops at the first mismatch rather
//! than collecting all of them.

use std::fmt;

use crate::matrix::SimilarityMatrix;

/// Default number of decimals reported for results.
pub const DEFAULT_DECIMALS: u32 = 5;

/// Most significant digits an f64 can carry meaningfully.
pub const MAX_DECIMALS: u32 = 17;

/// Values agreeing to one more decimal than the reported precision are equal:
/// `10^-(decimals + 1)`, with `decimals` capped at [`MAX_DECIMALS`].
pub fn tolerance_for(decimals: u32) -> f64 {
    10f64.powi(-(decimals.min(MAX_DECIMALS) as i32) - 1)
}

/// First difference found between two matrices.
#[derive(Debug, Clone, PartialEq)]
pub enum Mismatch {
    Shape {
        left: (usize, usize),
        right: (usize, usize),
    },
    Value {
        row: usize,
        col: usize,
        left: f64,
        right: f64,
    },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::Shape { left, right } => write!(
                f,
                "Shapes differ: {}x{} vs {}x{}",
                left.0, left.1, right.0, right.1
            ),
            Mismatch::Value {
                row,
                col,
                left,
                right,
            } => write!(f, "Uneven results at ({row},{col}): {left} vs {right}"),
        }
    }
}

impl std::error::Error for Mismatch {}

/// Two values are equal when both are NaN, both are the same infinity, or
/// both are finite and within `tolerance` of each other.
pub fn values_match(a: f64, b: f64, tolerance: f64) -> bool {
    if a.is_nan() || b.is_nan() {
        return a.is_nan() && b.is_nan();
    }
    if a.is_infinite() || b.is_infinite() {
        return a == b;
    }
    (a - b).abs() <= tolerance
}

/// Compares `left` against `right` entry by entry in row-major order,
/// returning the first entry outside `tolerance`.
pub fn compare_results(
    left: &SimilarityMatrix,
    right: &SimilarityMatrix,
    tolerance: f64,
) -> Result<(), Mismatch> {
    if left.shape() != right.shape() {
        return Err(Mismatch::Shape {
            left: left.shape(),
            right: right.shape(),
        });
    }

    let cols = left.cols();
    for (idx, (&l, &r)) in left.as_slice().iter().zip(right.as_slice()).enumerate() {
        if !values_match(l, r, tolerance) {
            return Err(Mismatch::Value {
                row: idx / cols,
                col: idx % cols,
                left: l,
                right: r,
            });
        }
    }
    Ok(())
}
