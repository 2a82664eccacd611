//! Ordered collections of equal-length vectors.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ShapeError {
    #[error("vector {index} has {found} components, expected {expected}")]
    Ragged {
        index: usize,
        expected: usize,
        found: usize,
    },
    #[error("vector {index} has no components")]
    EmptyVector { index: usize },
    #[error("flat buffer of {len} values is not a multiple of dimension {dim}")]
    FlatLength { len: usize, dim: usize },
    #[error("matrix of {rows}x{cols} needs {expected} values, got {found}")]
    MatrixLength {
        rows: usize,
        cols: usize,
        expected: usize,
        found: usize,
    },
}

/// A collection of vectors sharing one dimensionality, stored row-major in a
/// single flat buffer. Order defines the row/column index in the output matrix.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VectorSet {
    dim: usize,
    data: Vec<f64>,
}

impl VectorSet {
    /// Builds a set from individual vectors, rejecting ragged input.
    pub fn new(vectors: Vec<Vec<f64>>) -> Result<Self, ShapeError> {
        let dim = match vectors.first() {
            Some(first) => first.len(),
            None => return Ok(Self::default()),
        };

        let mut data = Vec::with_capacity(dim * vectors.len());
        for (index, vector) in vectors.into_iter().enumerate() {
            if vector.is_empty() {
                return Err(ShapeError::EmptyVector { index });
            }
            if vector.len() != dim {
                return Err(ShapeError::Ragged {
                    index,
                    expected: dim,
                    found: vector.len(),
                });
            }
            data.extend(vector);
        }

        Ok(Self { dim, data })
    }

    pub fn from_flat(dim: usize, data: Vec<f64>) -> Result<Self, ShapeError> {
        if data.is_empty() {
            return Ok(Self::default());
        }
        if dim == 0 {
            return Err(ShapeError::EmptyVector { index: 0 });
        }
        if data.len() % dim != 0 {
            return Err(ShapeError::FlatLength {
                len: data.len(),
                dim,
            });
        }
        Ok(Self { dim, data })
    }

    /// Number of vectors in the set.
    pub fn len(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.data.len() / self.dim
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Components per vector. Zero for an empty set.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Returns vector `index`. Panics when out of range.
    pub fn get(&self, index: usize) -> &[f64] {
        let start = index * self.dim;
        &self.data[start..start + self.dim]
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &[f64]> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }

    pub fn as_flat(&self) -> &[f64] {
        &self.data
    }

    /// Flat f32 copy for device upload, each vector divided by its largest
    /// absolute component first. Cosine similarity is unchanged by the
    /// per-vector scale, and the scaled squared norm lies in `[1, dim]`.
    /// Zero vectors stay zero.
    pub fn to_scaled_f32(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.data.len());
        for v in self.iter() {
            let scale = v.iter().fold(0.0f64, |m, x| m.max(x.abs()));
            if scale == 0.0 {
                out.extend(v.iter().map(|&x| x as f32));
            } else {
                out.extend(v.iter().map(|&x| (x / scale) as f32));
            }
        }
        out
    }
}
