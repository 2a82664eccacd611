use log::debug;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::cpu::{dot_product, norm};
use crate::engine::{EngineError, SimilarityEngine};
use crate::matrix::SimilarityMatrix;
use crate::vectors::VectorSet;

/// Parallel engine backed by a rayon pool: one task per output row, joined
/// once before the matrix is returned.
pub struct ThreadedEngine {
    pool: ThreadPool,
}

impl ThreadedEngine {
    /// `threads = None` lets rayon pick the worker count.
    pub fn new(threads: Option<usize>) -> Result<Self, EngineError> {
        let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("cosine-worker-{i}"));
        if let Some(n) = threads {
            builder = builder.num_threads(n);
        }
        let pool = builder.build()?;
        debug!("Thread pool ready with {} workers", pool.current_num_threads());
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

pub fn cosine_similarity_threads(lhs: &VectorSet, rhs: &VectorSet) -> SimilarityMatrix {
    let lhs_norms: Vec<f64> = (0..lhs.len()).into_par_iter().map(|i| norm(lhs.get(i))).collect();
    let rhs_norms: Vec<f64> = (0..rhs.len()).into_par_iter().map(|j| norm(rhs.get(j))).collect();

    let mut matrix = SimilarityMatrix::zeros(lhs.len(), rhs.len());
    let cols = rhs.len();
    if cols == 0 {
        return matrix;
    }

    matrix
        .as_mut_slice()
        .par_chunks_mut(cols)
        .enumerate()
        .for_each(|(i, row)| {
            let a = lhs.get(i);
            for (j, out) in row.iter_mut().enumerate() {
                *out = dot_product(a, rhs.get(j)) / (lhs_norms[i] * rhs_norms[j]);
            }
        });

    matrix
}

impl SimilarityEngine for ThreadedEngine {
    fn name(&self) -> &str {
        "Threads"
    }

    fn compute(&self, lhs: &VectorSet, rhs: &VectorSet) -> Result<SimilarityMatrix, EngineError> {
        Ok(self.pool.install(|| cosine_similarity_threads(lhs, rhs)))
    }
}
