//! The capability shared by every similarity implementation.

use clap::ValueEnum;
use thiserror::Error;

use crate::matrix::SimilarityMatrix;
use crate::vectors::VectorSet;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no compatible GPU adapter found")]
    NoAdapter,
    #[error("failed to request GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("GPU launch failed: {0}")]
    Launch(String),
    #[error("failed to map GPU results: {0}")]
    Readback(#[from] wgpu::BufferAsyncError),
    #[error("GPU readback channel closed before results arrived")]
    ReadbackDropped,
    #[error("{what} needs {needed}, device limit is {limit}")]
    TooLarge {
        what: &'static str,
        needed: u64,
        limit: u64,
    },
    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Computes the full pairwise cosine similarity matrix between two sets.
///
/// Entry `(i, j)` is the similarity of `lhs[i]` and `rhs[j]`. Callers must
/// pass sets of equal dimensionality; implementations do not check it.
/// A zero-norm vector yields non-finite entries rather than an error.
pub trait SimilarityEngine {
    fn name(&self) -> &str;

    fn compute(&self, lhs: &VectorSet, rhs: &VectorSet) -> Result<SimilarityMatrix, EngineError>;
}

/// Substrate used for the parallel side of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Backend {
    /// wgpu compute kernel
    #[default]
    Gpu,
    /// rayon thread pool
    Threads,
}
