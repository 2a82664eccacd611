//! Pairwise cosine similarity between two vector sets, computed by a parallel
//! engine (wgpu kernel or rayon pool) and a sequential reference engine, then
//! cross-checked within a decimal tolerance.

pub mod config;
pub mod cpu;
pub mod engine;
pub mod generate;
pub mod gpu;
pub mod loader;
pub mod matrix;
pub mod output;
pub mod runner;
pub mod threads;
pub mod utils;
pub mod vectors;

pub use engine::{Backend, EngineError, SimilarityEngine};
pub use matrix::SimilarityMatrix;
pub use vectors::VectorSet;
