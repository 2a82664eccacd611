//! Drives one run: load, compute twice, cross-check, write.

use std::time::{Duration, Instant};

use log::{info, warn};
use thiserror::Error;

use crate::config::Config;
use crate::engine::{Backend, EngineError, SimilarityEngine};
use crate::gpu::GpuEngine;
use crate::loader::{load_vectors, LoadError};
use crate::matrix::SimilarityMatrix;
use crate::output::{write_matrix, OutputError};
use crate::threads::ThreadedEngine;
use crate::utils::{compare_results, tolerance_for, Mismatch};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("vector dimensions differ: first file has {lhs}, second file has {rhs}")]
    DimensionMismatch { lhs: usize, rhs: usize },
    #[error("{engine} engine failed: {source}")]
    Engine {
        engine: String,
        #[source]
        source: EngineError,
    },
    #[error(transparent)]
    Output(#[from] OutputError),
}

/// Outcome of a completed run.
#[derive(Debug)]
pub struct RunReport {
    pub rows: usize,
    pub cols: usize,
    pub parallel_elapsed: Duration,
    pub sequential_elapsed: Duration,
    pub equivalence: Result<(), Mismatch>,
}

impl RunReport {
    pub fn is_equivalent(&self) -> bool {
        self.equivalence.is_ok()
    }
}

/// Creates the parallel engine for `backend`. GPU device setup happens here,
/// outside the timed section of a run.
pub fn build_parallel_engine(
    backend: Backend,
    threads: Option<usize>,
) -> Result<Box<dyn SimilarityEngine>, EngineError> {
    match backend {
        Backend::Gpu => Ok(Box::new(pollster::block_on(GpuEngine::new())?)),
        Backend::Threads => Ok(Box::new(ThreadedEngine::new(threads)?)),
    }
}

fn timed(
    engine: &dyn SimilarityEngine,
    run: impl FnOnce() -> Result<SimilarityMatrix, EngineError>,
) -> Result<(SimilarityMatrix, Duration), RunError> {
    info!("Executing {} version", engine.name());
    let start = Instant::now();
    let matrix = run().map_err(|source| RunError::Engine {
        engine: engine.name().to_string(),
        source,
    })?;
    let elapsed = start.elapsed();
    info!("{} version done", engine.name());
    Ok((matrix, elapsed))
}

/// Runs `parallel` then `sequential` on the files named in `config`, checks
/// the parallel result against the sequential one and writes both to disk.
///
/// A mismatch is reported in the returned [`RunReport`], not as an error.
pub fn run(
    config: &Config,
    parallel: &dyn SimilarityEngine,
    sequential: &dyn SimilarityEngine,
) -> Result<RunReport, RunError> {
    let lhs = load_vectors(&config.v1, config.delimiter)?;
    let rhs = load_vectors(&config.v2, config.delimiter)?;
    info!("Parsed the two vector files ({} and {} vectors)", lhs.len(), rhs.len());

    if !lhs.is_empty() && !rhs.is_empty() && lhs.dim() != rhs.dim() {
        return Err(RunError::DimensionMismatch {
            lhs: lhs.dim(),
            rhs: rhs.dim(),
        });
    }

    let (parallel_results, parallel_elapsed) = timed(parallel, || parallel.compute(&lhs, &rhs))?;
    let (sequential_results, sequential_elapsed) =
        timed(sequential, || sequential.compute(&lhs, &rhs))?;

    let equivalence = compare_results(
        &parallel_results,
        &sequential_results,
        tolerance_for(config.decimals),
    );
    match &equivalence {
        Ok(()) => info!("Same results given by both implementations"),
        Err(Mismatch::Value {
            row,
            col,
            left,
            right,
        }) => warn!(
            "Uneven results at ({row},{col}): {} gave {left} while {} gave {right}",
            parallel.name(),
            sequential.name()
        ),
        Err(mismatch) => warn!("{mismatch}"),
    }

    info!(
        "{} running time: {:.3}ms",
        parallel.name(),
        parallel_elapsed.as_secs_f64() * 1000.0
    );
    info!(
        "{} running time: {:.3}ms",
        sequential.name(),
        sequential_elapsed.as_secs_f64() * 1000.0
    );

    info!(
        "Writing results to files ({} and {})",
        config.parallel_output.display(),
        config.sequential_output.display()
    );
    write_matrix(
        &config.parallel_output,
        &parallel_results,
        config.decimals,
        config.line_buffer,
    )?;
    write_matrix(
        &config.sequential_output,
        &sequential_results,
        config.decimals,
        config.line_buffer,
    )?;

    Ok(RunReport {
        rows: lhs.len(),
        cols: rhs.len(),
        parallel_elapsed,
        sequential_elapsed,
        equivalence,
    })
}
