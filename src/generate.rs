//! Random vector files for exercising the engines.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use rand::Rng;

/// Largest collection size picked when none is given.
pub const MAX_RANDOM_COUNT: usize = 10_000;

/// Writes `count` vectors of `dim` components, uniform in `[0, 1)`, one per
/// line with comma-separated fields.
pub fn write_random_vectors<R: Rng>(
    path: &Path,
    count: usize,
    dim: usize,
    rng: &mut R,
) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_vectors(&mut out, count, dim, rng)?;
    out.flush()
}

fn write_vectors<W: Write, R: Rng>(out: &mut W, count: usize, dim: usize, rng: &mut R) -> io::Result<()> {
    for _ in 0..count {
        for j in 0..dim {
            if j > 0 {
                out.write_all(b",")?;
            }
            write!(out, "{}", rng.gen::<f64>())?;
        }
        out.write_all(b"\n")?;
    }
    Ok(())
}
