//! Result files: one similarity value per line, row-major.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;

use crate::matrix::SimilarityMatrix;
use crate::utils::MAX_DECIMALS;

#[derive(Debug, Error)]
#[error("failed to write {path}: {source}")]
pub struct OutputError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Formats `value` like C's `%g` with `precision` significant digits:
/// trailing zeros dropped, exponent form for very small or large magnitudes.
/// `precision` is capped at [`MAX_DECIMALS`].
pub fn format_general(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let precision = precision.clamp(1, MAX_DECIMALS as usize);
    let scientific = format!("{:.*e}", precision - 1, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };

    if exponent < -4 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            sign,
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (precision as i32 - 1 - exponent) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Writes `matrix` to `path`, handing the buffered text to the file every
/// `line_buffer` lines.
pub fn write_matrix(
    path: &Path,
    matrix: &SimilarityMatrix,
    decimals: u32,
    line_buffer: usize,
) -> Result<(), OutputError> {
    let io_err = |source| OutputError {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(io_err)?;
    let mut out = BufWriter::new(file);
    write_values(&mut out, matrix.as_slice(), decimals as usize, line_buffer).map_err(io_err)?;
    out.flush().map_err(io_err)?;

    debug!("Wrote {} values to {}", matrix.as_slice().len(), path.display());
    Ok(())
}

fn write_values<W: Write>(
    out: &mut W,
    values: &[f64],
    precision: usize,
    line_buffer: usize,
) -> io::Result<()> {
    let line_buffer = line_buffer.max(1);
    let mut batch = String::new();
    let mut lines = 0;

    for &value in values {
        batch.push_str(&format_general(value, precision));
        batch.push('\n');
        lines += 1;
        if lines == line_buffer {
            out.write_all(batch.as_bytes())?;
            batch.clear();
            lines = 0;
        }
    }

    out.write_all(batch.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_general() {
        assert_eq!(format_general(1.0, 5), "1");
        assert_eq!(format_general(0.0, 5), "0");
        assert_eq!(format_general(0.123456789, 5), "0.12346");
        assert_eq!(format_general(0.99999999, 5), "1");
        assert_eq!(format_general(-0.5, 5), "-0.5");
        assert_eq!(format_general(std::f64::consts::FRAC_1_SQRT_2, 5), "0.70711");
        assert_eq!(format_general(1e-7, 5), "1e-07");
        assert_eq!(format_general(0.0001234, 3), "0.000123");
        assert_eq!(format_general(123456.0, 3), "1.23e+05");
        assert_eq!(format_general(0.56, 1), "0.6");
    }

    #[test]
    fn test_format_non_finite() {
        assert_eq!(format_general(f64::NAN, 5), "nan");
        assert_eq!(format_general(f64::INFINITY, 5), "inf");
        assert_eq!(format_general(f64::NEG_INFINITY, 5), "-inf");
    }

    #[test]
    fn test_format_caps_precision() {
        let third = 1.0 / 3.0;
        assert_eq!(format_general(third, usize::MAX), format_general(third, 17));
        assert_eq!(format_general(third, i32::MAX as usize), "0.33333333333333331");
    }

    /// Counts how many writes reach the sink.
    struct CountingWriter {
        data: Vec<u8>,
        writes: usize,
    }

    impl Write for CountingWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writes += 1;
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_batches_by_line_buffer() {
        let mut sink = CountingWriter {
            data: Vec::new(),
            writes: 0,
        };
        write_values(&mut sink, &[1.0, 0.0, 0.0, 1.0, 0.5], 5, 2).unwrap();
        assert_eq!(String::from_utf8(sink.data).unwrap(), "1\n0\n0\n1\n0.5\n");
        assert_eq!(sink.writes, 3);
    }

    #[test]
    fn test_write_matrix_row_major() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let matrix = SimilarityMatrix::from_rows(vec![vec![1.0, 0.25], vec![-1.0, 0.0]]).unwrap();
        write_matrix(&path, &matrix, 5, 50_000).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1\n0.25\n-1\n0\n");
    }

    #[test]
    fn test_write_matrix_with_huge_decimals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let matrix = SimilarityMatrix::from_rows(vec![vec![0.5, 1.0]]).unwrap();
        write_matrix(&path, &matrix, u32::MAX, 50_000).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "0.5\n1\n");
    }
}
