//! Delimited text files of vectors, one vector per line.

use std::num::ParseFloatError;
use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;

use crate::vectors::{ShapeError, VectorSet};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{path}:{line}: field {field} ({value:?}) is not a number: {source}")]
    Parse {
        path: PathBuf,
        line: u64,
        field: usize,
        value: String,
        #[source]
        source: ParseFloatError,
    },
    #[error("{path}: {source}")]
    Shape {
        path: PathBuf,
        #[source]
        source: ShapeError,
    },
}

/// Reads `path` as rows of `delimiter`-separated floats. Every row must have
/// the same number of fields; any field that is not a number fails the load.
pub fn load_vectors(path: &Path, delimiter: u8) -> Result<VectorSet, LoadError> {
    let csv_err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(csv_err)?;

    let mut vectors = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        let line = record.position().map_or(0, |p| p.line());

        let vector = record
            .iter()
            .enumerate()
            .map(|(field, value)| {
                value.parse::<f64>().map_err(|source| LoadError::Parse {
                    path: path.to_path_buf(),
                    line,
                    field,
                    value: value.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        vectors.push(vector);
    }

    let set = VectorSet::new(vectors).map_err(|source| LoadError::Shape {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(
        "Loaded {} vectors of dimension {} from {}",
        set.len(),
        set.dim(),
        path.display()
    );
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_loads_single_character_fields() {
        let file = write_temp("1,0\n0,1\n");
        let set = load_vectors(file.path(), b',').unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.get(0), &[1.0, 0.0]);
        assert_eq!(set.get(1), &[0.0, 1.0]);
    }

    #[test]
    fn test_custom_delimiter_and_whitespace() {
        let file = write_temp("0.5; 1.5 ;2\r\n-3;4e-2;5\n");
        let set = load_vectors(file.path(), b';').unwrap();
        assert_eq!(set.dim(), 3);
        assert_eq!(set.get(1), &[-3.0, 0.04, 5.0]);
    }

    #[test]
    fn test_missing_trailing_newline() {
        let file = write_temp("1,2,3");
        let set = load_vectors(file.path(), b',').unwrap();
        assert_eq!(set.get(0), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_non_numeric_field_fails() {
        let file = write_temp("1,2\n3,abc\n");
        match load_vectors(file.path(), b',') {
            Err(LoadError::Parse {
                line, field, value, ..
            }) => {
                assert_eq!(line, 2);
                assert_eq!(field, 1);
                assert_eq!(value, "abc");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_ragged_rows_fail() {
        let file = write_temp("1,2\n3,4,5\n");
        assert!(matches!(
            load_vectors(file.path(), b','),
            Err(LoadError::Csv { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = load_vectors(Path::new("/nonexistent/vectors.txt"), b',').unwrap_err();
        assert!(matches!(err, LoadError::Csv { .. }));
    }
}
