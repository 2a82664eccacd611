//! Command-line options and the resolved run configuration.

use std::path::PathBuf;

use clap::Parser;
use log::warn;
use thiserror::Error;

use crate::engine::Backend;
use crate::utils::{DEFAULT_DECIMALS, MAX_DECIMALS};

pub const DEFAULT_PARALLEL_OUTPUT: &str = "cuda_results.txt";
pub const DEFAULT_SEQUENTIAL_OUTPUT: &str = "serial_results.txt";
pub const DEFAULT_LINE_BUFFER: usize = 50_000;
pub const DEFAULT_DELIMITER: char = ',';

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Given {0} filename is invalid")]
    MissingVectorFile(&'static str),
    #[error("delimiter {0:?} must be a single ASCII character")]
    Delimiter(char),
}

/// Pairwise cosine similarity, computed in parallel and sequentially, then cross-checked
#[derive(Parser, Debug)]
#[command(name = "cosine-sim", version, about)]
pub struct Cli {
    /// First vector file
    #[arg(long = "v1", value_name = "FILE")]
    pub v1: Option<PathBuf>,

    /// Second vector file
    #[arg(long = "v2", value_name = "FILE")]
    pub v2: Option<PathBuf>,

    /// Parallel output file [default: cuda_results.txt]
    #[arg(long = "co", value_name = "FILE")]
    pub parallel_output: Option<PathBuf>,

    /// Sequential output file [default: serial_results.txt]
    #[arg(long = "so", value_name = "FILE")]
    pub sequential_output: Option<PathBuf>,

    /// Lines held in memory between writes to the output files [default: 50000]
    #[arg(long = "lb", value_name = "LINES")]
    pub line_buffer: Option<usize>,

    /// Decimals kept for results, 1 to 17 [default: 5]
    #[arg(short = 'd', long = "decimals", allow_negative_numbers = true)]
    pub decimals: Option<i32>,

    /// Field delimiter of the vector files
    #[arg(long, default_value_t = DEFAULT_DELIMITER)]
    pub delimiter: char,

    /// Substrate for the parallel implementation
    #[arg(long, value_enum, default_value_t = Backend::Gpu)]
    pub backend: Backend,

    /// Worker threads for the threads backend [default: one per core]
    #[arg(long)]
    pub threads: Option<usize>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub v1: PathBuf,
    pub v2: PathBuf,
    pub parallel_output: PathBuf,
    pub sequential_output: PathBuf,
    pub line_buffer: usize,
    pub decimals: u32,
    pub delimiter: u8,
    pub backend: Backend,
    pub threads: Option<usize>,
}

impl Config {
    /// Configuration with every optional setting at its default.
    pub fn new(v1: impl Into<PathBuf>, v2: impl Into<PathBuf>) -> Self {
        Self {
            v1: v1.into(),
            v2: v2.into(),
            parallel_output: PathBuf::from(DEFAULT_PARALLEL_OUTPUT),
            sequential_output: PathBuf::from(DEFAULT_SEQUENTIAL_OUTPUT),
            line_buffer: DEFAULT_LINE_BUFFER,
            decimals: DEFAULT_DECIMALS,
            delimiter: DEFAULT_DELIMITER as u8,
            backend: Backend::default(),
            threads: None,
        }
    }
}

impl Cli {
    pub fn into_config(self) -> Result<Config, ConfigError> {
        let v1 = self.v1.ok_or(ConfigError::MissingVectorFile("V1"))?;
        let v2 = self.v2.ok_or(ConfigError::MissingVectorFile("V2"))?;

        if !self.delimiter.is_ascii() {
            return Err(ConfigError::Delimiter(self.delimiter));
        }

        let decimals = match self.decimals {
            None => DEFAULT_DECIMALS,
            Some(d) if d > MAX_DECIMALS as i32 => {
                warn!("Number of decimals capped at {MAX_DECIMALS} (got {d})");
                MAX_DECIMALS
            }
            Some(d) if d >= 1 => d as u32,
            Some(d) => {
                warn!("Number of decimals cannot be less than 1 (got {d}), defaulting to {DEFAULT_DECIMALS}");
                DEFAULT_DECIMALS
            }
        };

        let line_buffer = match self.line_buffer {
            None => DEFAULT_LINE_BUFFER,
            Some(0) => {
                warn!("Line buffer size cannot be 0, defaulting to {DEFAULT_LINE_BUFFER}");
                DEFAULT_LINE_BUFFER
            }
            Some(n) => n,
        };

        Ok(Config {
            v1,
            v2,
            parallel_output: self
                .parallel_output
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PARALLEL_OUTPUT)),
            sequential_output: self
                .sequential_output
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SEQUENTIAL_OUTPUT)),
            line_buffer,
            decimals,
            delimiter: self.delimiter as u8,
            backend: self.backend,
            threads: self.threads,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("cosine-sim").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["--v1=a.txt", "--v2=b.txt"]).into_config().unwrap();
        assert_eq!(config, Config::new("a.txt", "b.txt"));
    }

    #[test]
    fn test_all_options() {
        let config = parse(&[
            "--v1", "a.txt", "--v2", "b.txt", "--co", "p.txt", "--so", "s.txt", "--lb", "10", "-d", "3",
            "--delimiter", ";", "--backend", "threads", "--threads", "4",
        ])
        .into_config()
        .unwrap();
        assert_eq!(config.parallel_output, PathBuf::from("p.txt"));
        assert_eq!(config.sequential_output, PathBuf::from("s.txt"));
        assert_eq!(config.line_buffer, 10);
        assert_eq!(config.decimals, 3);
        assert_eq!(config.delimiter, b';');
        assert_eq!(config.backend, Backend::Threads);
        assert_eq!(config.threads, Some(4));
    }

    #[test]
    fn test_missing_vector_files() {
        assert_eq!(
            parse(&["--v2=b.txt"]).into_config(),
            Err(ConfigError::MissingVectorFile("V1"))
        );
        assert_eq!(
            parse(&["--v1=a.txt"]).into_config(),
            Err(ConfigError::MissingVectorFile("V2"))
        );
    }

    #[test]
    fn test_decimals_below_one_fall_back() {
        let config = parse(&["--v1=a", "--v2=b", "-d", "0"]).into_config().unwrap();
        assert_eq!(config.decimals, DEFAULT_DECIMALS);
        let config = parse(&["--v1=a", "--v2=b", "--decimals=-3"]).into_config().unwrap();
        assert_eq!(config.decimals, DEFAULT_DECIMALS);
        let config = parse(&["--v1=a", "--v2=b", "-d", "1"]).into_config().unwrap();
        assert_eq!(config.decimals, 1);
    }

    #[test]
    fn test_decimals_above_max_are_capped() {
        let config = parse(&["--v1=a", "--v2=b", "-d", "2147483647"]).into_config().unwrap();
        assert_eq!(config.decimals, MAX_DECIMALS);
        let config = parse(&["--v1=a", "--v2=b", "-d", "18"]).into_config().unwrap();
        assert_eq!(config.decimals, MAX_DECIMALS);
        let config = parse(&["--v1=a", "--v2=b", "-d", "17"]).into_config().unwrap();
        assert_eq!(config.decimals, 17);
    }

    #[test]
    fn test_zero_line_buffer_falls_back() {
        let config = parse(&["--v1=a", "--v2=b", "--lb", "0"]).into_config().unwrap();
        assert_eq!(config.line_buffer, DEFAULT_LINE_BUFFER);
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        assert_eq!(
            parse(&["--v1=a", "--v2=b", "--delimiter", "§"]).into_config(),
            Err(ConfigError::Delimiter('§'))
        );
    }

    #[test]
    fn test_help_flag_is_recognized() {
        let err = Cli::try_parse_from(["cosine-sim", "-h"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
