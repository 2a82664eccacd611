use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use cosine_sim::generate::{write_random_vectors, MAX_RANDOM_COUNT};

/// Writes two files of random vectors for cosine-sim
#[derive(Parser, Debug)]
#[command(name = "gen-vectors", version, about)]
struct Args {
    /// Components per vector
    #[arg(long, default_value_t = 5)]
    dim: usize,

    /// Vectors in the first file [default: random in 1..=10000]
    #[arg(long)]
    count1: Option<usize>,

    /// Vectors in the second file [default: random in 1..=10000]
    #[arg(long)]
    count2: Option<usize>,

    #[arg(long, default_value = "vectors_1.txt")]
    out1: PathBuf,

    #[arg(long, default_value = "vectors_2.txt")]
    out2: PathBuf,

    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stdout)
        .init();

    let args = Args::parse();
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let count1 = args.count1.unwrap_or_else(|| rng.gen_range(1..=MAX_RANDOM_COUNT));
    let count2 = args.count2.unwrap_or_else(|| rng.gen_range(1..=MAX_RANDOM_COUNT));
    info!("Sizes: V1: {count1} V2: {count2}");

    info!("Writing V1 vectors");
    write_random_vectors(&args.out1, count1, args.dim, &mut rng)
        .with_context(|| format!("failed to write {}", args.out1.display()))?;

    info!("Writing V2 vectors");
    write_random_vectors(&args.out2, count2, args.dim, &mut rng)
        .with_context(|| format!("failed to write {}", args.out2.display()))?;

    info!("Done");
    Ok(())
}
