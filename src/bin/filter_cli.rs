//! AtlasKV Filter CLI
//!
//! Builds, inspects and queries SSTable filter blocks.

use std::fs;
use std::path::{Path, PathBuf};

use atlaskv_filter::{key_hash, FilterConfig, FilterKind, PositionInput, TableFilter, TrainingSet};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};

/// AtlasKV Filter
#[derive(Parser, Debug)]
#[command(name = "atlaskv-filter")]
#[command(about = "Build and query AtlasKV SSTable filter blocks")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train a filter over a newline-separated key file
    Build {
        /// Key file, one key per line
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the filter block
        #[arg(short, long)]
        output: PathBuf,

        /// Keys per data block
        #[arg(short, long, default_value = "16")]
        keys_per_block: usize,

        /// Bloom size in bytes (hybrid variant)
        #[arg(short, long, default_value = "64")]
        bloom_bytes: usize,

        /// Target false positive rate
        #[arg(short, long, default_value = "0.05")]
        fp_rate: f64,

        /// Filter variant
        #[arg(long, value_enum, default_value = "hybrid")]
        kind: KindArg,

        /// Position model input (hybrid variant)
        #[arg(long, value_enum, default_value = "hash")]
        position_input: InputArg,
    },

    /// Print statistics of a filter block
    Inspect {
        /// Filter block file
        path: PathBuf,
    },

    /// Look up a key
    Query {
        /// Filter block file
        path: PathBuf,

        /// The key to look up
        key: String,

        /// Sorted ordinal of the key, for ordinal-trained filters
        #[arg(long)]
        ordinal: Option<u32>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Bloom,
    Hybrid,
    Bounds,
}

impl From<KindArg> for FilterKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Bloom => FilterKind::Bloom,
            KindArg::Hybrid => FilterKind::Hybrid,
            KindArg::Bounds => FilterKind::Bounds,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum InputArg {
    Hash,
    Ordinal,
}

impl From<InputArg> for PositionInput {
    fn from(input: InputArg) -> Self {
        match input {
            InputArg::Hash => PositionInput::KeyHash,
            InputArg::Ordinal => PositionInput::Ordinal,
        }
    }
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,atlaskv_filter=debug"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    if let Err(e) = run(args.command) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> atlaskv_filter::Result<()> {
    match command {
        Commands::Build {
            input,
            output,
            keys_per_block,
            bloom_bytes,
            fp_rate,
            kind,
            position_input,
        } => {
            let config = FilterConfig::builder()
                .kind(kind.into())
                .bloom_size_bytes(bloom_bytes)
                .target_fp_rate(fp_rate)
                .position_input(position_input.into())
                .build()?;
            build(&input, &output, keys_per_block.max(1), &config)
        }
        Commands::Inspect { path } => {
            let filter = TableFilter::load(&path)?;
            println!("kind:            {:?}", filter.kind());
            println!("{}", filter.stats());
            Ok(())
        }
        Commands::Query { path, key, ordinal } => {
            let filter = TableFilter::load(&path)?;
            let hash = key_hash(key.as_bytes());
            let result = match ordinal {
                Some(ordinal) => filter.query_at(hash, ordinal),
                None => filter.query(hash),
            };
            match result.block_range() {
                Some(range) => println!(
                    "{}: maybe present, scan blocks {}..={}",
                    key,
                    range.start(),
                    range.end()
                ),
                None => println!("{}: not present", key),
            }
            Ok(())
        }
    }
}

fn build(
    input: &Path,
    output: &Path,
    keys_per_block: usize,
    config: &FilterConfig,
) -> atlaskv_filter::Result<()> {
    let contents = fs::read_to_string(input)?;
    let mut keys: Vec<&str> = contents.lines().filter(|line| !line.is_empty()).collect();
    keys.sort_unstable();
    keys.dedup();

    let total_blocks = keys.len().div_ceil(keys_per_block);
    let mut training = TrainingSet::with_capacity(keys.len());
    for (i, key) in keys.iter().enumerate() {
        training.push_key(key.as_bytes(), (i / keys_per_block) as u32)?;
    }

    tracing::info!(
        "Training {:?} filter over {} keys in {} blocks",
        config.kind,
        keys.len(),
        total_blocks
    );

    let filter = training.train(total_blocks, config)?;
    filter.save(output)?;

    tracing::info!("Wrote {}", output.display());
    println!("{}", filter.stats());
    Ok(())
}
