//! CLI argument parsing for the converter binaries
//!
//! Common arguments are shared via composition: each binary flattens
//! `CommonArgs` into its own struct.

use std::path::PathBuf;

use clap::Parser;

/// Arguments shared across all binaries
#[derive(Parser, Debug, Clone)]
pub struct CommonArgs {
    /// Path to configuration file
    #[arg(short = 'f', long = "config", default_value = "config.toml")]
    pub config_file: String,
}

/// Arguments for the converter binary
#[derive(Parser, Debug, Clone)]
pub struct ConvertArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Input .dat file
    pub input: PathBuf,

    /// Output path (default: input with the extension swapped)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write only the summary block, skipping event batches
    #[arg(long)]
    pub summary_only: bool,

    /// Print the summary as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the emulator binary
#[derive(Parser, Debug, Clone)]
pub struct EmulateArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Output .dat file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Number of frames to generate
    #[arg(long)]
    pub frames: Option<u64>,

    /// Number of boards
    #[arg(long)]
    pub boards: Option<u8>,

    /// RNG seed for reproducible files
    #[arg(long)]
    pub seed: Option<u64>,

    /// Fraction of frames written with a corrupted mask
    #[arg(long)]
    pub fault_rate: Option<f64>,

    /// Generate combined spectroscopy+timing frames
    #[arg(long)]
    pub timing: bool,
}
