//! File conversion pipeline
//!
//! Owns the trivial plumbing around the decoder: reading the input file
//! into memory, running the decode, writing the output container, and
//! logging the summary. The decoder itself never touches the filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::common::error::ConverterResult;
use crate::decoder::{self, FileSummary};
use crate::output;

/// Converter configuration, file-loadable with CLI overrides
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Directory for output files; `None` writes next to the input
    pub output_dir: Option<PathBuf>,
    /// Write only the summary block, skipping event batches
    pub summary_only: bool,
    /// Events per MsgPack batch in the output container
    pub events_per_batch: usize,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            summary_only: false,
            events_per_batch: output::DEFAULT_BATCH_SIZE,
        }
    }
}

/// Extension given to converted files
const OUTPUT_EXTENSION: &str = "fers";

/// Derive the output path: input with the extension swapped, optionally
/// redirected into the configured output directory
pub fn output_path(input: &Path, config: &ConverterConfig) -> PathBuf {
    let mut path = input.with_extension(OUTPUT_EXTENSION);
    if let Some(dir) = &config.output_dir {
        if let Some(name) = path.file_name() {
            path = dir.join(name);
        }
    }
    path
}

/// Convert one file: read, decode, write, return the summary
pub fn convert_file(
    input: &Path,
    output: Option<&Path>,
    config: &ConverterConfig,
) -> ConverterResult<FileSummary> {
    let data = fs::read(input)?;
    info!(
        file = %input.display(),
        size_mb = data.len() / (1024 * 1024),
        "read raw data"
    );

    let decoded = decoder::decode(&data)?;
    log_summary(&decoded.summary);

    let out_path = match output {
        Some(path) => path.to_path_buf(),
        None => output_path(input, config),
    };
    let bytes = output::write_file(
        &out_path,
        &decoded,
        config.events_per_batch,
        config.summary_only,
    )?;
    info!(file = %out_path.display(), bytes, "wrote converted file");

    Ok(decoded.summary)
}

fn log_summary(summary: &FileSummary) {
    info!(mode = ?summary.acquisition_mode, "acquisition mode");
    info!(
        n_events = summary.n_events,
        n_boards = summary.n_boards,
        "decoded events"
    );
    for (board, count) in summary.events_per_board.iter().enumerate() {
        info!(board, count, "events in board");
    }
    if summary.n_errors > 0 {
        warn!(n_errors = summary.n_errors, "skipped malformed frames");
    }
}
