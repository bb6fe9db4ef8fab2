//! Converter binary - decodes a FERS .dat file into the output container
//!
//! Usage:
//!   cargo run --bin converter -- run042.dat
//!   cargo run --bin converter -- run042.dat -o /data/out/run042.fers
//!   cargo run --bin converter -- run042.dat --summary-only --json

use clap::Parser;
use fers_rs::common::ConvertArgs;
use fers_rs::config::Config;
use fers_rs::converter;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Converter - decodes FERS-5200 binary data files
#[derive(Parser, Debug)]
#[command(name = "converter", about = "FERS-5200 data file converter", version)]
struct Args {
    #[command(flatten)]
    convert: ConvertArgs,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing (logging)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("fers_rs=info".parse()?))
        .init();

    // Parse command line arguments
    let args = Args::parse();

    // Build configuration: file values first, CLI overrides on top
    let config_path = &args.convert.common.config_file;
    let mut converter_config = if std::path::Path::new(config_path).exists() {
        let config = Config::load(config_path)?;
        info!(config_file = %config_path, "loaded configuration");
        config.converter
    } else {
        Default::default()
    };
    if args.convert.summary_only {
        converter_config.summary_only = true;
    }

    let summary = converter::convert_file(
        &args.convert.input,
        args.convert.output.as_deref(),
        &converter_config,
    )?;

    if args.convert.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "Decoded {} events from {} board(s), {} frame(s) skipped.",
            summary.n_events, summary.n_boards, summary.n_errors
        );
        if let Some(start) = summary.acq_start_utc() {
            println!("Acquisition started {}", start.format("%Y-%m-%d %H:%M:%S UTC"));
        }
    }

    Ok(())
}
