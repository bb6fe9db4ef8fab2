//! Emulator binary - writes synthetic FERS .dat files
//!
//! Usage:
//!   cargo run --bin emulator -- -o sample.dat
//!   cargo run --bin emulator -- -o sample.dat --frames 500 --boards 4
//!   cargo run --bin emulator -- -o faulty.dat --fault-rate 0.1 --seed 42

use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use fers_rs::common::EmulateArgs;
use fers_rs::config::Config;
use fers_rs::decoder::AcquisitionMode;
use fers_rs::emulator::Emulator;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Emulator - generates wire-exact FERS data files
#[derive(Parser, Debug)]
#[command(name = "emulator", about = "FERS-5200 data file emulator", version)]
struct Args {
    #[command(flatten)]
    emulate: EmulateArgs,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing (logging)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("fers_rs=info".parse()?))
        .init();

    // Parse command line arguments
    let args = Args::parse();

    // Build configuration: file values first, CLI overrides on top
    let config_path = &args.emulate.common.config_file;
    let mut emulator_config = if std::path::Path::new(config_path).exists() {
        let config = Config::load(config_path)?;
        info!(config_file = %config_path, "loaded configuration");
        config.emulator
    } else {
        Default::default()
    };
    if let Some(frames) = args.emulate.frames {
        emulator_config.n_frames = frames;
    }
    if let Some(boards) = args.emulate.boards {
        emulator_config.n_boards = boards;
    }
    if let Some(seed) = args.emulate.seed {
        emulator_config.seed = Some(seed);
    }
    if let Some(fault_rate) = args.emulate.fault_rate {
        emulator_config.fault_rate = fault_rate;
    }
    if args.emulate.timing {
        emulator_config.mode = AcquisitionMode::SpectroscopyTiming;
    }
    if emulator_config.acq_start_ms == 0 {
        emulator_config.acq_start_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
    }

    let mut emulator = Emulator::new(emulator_config.clone())?;
    let data = emulator.generate();
    std::fs::write(&args.emulate.output, &data)?;

    println!(
        "Wrote {} frames ({} bytes) to {}.",
        emulator_config.n_frames,
        data.len(),
        args.emulate.output.display()
    );

    Ok(())
}
