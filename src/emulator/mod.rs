//! Emulator data source - generates wire-exact FERS data files
//!
//! Produces synthetic `.dat` buffers for testing and benchmarking: a
//! 21-byte preamble followed by frames for a configurable board set,
//! with Gaussian-distributed amplitudes. A configurable fraction of
//! frames can be written with a corrupted channel mask, which makes the
//! declared length disagree with the mode-derived expectation while
//! staying self-consistent, so the scanner's skip-and-resynchronize path
//! gets exercised.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use thiserror::Error;
use tracing::info;

use crate::decoder::{mapping, AcquisitionMode, FILE_HEADER_SIZE, NCHANNELS};

/// Emulator configuration
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct EmulatorConfig {
    /// Acquisition mode to emit (only modes with a decode path are useful)
    pub mode: AcquisitionMode,
    /// Number of frames to generate
    pub n_frames: u64,
    /// Number of boards, frames are dealt round-robin
    pub n_boards: u8,
    /// Mean of the amplitude distribution
    pub amplitude_mean: f64,
    /// Sigma of the amplitude distribution
    pub amplitude_sigma: f64,
    /// Fraction of frames written with a corrupted channel mask
    pub fault_rate: f64,
    /// RNG seed; `None` draws one from the OS
    pub seed: Option<u64>,
    /// Acquisition start stamped into the preamble, ms since the epoch
    pub acq_start_ms: u64,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            mode: AcquisitionMode::Spectroscopy,
            n_frames: 1000,
            n_boards: 1,
            amplitude_mean: 800.0,
            amplitude_sigma: 120.0,
            fault_rate: 0.0,
            seed: None,
            acq_start_ms: 0,
        }
    }
}

/// Emulator errors
#[derive(Error, Debug)]
pub enum EmulatorError {
    #[error("invalid amplitude distribution: {0}")]
    Distribution(#[from] rand_distr::NormalError),

    #[error("board count must be between 1 and 16, got {0}")]
    BoardCount(u8),

    #[error("fault rate must be within 0.0..=1.0, got {0}")]
    FaultRate(f64),
}

/// Data format version stamped into generated preambles
const DATA_FORMAT_VERSION: (u8, u8) = (3, 0);
/// Software version stamped into generated preambles
const SOFTWARE_VERSION: (u8, u8, u8) = (2, 1, 0);

/// Synthetic FERS file generator
pub struct Emulator {
    config: EmulatorConfig,
    rng: StdRng,
    amplitude: Normal<f64>,
    /// Physical → raw permutation so payloads land at chosen slots
    inverse_map: [u8; NCHANNELS],
}

impl Emulator {
    /// Create an emulator with the given configuration
    pub fn new(config: EmulatorConfig) -> Result<Self, EmulatorError> {
        if config.n_boards == 0 || config.n_boards as usize > 16 {
            return Err(EmulatorError::BoardCount(config.n_boards));
        }
        if !(0.0..=1.0).contains(&config.fault_rate) {
            return Err(EmulatorError::FaultRate(config.fault_rate));
        }

        let amplitude = Normal::new(config.amplitude_mean, config.amplitude_sigma)?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            config,
            rng,
            amplitude,
            inverse_map: mapping::inverse_map(),
        })
    }

    /// Generate a complete file buffer
    pub fn generate(&mut self) -> Vec<u8> {
        let frame_size = self.config.mode.nominal_frame_size();
        let mut buf =
            Vec::with_capacity(FILE_HEADER_SIZE + self.config.n_frames as usize * frame_size);

        self.write_preamble(&mut buf);

        let mut trigger_time_us = 0.0;
        for trigger_id in 0..self.config.n_frames {
            let board_id = (trigger_id % self.config.n_boards as u64) as u8;
            trigger_time_us += self.rng.gen_range(5.0..15.0);
            let faulty = self.config.fault_rate > 0.0
                && self.rng.gen_range(0.0..1.0) < self.config.fault_rate;
            self.write_frame(&mut buf, board_id, trigger_id, trigger_time_us, faulty);
        }

        info!(
            frames = self.config.n_frames,
            boards = self.config.n_boards,
            bytes = buf.len(),
            "generated synthetic file"
        );
        buf
    }

    fn write_preamble(&self, buf: &mut Vec<u8>) {
        buf.push(DATA_FORMAT_VERSION.0);
        buf.push(DATA_FORMAT_VERSION.1);
        buf.push(SOFTWARE_VERSION.0);
        buf.push(SOFTWARE_VERSION.1);
        buf.push(SOFTWARE_VERSION.2);
        buf.push(self.config.mode.code());
        buf.extend_from_slice(&self.config.acq_start_ms.to_le_bytes());
        buf.resize(FILE_HEADER_SIZE, 0);
    }

    fn write_frame(
        &mut self,
        buf: &mut Vec<u8>,
        board_id: u8,
        trigger_id: u64,
        trigger_time_us: f64,
        faulty: bool,
    ) {
        let mode = self.config.mode;
        let start = buf.len();

        buf.extend_from_slice(&(mode.nominal_frame_size() as u16).to_le_bytes());
        buf.push(board_id);
        buf.extend_from_slice(&trigger_time_us.to_le_bytes());
        buf.extend_from_slice(&trigger_id.to_le_bytes());
        // All 64 channels active; a faulty frame drops half the mask bits
        // so its declared length no longer matches the expectation
        let mask: u64 = if faulty { u32::MAX as u64 } else { u64::MAX };
        buf.extend_from_slice(&mask.to_le_bytes());

        for physical in 0..NCHANNELS {
            let raw = self.inverse_map[physical];
            buf.push(raw);
            buf.push(0);
            let lg = self.sample_amplitude();
            let hg = self.sample_amplitude();
            buf.extend_from_slice(&lg.to_le_bytes());
            buf.extend_from_slice(&hg.to_le_bytes());
            if mode == AcquisitionMode::SpectroscopyTiming {
                let toa: u32 = self.rng.gen_range(0..1_000_000);
                let tot: u16 = self.rng.gen_range(0..2000);
                buf.extend_from_slice(&toa.to_le_bytes());
                buf.extend_from_slice(&tot.to_le_bytes());
            }
        }

        debug_assert_eq!(buf.len() - start, mode.nominal_frame_size());
    }

    /// Draw one amplitude, pinned to the 12-bit ADC range
    fn sample_amplitude(&mut self) -> u16 {
        let value = self.amplitude.sample(&mut self.rng);
        value.clamp(0.0, 4095.0) as u16
    }
}
