//! Common error type for the conversion pipeline
//!
//! The decoder, output sink, emulator, and config layer each have their
//! own error enums; this wraps them for callers driving a whole
//! conversion.

use thiserror::Error;

use crate::config::ConfigError;
use crate::decoder::DecodeError;
use crate::emulator::EmulatorError;
use crate::output::OutputFormatError;

/// Errors surfaced by the file conversion pipeline
#[derive(Error, Debug)]
pub enum ConverterError {
    /// Fatal decode error (truncation, zero-length frame, bad board id, ...)
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// I/O error (file operations)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Output container error
    #[error("output format error: {0}")]
    Output(#[from] OutputFormatError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Emulator error
    #[error("emulator error: {0}")]
    Emulator(#[from] EmulatorError),
}

/// Result type alias using ConverterError
pub type ConverterResult<T> = Result<T, ConverterError>;
