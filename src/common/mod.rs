//! Shared infrastructure: CLI argument structs and the pipeline error type

pub mod cli;
pub mod error;

pub use cli::{CommonArgs, ConvertArgs, EmulateArgs};
pub use error::{ConverterError, ConverterResult};
