//! Errors returned by the DSP command API

use thiserror::Error;

/// Errors that can occur when issuing a DSP command
///
/// Variants carry only static data so returning an error never allocates.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DspError {
    #[error("DSP engine is not initialized")]
    InvalidState,
    #[error("invalid {name}: {value}")]
    InvalidArgument { name: &'static str, value: u32 },
}

/// Result type for DSP commands
pub type Result<T> = std::result::Result<T, DspError>;
