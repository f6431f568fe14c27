// src/error.rs

use thiserror::Error;

/// Failures of the scanning core. Detection and classification are total, so only loading
/// and re-serialising a table can fail.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("CSV parse error: {0}")]
    Parse(String),

    #[error("CSV serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, ScanError>;
