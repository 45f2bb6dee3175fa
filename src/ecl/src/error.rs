use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EclError {
    /// No usable header file, or ambiguous/missing data files.
    #[error("format error: {0}")]
    Format(String),

    /// Truncated or corrupt record mid-scan.
    #[error("scan error: {0}")]
    Scan(String),

    /// Unknown vector, keyword or occurrence.
    #[error("lookup error: {0}")]
    Lookup(String),

    #[error("consistency error: {0}")]
    Consistency(String),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, EclError>;
