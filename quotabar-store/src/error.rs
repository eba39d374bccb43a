//! Store error types.

use thiserror::Error;

/// Errors from reading or writing the settings file.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The file or its directory could not be read or written.
    #[error("settings I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid JSON for the expected shape.
    #[error("settings file is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}
