//! Error types for the storage engine.

use thiserror::Error;

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur in the storage engine.
///
/// `NotFound`/`Duplicate` are deliberately absent from this enum: they are not
/// error conditions, they are `false` return values from `search`/`erase`/`insert`.
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O error from the underlying file system. Tree state is indeterminate afterward.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A node or metadata record failed a basic structural sanity check on decode.
    #[error("corruption detected: {0}")]
    Corruption(String),
}

impl StorageError {
    pub fn corruption(msg: impl Into<String>) -> Self {
        Self::Corruption(msg.into())
    }
}
