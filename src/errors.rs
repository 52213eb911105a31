//! Crate-specific error types for filemap.

use std::io;
use thiserror::Error;

/// Result alias for filemap operations.
pub type Result<T> = std::result::Result<T, MapError>;

/// Error type covering file opening and mapping establishment.
///
/// Every failure is terminal for the call that produced it and is reported
/// once, synchronously. Teardown reports nothing.
#[derive(Debug, Error)]
pub enum MapError {
    /// File does not exist.
    #[error("file not found")]
    NotFound,

    /// File exists but cannot be opened with read/write access.
    #[error("permission denied")]
    PermissionDenied,

    /// Wrapper for any other `std::io::Error` raised while opening or
    /// querying the file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The OS could not create the backing mapping object, e.g. for a
    /// zero-length file or when the address space is exhausted.
    #[error("mapping failed: {0}")]
    MapFailed(String),

    /// The mapping object was created but the view into the address space
    /// could not be established. Only reachable on platforms whose native
    /// sequence has a separate view step.
    #[error("view mapping failed: {0}")]
    ViewFailed(String),
}
