use thiserror::Error;

/// Error taxonomy shared by every trait surface in this crate (§7).
///
/// Kinds map directly onto propagation policy: `Validation`/`NotFound`/
/// `Conflict` are surfaced synchronously at API boundaries, `TransientIo` is
/// retried with backoff, `CorruptAsset` is logged and skipped within a
/// batch, and `Fatal` exits the process non-zero.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("transient failure, retry: {0}")]
    TransientIo(String),

    #[error("corrupt asset {path}: {message}")]
    CorruptAsset { path: String, message: String },

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("operation cancelled: {0}")]
    Cancelled(String),

    #[error("fatal: {0}")]
    Fatal(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
