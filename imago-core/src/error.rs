//! Maps backend-specific failures onto the shared [`CoreError`] taxonomy
//! (§7). Every adapter in this crate converts at its boundary; nothing
//! downstream ever sees a `mongodb`/`redis`/`lapin` error type directly.

pub use imago_contracts::error::{CoreError, Result};

pub(crate) fn mongo_err(err: mongodb::error::Error) -> CoreError {
    use mongodb::error::ErrorKind;
    match err.kind.as_ref() {
        ErrorKind::Io(io) => CoreError::TransientIo(io.to_string()),
        ErrorKind::ServerSelection { .. } => CoreError::TransientIo(err.to_string()),
        _ => CoreError::Internal(err.to_string()),
    }
}

pub(crate) fn redis_err(err: redis::RedisError) -> CoreError {
    if err.is_timeout() || err.is_connection_dropped() || err.is_connection_refusal() {
        CoreError::TransientIo(err.to_string())
    } else {
        CoreError::Internal(err.to_string())
    }
}

pub(crate) fn lapin_err(err: lapin::Error) -> CoreError {
    CoreError::TransientIo(err.to_string())
}
