use thiserror::Error;

pub type Result<T> = std::result::Result<T, EmitError>;

/// Failures surfaced to whoever drives an emitter. Query errors are not in
/// here: those travel inside the response as frame errors.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("format: {0}")]
    Format(#[from] tsemit_io::Error),

    #[error("flush: {0}")]
    Io(#[from] std::io::Error),
}
