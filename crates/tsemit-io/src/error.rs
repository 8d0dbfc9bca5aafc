use thiserror::Error;

/// Result type local to tsemit-io.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("json encode: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv encode: {0}")]
    Csv(#[from] csv::Error),

    #[error("msgpack encode: {0}")]
    MsgPack(#[from] rmp_serde::encode::Error),
}
