#![forbid(unsafe_code)]
//! tsemit-exec: drains a nested query result stream into formatted output.
//!
//! The query engine produces statements, each statement produces series, and
//! each series produces rows, all through bounded channels (`stream`). An
//! `Encoder` picked per request (`negotiate`) drains that stream either into
//! one buffered document or into a sequence of chunked frames (`emitter`).

pub mod emitter;
pub mod error;
pub mod negotiate;
pub mod stream;

pub use emitter::buffered::BufferedEmitter;
pub use emitter::chunked::StreamingEmitter;
pub use emitter::EmitStats;
pub use error::{EmitError, Result};
pub use negotiate::{EmitRequest, Encoder, MediaType};
pub use stream::{
    result_channel, spawn_producer, CancelToken, ResultSender, ResultStream, RowStream,
    SendError, SeriesBlock, SeriesStream, SeriesWriter, StatementResult, StatementWriter,
};
