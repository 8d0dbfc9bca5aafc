//! Emitters: drain a `ResultStream` through a `Formatter`.
//!
//! - `buffered`: whole stream into one document, with a global row cap.
//! - `chunked`: one document per chunk or series boundary, flushed as it goes.

pub mod buffered;
pub mod chunked;

/// What one emission produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitStats {
    /// Statements read from the stream.
    pub statements: usize,
    /// Documents handed to the formatter.
    pub frames: usize,
    /// Rows written across all documents.
    pub rows: usize,
    /// Bytes reported by the formatter.
    pub bytes: usize,
    /// The row cap stopped the drain before the stream ended.
    pub truncated: bool,
}
