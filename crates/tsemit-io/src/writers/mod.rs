//! Formatter contract and the closed set of built-in formatters.

pub mod csv;
pub mod json;
pub mod msgpack;

use std::io::Write;

use tsemit_core::response::ResponseDocument;

use crate::error::Result;

/// Serializes response documents onto a destination.
///
/// Invariants:
/// - Calling `write_response` repeatedly on the same destination must
///   produce a well-formed stream (chunked delivery relies on this).
/// - Output is a pure function of the documents written so far and the
///   formatter's options.
pub trait Formatter {
    /// MIME type announced for the whole response.
    fn content_type(&self) -> &'static str;

    /// Write one document and return the number of bytes written.
    fn write_response(&mut self, w: &mut dyn Write, resp: &ResponseDocument) -> Result<usize>;
}

/// Formatter chosen once per request from the `Accept` header.
#[derive(Debug, Clone)]
pub enum ResponseFormatter {
    Json(json::JsonFormatter),
    Csv(csv::CsvFormatter),
    MsgPack(msgpack::MsgPackFormatter),
}

impl ResponseFormatter {
    pub fn json(pretty: bool) -> Self {
        ResponseFormatter::Json(json::JsonFormatter::new(pretty))
    }

    pub fn csv() -> Self {
        ResponseFormatter::Csv(csv::CsvFormatter::new())
    }

    pub fn msgpack() -> Self {
        ResponseFormatter::MsgPack(msgpack::MsgPackFormatter)
    }
}

impl Formatter for ResponseFormatter {
    fn content_type(&self) -> &'static str {
        match self {
            ResponseFormatter::Json(f) => f.content_type(),
            ResponseFormatter::Csv(f) => f.content_type(),
            ResponseFormatter::MsgPack(f) => f.content_type(),
        }
    }

    fn write_response(&mut self, w: &mut dyn Write, resp: &ResponseDocument) -> Result<usize> {
        match self {
            ResponseFormatter::Json(f) => f.write_response(w, resp),
            ResponseFormatter::Csv(f) => f.write_response(w, resp),
            ResponseFormatter::MsgPack(f) => f.write_response(w, resp),
        }
    }
}
