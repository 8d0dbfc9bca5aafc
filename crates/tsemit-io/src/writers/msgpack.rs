//! MessagePack formatter. Each document is one self-delimiting map, so
//! chunked frames are simply concatenated.

use std::io::Write;

use tsemit_core::response::ResponseDocument;

use super::Formatter;
use crate::error::Result;

#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackFormatter;

impl Formatter for MsgPackFormatter {
    fn content_type(&self) -> &'static str {
        "application/x-msgpack"
    }

    fn write_response(&mut self, w: &mut dyn Write, resp: &ResponseDocument) -> Result<usize> {
        let buf = rmp_serde::to_vec_named(resp)?;
        w.write_all(&buf)?;
        Ok(buf.len())
    }
}
