//! JSON formatter: one document per line.

use std::io::Write;

use serde::Serialize;
use tsemit_core::response::ResponseDocument;

use super::Formatter;
use crate::error::Result;

#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl Formatter for JsonFormatter {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn write_response(&mut self, w: &mut dyn Write, resp: &ResponseDocument) -> Result<usize> {
        let mut buf = Vec::new();
        if self.pretty {
            let fmt = serde_json::ser::PrettyFormatter::with_indent(b"    ");
            let mut ser = serde_json::Serializer::with_formatter(&mut buf, fmt);
            resp.serialize(&mut ser)?;
        } else {
            serde_json::to_writer(&mut buf, resp)?;
        }
        // newline-delimited so chunked frames split cleanly
        buf.push(b'\n');
        w.write_all(&buf)?;
        Ok(buf.len())
    }
}
