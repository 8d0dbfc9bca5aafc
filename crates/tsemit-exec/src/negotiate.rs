//! Content negotiation: pick a formatter and a delivery mode per request.

use std::collections::HashMap;
use std::io::Write;

use tracing::debug;

use tsemit_core::config::EmitConfig;
use tsemit_core::epoch::EpochUnit;
use tsemit_io::ResponseFormatter;

use crate::emitter::buffered::BufferedEmitter;
use crate::emitter::chunked::StreamingEmitter;
use crate::emitter::EmitStats;
use crate::error::Result;
use crate::stream::ResultStream;

/// The parts of an HTTP query request that shape emission.
#[derive(Debug, Clone, Default)]
pub struct EmitRequest {
    accept: Option<String>,
    params: HashMap<String, String>,
}

impl EmitRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn accept(&self) -> Option<&str> {
        self.accept.as_deref()
    }

    /// Trimmed query/form value.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(|v| v.trim())
    }

    fn flag(&self, key: &str) -> bool {
        self.param(key) == Some("true")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Csv,
    MsgPack,
    Json,
}

impl MediaType {
    /// First recognized media type in an `Accept` list; JSON otherwise.
    pub fn from_accept(accept: Option<&str>) -> Self {
        accept
            .into_iter()
            .flat_map(|a| a.split(','))
            .filter_map(|part| {
                let essence = part.split(';').next().unwrap_or("").trim();
                match essence.to_ascii_lowercase().as_str() {
                    "text/csv" | "application/csv" => Some(MediaType::Csv),
                    "application/x-msgpack" => Some(MediaType::MsgPack),
                    "application/json" => Some(MediaType::Json),
                    _ => None,
                }
            })
            .next()
            .unwrap_or(MediaType::Json)
    }
}

/// `(chunked, size)`. Size is the request's positive `chunk_size`, or the
/// configured default when chunked without a usable one, or 0 when not
/// chunked. Malformed sizes never fail the request.
fn chunk_options(req: &EmitRequest, cfg: &EmitConfig) -> (bool, usize) {
    if !req.flag("chunked") {
        return (false, 0);
    }
    let size = req
        .param("chunk_size")
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(cfg.default_chunk_size.max(1));
    (true, size)
}

/// Emission strategy chosen once per request.
pub enum Encoder {
    Buffered(BufferedEmitter<ResponseFormatter>),
    Chunked(StreamingEmitter<ResponseFormatter>),
}

impl Encoder {
    pub fn negotiate(req: &EmitRequest, cfg: &EmitConfig) -> Self {
        let epoch = EpochUnit::from_param(req.param("epoch"));
        let media = MediaType::from_accept(req.accept());
        let (chunked, size) = chunk_options(req, cfg);

        let encoder = match media {
            MediaType::MsgPack => {
                let size = if size == 0 {
                    cfg.default_chunk_size.max(1)
                } else {
                    size
                };
                Encoder::Chunked(StreamingEmitter::new(ResponseFormatter::msgpack(), size, epoch))
            }
            MediaType::Csv | MediaType::Json => {
                let formatter = match media {
                    MediaType::Csv => ResponseFormatter::csv(),
                    _ => ResponseFormatter::json(req.flag("pretty")),
                };
                if chunked {
                    Encoder::Chunked(StreamingEmitter::new(formatter, size, epoch))
                } else {
                    Encoder::Buffered(BufferedEmitter::new(formatter, cfg.max_row_limit, epoch))
                }
            }
        };
        debug!(
            ?media,
            chunked = encoder.is_chunked(),
            ?epoch,
            "negotiated encoder"
        );
        encoder
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Encoder::Buffered(e) => e.content_type(),
            Encoder::Chunked(e) => e.content_type(),
        }
    }

    pub fn is_chunked(&self) -> bool {
        matches!(self, Encoder::Chunked(_))
    }

    pub fn encode<W: Write>(&mut self, w: &mut W, results: ResultStream) -> Result<EmitStats> {
        match self {
            Encoder::Buffered(e) => e.emit(w, results),
            Encoder::Chunked(e) => e.emit(w, results),
        }
    }
}
