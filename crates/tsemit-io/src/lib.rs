#![forbid(unsafe_code)]
//! tsemit-io: response formatters.
//!
//! A formatter turns one `ResponseDocument` into bytes on a destination and
//! reports its content type. Emitters call it once per buffered response or
//! once per streamed frame, always sequentially on the same destination.

pub mod error;
pub mod writers;

pub use error::{Error, Result};
pub use writers::csv::CsvFormatter;
pub use writers::json::JsonFormatter;
pub use writers::msgpack::MsgPackFormatter;
pub use writers::{Formatter, ResponseFormatter};
