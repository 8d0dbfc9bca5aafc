#![forbid(unsafe_code)]
//! tsemit-core: value types, response documents, epoch rewriting and config.
//!
//! Everything here is plain data. Streams, threads and writers live in
//! `tsemit-io` and `tsemit-exec`.

pub mod config;
pub mod epoch;
pub mod error;
pub mod prelude;
pub mod response;
pub mod types;
