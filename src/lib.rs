#![forbid(unsafe_code)]
//! tsemit: result emission for a time-series query endpoint.
//!
//! Umbrella crate over the workspace. `tsemit_exec` holds the emitters and
//! negotiation, `tsemit_io` the wire formatters, `tsemit_core` the shared
//! data model.

pub use tsemit_core;
pub use tsemit_exec;
pub use tsemit_io;

pub use tsemit_core::config::EmitConfig;
pub use tsemit_exec::{spawn_producer, EmitRequest, Encoder, ResultSender, ResultStream};
