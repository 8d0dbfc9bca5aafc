//! Convenient re-exports for downstream crates.

pub use crate::config::EmitConfig;
pub use crate::epoch::EpochUnit;
pub use crate::error::{Error, Result};
pub use crate::response::{ResponseDocument, ResultFrame, SeriesTable};
pub use crate::types::{RowRecord, Scalar, Tags};
