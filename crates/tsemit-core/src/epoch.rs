//! Timestamp rewriting into an epoch-relative integer unit.

use serde::{Deserialize, Serialize};

use crate::types::{RowRecord, Scalar};

const NANOS_PER_MICRO: i64 = 1_000;
const NANOS_PER_MILLI: i64 = 1_000_000;
const NANOS_PER_SECOND: i64 = 1_000_000_000;
const NANOS_PER_MINUTE: i64 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: i64 = 60 * NANOS_PER_MINUTE;

/// Integer time granularity for rewritten timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpochUnit {
    Nanosecond,
    Microsecond,
    Millisecond,
    Second,
    Minute,
    Hour,
}

impl EpochUnit {
    /// Map a selector (`u`, `ms`, `s`, `m`, `h`) to a unit.
    ///
    /// Anything else, including `ns` and the empty string, means raw
    /// nanoseconds.
    pub fn parse(selector: &str) -> Self {
        match selector {
            "u" => EpochUnit::Microsecond,
            "ms" => EpochUnit::Millisecond,
            "s" => EpochUnit::Second,
            "m" => EpochUnit::Minute,
            "h" => EpochUnit::Hour,
            _ => EpochUnit::Nanosecond,
        }
    }

    /// Interpret an `epoch` request parameter. Absent or blank disables
    /// rewriting entirely, which keeps timestamps temporal.
    pub fn from_param(param: Option<&str>) -> Option<Self> {
        match param.map(str::trim) {
            None | Some("") => None,
            Some(s) => Some(Self::parse(s)),
        }
    }

    pub fn divisor(self) -> i64 {
        match self {
            EpochUnit::Nanosecond => 1,
            EpochUnit::Microsecond => NANOS_PER_MICRO,
            EpochUnit::Millisecond => NANOS_PER_MILLI,
            EpochUnit::Second => NANOS_PER_SECOND,
            EpochUnit::Minute => NANOS_PER_MINUTE,
            EpochUnit::Hour => NANOS_PER_HOUR,
        }
    }

    /// Replace a temporal `values[0]` with its integer epoch offset.
    /// Rows whose first value is not temporal are left alone.
    pub fn rewrite(self, row: &mut RowRecord) {
        if let Some(first) = row.values.first_mut() {
            if let Some(nanos) = first.unix_nanos() {
                *first = Scalar::I64(nanos / self.divisor());
            }
        }
    }
}
