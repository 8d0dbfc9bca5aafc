//! Typed scalars and the per-row record handed from the query engine.
//!
//! `Scalar` carries its own `Serialize` impl so every formatter that goes
//! through serde (JSON, MessagePack) renders timestamps and integral floats
//! the same way.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::error::Result;

/// Ordered tag set of a series. Keys iterate sorted.
pub type Tags = BTreeMap<String, String>;

/// Largest magnitude at which every integral `f64` is exactly representable.
const MAX_EXACT_F64_INT: f64 = 9_007_199_254_740_992.0;

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    Str(String),
    Time(DateTime<Utc>),
}

impl Scalar {
    pub fn is_time(&self) -> bool {
        matches!(self, Scalar::Time(_))
    }

    /// Nanoseconds since the Unix epoch for temporal values.
    ///
    /// `None` for non-temporal values and for instants outside the `i64`
    /// nanosecond range (roughly years 1677..2262).
    pub fn unix_nanos(&self) -> Option<i64> {
        match self {
            Scalar::Time(ts) => ts.timestamp_nanos_opt(),
            _ => None,
        }
    }
}

/// RFC3339 in UTC with the fractional part trimmed of trailing zeros and
/// omitted entirely on whole seconds.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    let mut out = ts.format("%Y-%m-%dT%H:%M:%S").to_string();
    let nanos = ts.timestamp_subsec_nanos();
    if nanos != 0 {
        let frac = format!("{:09}", nanos);
        out.push('.');
        out.push_str(frac.trim_end_matches('0'));
    }
    out.push('Z');
    out
}

/// Parse an RFC3339 timestamp into UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::I64(i) => write!(f, "{}", i),
            Scalar::U64(u) => write!(f, "{}", u),
            Scalar::F64(v) => write!(f, "{}", v),
            Scalar::Str(s) => f.write_str(s),
            Scalar::Time(ts) => f.write_str(&format_timestamp(ts)),
        }
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Scalar::Null => serializer.serialize_none(),
            Scalar::Bool(b) => serializer.serialize_bool(*b),
            Scalar::I64(i) => serializer.serialize_i64(*i),
            Scalar::U64(u) => serializer.serialize_u64(*u),
            Scalar::F64(v) if !v.is_finite() => serializer.serialize_none(),
            Scalar::F64(v) if v.fract() == 0.0 && v.abs() < MAX_EXACT_F64_INT => {
                serializer.serialize_i64(*v as i64)
            }
            Scalar::F64(v) => serializer.serialize_f64(*v),
            Scalar::Str(s) => serializer.serialize_str(s),
            Scalar::Time(ts) => serializer.serialize_str(&format_timestamp(ts)),
        }
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::I64(v)
    }
}

impl From<u64> for Scalar {
    fn from(v: u64) -> Self {
        Scalar::U64(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Scalar::F64(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Str(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Str(v)
    }
}

impl From<DateTime<Utc>> for Scalar {
    fn from(v: DateTime<Utc>) -> Self {
        Scalar::Time(v)
    }
}

/// One row as produced by the query engine.
///
/// By convention `values[0]` is the row timestamp when it is temporal.
/// `values.len()` is expected to match the series columns; this is trusted,
/// not checked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowRecord {
    pub values: Vec<Scalar>,
    pub err: Option<String>,
}

impl RowRecord {
    pub fn new(values: Vec<Scalar>) -> Self {
        Self { values, err: None }
    }

    pub fn error(err: impl Into<String>) -> Self {
        Self {
            values: Vec::new(),
            err: Some(err.into()),
        }
    }
}
