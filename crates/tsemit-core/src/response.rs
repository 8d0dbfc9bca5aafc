//! Response documents handed to a formatter.
//!
//! Built fresh for every emitted document and dropped right after the
//! formatter returns. Field order here is wire order for serde formats.

use serde::Serialize;

use crate::types::{Scalar, Tags};

fn is_false(b: &bool) -> bool {
    !*b
}

/// The unit a formatter writes: one buffered response or one streamed chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResponseDocument {
    pub results: Vec<ResultFrame>,

    /// Request-level failure, reported in place of (or next to) results.
    #[serde(rename = "error", skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
}

impl ResponseDocument {
    /// Document carrying exactly one frame (the chunked delivery shape).
    pub fn single(frame: ResultFrame) -> Self {
        Self {
            results: vec![frame],
            err: None,
        }
    }

    pub fn failed(err: impl Into<String>) -> Self {
        Self {
            results: Vec::new(),
            err: Some(err.into()),
        }
    }

    /// Total rows across every table of every frame.
    pub fn row_count(&self) -> usize {
        self.results.iter().map(ResultFrame::row_count).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultFrame {
    pub statement_id: usize,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub series: Vec<SeriesTable>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<String>,

    #[serde(skip_serializing_if = "is_false")]
    pub partial: bool,

    #[serde(rename = "error", skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
}

impl ResultFrame {
    pub fn new(statement_id: usize, messages: Vec<String>) -> Self {
        Self {
            statement_id,
            messages,
            ..Default::default()
        }
    }

    /// Error-only frame: no series data.
    pub fn error(statement_id: usize, messages: Vec<String>, err: impl Into<String>) -> Self {
        Self {
            statement_id,
            messages,
            err: Some(err.into()),
            ..Default::default()
        }
    }

    pub fn row_count(&self) -> usize {
        self.series.iter().map(|s| s.values.len()).sum()
    }
}

/// A named, tagged table of value tuples sharing one column schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeriesTable {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(skip_serializing_if = "Tags::is_empty")]
    pub tags: Tags,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<Vec<Scalar>>,

    #[serde(skip_serializing_if = "is_false")]
    pub partial: bool,
}

impl SeriesTable {
    pub fn new(name: impl Into<String>, tags: Tags, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            tags,
            columns,
            values: Vec::new(),
            partial: false,
        }
    }
}
