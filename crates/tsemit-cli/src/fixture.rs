//! JSON description of a query result stream, replayed through a
//! `ResultSender` as if the query engine produced it.

use serde::Deserialize;
use serde_json::Value;

use tsemit_core::types::{parse_timestamp, Scalar, Tags};
use tsemit_exec::{ResultSender, SendError, StatementWriter};

#[derive(Debug, Deserialize)]
pub struct Fixture {
    pub statements: Vec<FixtureStatement>,
}

#[derive(Debug, Deserialize)]
pub struct FixtureStatement {
    /// Defaults to the statement's position.
    #[serde(default)]
    pub id: Option<usize>,
    #[serde(default)]
    pub messages: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub series: Vec<FixtureSeries>,
}

#[derive(Debug, Deserialize)]
pub struct FixtureSeries {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub rows: Vec<FixtureRow>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FixtureRow {
    Values(Vec<Value>),
    Error { error: String },
}

impl Fixture {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Send every statement. Statements the consumer abandons are skipped;
    /// cancellation stops production.
    pub fn produce(&self, tx: &ResultSender) -> Result<(), SendError> {
        for (pos, stmt) in self.statements.iter().enumerate() {
            let id = stmt.id.unwrap_or(pos);
            let sent = match &stmt.error {
                Some(err) => tx.statement_error(id, stmt.messages.clone(), err.clone()),
                None => tx
                    .statement(id, stmt.messages.clone())
                    .and_then(|writer| produce_series(&writer, &stmt.series)),
            };
            match sent {
                Ok(()) | Err(SendError::Abandoned) => {}
                Err(SendError::Cancelled) => return Err(SendError::Cancelled),
            }
        }
        Ok(())
    }
}

fn produce_series(writer: &StatementWriter, series: &[FixtureSeries]) -> Result<(), SendError> {
    for s in series {
        if let Some(err) = &s.error {
            // nothing more for this statement after a series error
            return writer.series_error(err.clone());
        }
        let rows = writer.series(s.name.clone(), s.tags.clone(), s.columns.clone())?;
        for row in &s.rows {
            match row {
                FixtureRow::Values(values) => rows.emit(values.iter().map(to_scalar).collect())?,
                FixtureRow::Error { error } => rows.fail(error.clone())?,
            }
        }
    }
    Ok(())
}

/// RFC3339 strings become timestamps; everything else maps by JSON type.
pub fn to_scalar(v: &Value) -> Scalar {
    match v {
        Value::Null => Scalar::Null,
        Value::Bool(b) => Scalar::Bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Scalar::I64(i)
            } else if let Some(u) = n.as_u64() {
                Scalar::U64(u)
            } else {
                Scalar::F64(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => match parse_timestamp(s) {
            Ok(ts) => Scalar::Time(ts),
            Err(_) => Scalar::Str(s.clone()),
        },
        other => Scalar::Str(other.to_string()),
    }
}
