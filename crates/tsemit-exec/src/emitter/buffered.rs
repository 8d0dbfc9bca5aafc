//! Buffered emission: the whole stream becomes one response document.

use std::io::Write;

use tracing::{debug, warn};

use tsemit_core::epoch::EpochUnit;
use tsemit_core::response::{ResponseDocument, ResultFrame, SeriesTable};
use tsemit_io::Formatter;

use super::EmitStats;
use crate::error::Result;
use crate::stream::{CancelToken, ResultStream, SeriesBlock, StatementResult};

/// How draining one statement ended.
enum Drain {
    Complete,
    RowLimit,
}

pub struct BufferedEmitter<F> {
    formatter: F,
    /// Cap on rows across the whole response. 0 means unlimited.
    max_rows: usize,
    epoch: Option<EpochUnit>,
}

impl<F: Formatter> BufferedEmitter<F> {
    pub fn new(formatter: F, max_rows: usize, epoch: Option<EpochUnit>) -> Self {
        Self {
            formatter,
            max_rows,
            epoch,
        }
    }

    pub fn content_type(&self) -> &'static str {
        self.formatter.content_type()
    }

    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    pub fn epoch(&self) -> Option<EpochUnit> {
        self.epoch
    }

    /// Drain `results` and write a single document.
    ///
    /// Hitting the row cap marks the active series partial and cancels the
    /// stream: no further statements are read.
    pub fn emit<W: Write>(&mut self, w: &mut W, mut results: ResultStream) -> Result<EmitStats> {
        let mut stats = EmitStats::default();
        let mut resp = ResponseDocument::default();
        let mut total_rows = 0usize;
        let cancel = results.cancel_token();

        while let Some(stmt) = results.next() {
            stats.statements += 1;
            let (frame, drain) = self.drain_statement(stmt, &cancel, &mut total_rows);
            resp.results.push(frame);
            if let Drain::RowLimit = drain {
                warn!(max_rows = self.max_rows, "row limit reached, truncating response");
                stats.truncated = true;
                results.cancel();
                break;
            }
        }

        stats.rows = resp.row_count();
        stats.bytes = self.formatter.write_response(w, &resp)?;
        stats.frames = 1;
        Ok(stats)
    }

    fn drain_statement(
        &self,
        stmt: StatementResult,
        cancel: &CancelToken,
        total_rows: &mut usize,
    ) -> (ResultFrame, Drain) {
        let StatementResult {
            id,
            messages,
            err,
            mut series,
        } = stmt;
        let mut frame = ResultFrame {
            statement_id: id,
            messages,
            err,
            ..Default::default()
        };
        if frame.err.is_some() {
            return (frame, Drain::Complete);
        }

        while let Some(block) = series.next() {
            let SeriesBlock {
                name,
                tags,
                columns,
                err,
                mut rows,
            } = block;
            if let Some(err) = err {
                debug!(statement_id = id, %err, "series failed, skipping rest of statement");
                frame.err = Some(err);
                frame.series.clear();
                series.abandon();
                return (frame, Drain::Complete);
            }

            let mut table = SeriesTable::new(name, tags, columns);
            while let Some(mut row) = rows.next() {
                if let Some(err) = row.err {
                    debug!(statement_id = id, %err, "row failed, skipping rest of statement");
                    frame.err = Some(err);
                    frame.series.clear();
                    rows.abandon();
                    series.abandon();
                    return (frame, Drain::Complete);
                }
                if self.max_rows > 0 && *total_rows + table.values.len() >= self.max_rows {
                    // trip before the nested streams drop so the producer
                    // stops with Cancelled
                    cancel.cancel();
                    table.partial = true;
                    frame.series.push(table);
                    return (frame, Drain::RowLimit);
                }
                if let Some(unit) = self.epoch {
                    unit.rewrite(&mut row);
                }
                table.values.push(row.values);
            }
            *total_rows += table.values.len();
            frame.series.push(table);
        }
        (frame, Drain::Complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::fixtures::{cols, cpu_and_databases, host, stream_of, ts};
    use crate::stream::SendError;
    use tsemit_core::types::{Scalar, Tags};
    use tsemit_io::{CsvFormatter, JsonFormatter};

    fn run(emitter: &mut BufferedEmitter<JsonFormatter>, results: ResultStream) -> (String, EmitStats) {
        let mut out = Vec::new();
        let stats = emitter.emit(&mut out, results).unwrap();
        (String::from_utf8(out).unwrap(), stats)
    }

    #[test]
    fn whole_stream_in_one_document() {
        let (results, producer) = stream_of(cpu_and_databases);
        let mut e = BufferedEmitter::new(JsonFormatter::new(false), 0, None);
        let (out, stats) = run(&mut e, results);
        producer.join().unwrap().unwrap();
        assert_eq!(
            out.trim_end(),
            r#"{"results":[{"statement_id":0,"series":[{"name":"cpu","tags":{"host":"server01"},"columns":["time","value"],"values":[["1970-01-01T00:00:00Z",2],["1970-01-01T00:00:10Z",5],["1970-01-01T00:00:20Z",7]]},{"name":"cpu","tags":{"host":"server02"},"columns":["time","value"],"values":[["1970-01-01T00:00:00Z",8]]}]},{"statement_id":1,"series":[{"name":"databases","columns":["name"],"values":[["db0"],["db1"]]}]}]}"#
        );
        assert_eq!(stats.statements, 2);
        assert_eq!(stats.frames, 1);
        assert_eq!(stats.rows, 6);
        assert_eq!(stats.bytes, out.len());
        assert!(!stats.truncated);
    }

    #[test]
    fn row_cap_truncates_and_cancels() {
        // 4 rows in statement 0 (two series of 2), cap of 3
        let (results, producer) = stream_of(|tx| {
            let stmt = tx.statement(0, vec![])?;
            for h in ["a", "b"] {
                let s = stmt.series("cpu", host(h), cols(&["time", "value"]))?;
                s.emit(vec![ts(0), Scalar::I64(1)])?;
                s.emit(vec![ts(1), Scalar::I64(2)])?;
            }
            drop(stmt);
            let stmt = tx.statement(1, vec![])?;
            let s = stmt.series("mem", Tags::new(), cols(&["time", "value"]))?;
            s.emit(vec![ts(0), Scalar::I64(3)])?;
            Ok(())
        });
        let mut e = BufferedEmitter::new(JsonFormatter::new(false), 3, None);
        let (out, stats) = run(&mut e, results);
        assert_eq!(producer.join().unwrap(), Err(SendError::Cancelled));

        let doc: serde_json::Value = serde_json::from_str(&out).unwrap();
        let results = doc["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        let series = results[0]["series"].as_array().unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0]["values"].as_array().unwrap().len(), 2);
        assert!(series[0].get("partial").is_none());
        assert_eq!(series[1]["values"].as_array().unwrap().len(), 1);
        assert_eq!(series[1]["partial"], true);
        assert_eq!(stats.rows, 3);
        assert!(stats.truncated);
    }

    #[test]
    fn row_cap_counts_across_statements() {
        // the cap is global: statement 1 gets only what is left
        let (results, producer) = stream_of(|tx| {
            for id in 0..2 {
                let stmt = tx.statement(id, vec![])?;
                let s = stmt.series("cpu", Tags::new(), cols(&["value"]))?;
                s.emit(vec![Scalar::I64(1)])?;
                s.emit(vec![Scalar::I64(2)])?;
            }
            Ok(())
        });
        let mut e = BufferedEmitter::new(JsonFormatter::new(false), 3, None);
        let (out, stats) = run(&mut e, results);
        let _ = producer.join().unwrap();
        assert_eq!(
            out.trim_end(),
            r#"{"results":[{"statement_id":0,"series":[{"name":"cpu","columns":["value"],"values":[[1],[2]]}]},{"statement_id":1,"series":[{"name":"cpu","columns":["value"],"values":[[1]],"partial":true}]}]}"#
        );
        assert_eq!(stats.rows, 3);
    }

    #[test]
    fn statement_error_is_a_bare_frame() {
        let (results, producer) = stream_of(|tx| {
            tx.statement_error(0, vec!["warn".into()], "database not found")?;
            let stmt = tx.statement(1, vec![])?;
            let s = stmt.series("cpu", Tags::new(), cols(&["value"]))?;
            s.emit(vec![Scalar::I64(1)])
        });
        let mut e = BufferedEmitter::new(JsonFormatter::new(false), 0, None);
        let (out, _) = run(&mut e, results);
        producer.join().unwrap().unwrap();
        assert_eq!(
            out.trim_end(),
            r#"{"results":[{"statement_id":0,"messages":["warn"],"error":"database not found"},{"statement_id":1,"series":[{"name":"cpu","columns":["value"],"values":[[1]]}]}]}"#
        );
    }

    #[test]
    fn series_error_discards_the_statement() {
        let (results, producer) = stream_of(|tx| {
            let stmt = tx.statement(0, vec![])?;
            let s = stmt.series("cpu", Tags::new(), cols(&["value"]))?;
            s.emit(vec![Scalar::I64(1)])?;
            s.close();
            stmt.series_error("shard unavailable")?;
            // emitter has moved on; this statement is gone
            assert_eq!(
                stmt.series("late", Tags::new(), vec![]).err(),
                Some(SendError::Abandoned)
            );
            drop(stmt);
            let stmt = tx.statement(1, vec![])?;
            let s = stmt.series("mem", Tags::new(), cols(&["value"]))?;
            s.emit(vec![Scalar::I64(2)])
        });
        let mut e = BufferedEmitter::new(JsonFormatter::new(false), 0, None);
        let (out, stats) = run(&mut e, results);
        producer.join().unwrap().unwrap();
        assert_eq!(
            out.trim_end(),
            r#"{"results":[{"statement_id":0,"error":"shard unavailable"},{"statement_id":1,"series":[{"name":"mem","columns":["value"],"values":[[2]]}]}]}"#
        );
        assert_eq!(stats.rows, 1);
    }

    #[test]
    fn row_error_discards_the_statement() {
        let (results, producer) = stream_of(|tx| {
            let stmt = tx.statement(0, vec![])?;
            let s = stmt.series("cpu", Tags::new(), cols(&["value"]))?;
            s.emit(vec![Scalar::I64(1)])?;
            s.fail("decode error")?;
            match s.emit(vec![Scalar::I64(2)]) {
                Err(SendError::Abandoned) => Ok(()),
                other => panic!("expected abandoned, got {other:?}"),
            }
        });
        let mut e = BufferedEmitter::new(JsonFormatter::new(false), 0, None);
        let (out, _) = run(&mut e, results);
        producer.join().unwrap().unwrap();
        assert_eq!(
            out.trim_end(),
            r#"{"results":[{"statement_id":0,"error":"decode error"}]}"#
        );
    }

    #[test]
    fn epoch_rewrites_timestamps() {
        let (results, producer) = stream_of(cpu_and_databases);
        let mut e = BufferedEmitter::new(JsonFormatter::new(false), 0, Some(EpochUnit::Second));
        let (out, _) = run(&mut e, results);
        producer.join().unwrap().unwrap();
        let doc: serde_json::Value = serde_json::from_str(&out).unwrap();
        let values = &doc["results"][0]["series"][0]["values"];
        assert_eq!(values[1][0], 10);
        assert_eq!(values[2][0], 20);
        // non-temporal first values are untouched
        assert_eq!(doc["results"][1]["series"][0]["values"][0][0], "db0");
    }

    #[test]
    fn csv_formatter_gets_the_same_document() {
        let (results, producer) = stream_of(cpu_and_databases);
        let mut e = BufferedEmitter::new(CsvFormatter::new(), 0, None);
        assert_eq!(e.content_type(), "text/csv");
        let mut out = Vec::new();
        e.emit(&mut out, results).unwrap();
        producer.join().unwrap().unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "name,tags,time,value\n\
             cpu,host=server01,0,2\n\
             cpu,host=server01,10000000000,5\n\
             cpu,host=server01,20000000000,7\n\
             cpu,host=server02,0,8\n\
             \n\
             name,tags,name\n\
             databases,,db0\n\
             databases,,db1\n"
        );
    }
}
