//! Chunked emission: one single-frame document per chunk or series boundary.
//!
//! Framing per statement:
//! - a series is cut into tables of at most `chunk_size` rows; every cut but
//!   the last is flagged partial at table and frame level;
//! - the last frame of a series is flagged partial at frame level only when
//!   another series of the same statement follows;
//! - statement messages ride on the statement's first frame only.

use std::io::Write;
use std::mem;

use tracing::{debug, trace};

use tsemit_core::epoch::EpochUnit;
use tsemit_core::response::{ResponseDocument, ResultFrame, SeriesTable};
use tsemit_io::Formatter;

use super::EmitStats;
use crate::error::{EmitError, Result};
use crate::stream::{CancelToken, ResultStream, SeriesBlock, StatementResult};

pub struct StreamingEmitter<F> {
    formatter: F,
    /// Rows per chunk. 0 means one frame per whole series.
    chunk_size: usize,
    epoch: Option<EpochUnit>,
}

impl<F: Formatter> StreamingEmitter<F> {
    pub fn new(formatter: F, chunk_size: usize, epoch: Option<EpochUnit>) -> Self {
        Self {
            formatter,
            chunk_size,
            epoch,
        }
    }

    pub fn content_type(&self) -> &'static str {
        self.formatter.content_type()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn epoch(&self) -> Option<EpochUnit> {
        self.epoch
    }

    /// Drain `results`, writing and flushing each frame as soon as it is
    /// complete. A write failure cancels the stream before returning.
    pub fn emit<W: Write>(&mut self, w: &mut W, mut results: ResultStream) -> Result<EmitStats> {
        let mut stats = EmitStats::default();
        let cancel = results.cancel_token();
        while let Some(stmt) = results.next() {
            stats.statements += 1;
            if let Err(e) = self.emit_statement(w, stmt, &cancel, &mut stats) {
                results.cancel();
                return Err(e);
            }
        }
        Ok(stats)
    }

    fn emit_statement<W: Write>(
        &mut self,
        w: &mut W,
        stmt: StatementResult,
        cancel: &CancelToken,
        stats: &mut EmitStats,
    ) -> Result<()> {
        let StatementResult {
            id,
            mut messages,
            err,
            mut series,
        } = stmt;

        if let Some(err) = err {
            return self.write_frame(w, cancel, ResultFrame::error(id, messages, err), stats);
        }

        let mut block = match series.next() {
            Some(block) => block,
            None => return self.write_frame(w, cancel, ResultFrame::new(id, messages), stats),
        };

        loop {
            let SeriesBlock {
                name,
                tags,
                columns,
                err,
                mut rows,
            } = block;
            if let Some(err) = err {
                // the producer must stop sending series for this statement
                debug!(statement_id = id, %err, "series failed, abandoning statement");
                series.abandon();
                return self.write_frame(w, cancel, ResultFrame::error(id, messages, err), stats);
            }

            let mut values = Vec::new();
            while let Some(mut row) = rows.next() {
                if let Some(err) = row.err {
                    // reported, then the series carries on
                    let frame = ResultFrame::error(id, mem::take(&mut messages), err);
                    self.write_frame(w, cancel, frame, stats)?;
                    continue;
                }
                if let Some(unit) = self.epoch {
                    unit.rewrite(&mut row);
                }
                if self.chunk_size > 0 && values.len() >= self.chunk_size {
                    let table = SeriesTable {
                        name: name.clone(),
                        tags: tags.clone(),
                        columns: columns.clone(),
                        values: mem::take(&mut values),
                        partial: true,
                    };
                    let frame = ResultFrame {
                        statement_id: id,
                        series: vec![table],
                        messages: mem::take(&mut messages),
                        partial: true,
                        err: None,
                    };
                    self.write_frame(w, cancel, frame, stats)?;
                }
                values.push(row.values);
            }

            let mut frame = ResultFrame {
                statement_id: id,
                series: vec![SeriesTable {
                    name,
                    tags,
                    columns,
                    values,
                    partial: false,
                }],
                messages: mem::take(&mut messages),
                ..Default::default()
            };

            // look ahead: more series means this statement is not done yet
            match series.next() {
                Some(next) => {
                    frame.partial = true;
                    self.write_frame(w, cancel, frame, stats)?;
                    block = next;
                }
                None => return self.write_frame(w, cancel, frame, stats),
            }
        }
    }

    /// Write one frame. On failure the token is tripped here, while the
    /// statement's nested streams are still held, so a producer blocked on
    /// them sees `Cancelled` rather than `Abandoned`.
    fn write_frame<W: Write>(
        &mut self,
        w: &mut W,
        cancel: &CancelToken,
        frame: ResultFrame,
        stats: &mut EmitStats,
    ) -> Result<()> {
        trace!(
            statement_id = frame.statement_id,
            partial = frame.partial,
            "writing frame"
        );
        stats.rows += frame.row_count();
        stats.frames += 1;
        let doc = ResponseDocument::single(frame);
        let written = self
            .formatter
            .write_response(w, &doc)
            .map_err(EmitError::from)
            .and_then(|n| w.flush().map(|_| n).map_err(EmitError::from));
        match written {
            Ok(n) => {
                stats.bytes += n;
                Ok(())
            }
            Err(e) => {
                cancel.cancel();
                Err(e)
            }
        }
    }
}
