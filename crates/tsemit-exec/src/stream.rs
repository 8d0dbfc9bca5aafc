//! Nested bounded result stream: statements → series → rows.
//!
//! The producer (query engine) holds the writer halves and the emitter holds
//! the stream halves. Every level is a bounded channel, so a send blocks
//! until the emitter reads; with capacity 0 each send is a rendezvous.
//!
//! Abandonment is explicit and never leaves the producer blocked:
//! - dropping (or `abandon`ing) a `SeriesStream` or `RowStream` disconnects
//!   it, and any pending or later send on it fails with
//!   `SendError::Abandoned`;
//! - `ResultStream::cancel` trips the `CancelToken` shared by every level,
//!   after which all sends fail with `SendError::Cancelled`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use thiserror::Error;

use tsemit_core::types::{RowRecord, Scalar, Tags};

/// Response-wide cancellation flag shared by producer and consumer.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    /// The emitter dropped this sub-stream; skip the rest of it.
    #[error("consumer abandoned the stream")]
    Abandoned,

    /// The whole response was cancelled; stop producing.
    #[error("response cancelled")]
    Cancelled,
}

fn send<T>(tx: &Sender<T>, cancel: &CancelToken, item: T) -> Result<(), SendError> {
    if cancel.is_cancelled() {
        return Err(SendError::Cancelled);
    }
    tx.send(item).map_err(|_| {
        if cancel.is_cancelled() {
            SendError::Cancelled
        } else {
            SendError::Abandoned
        }
    })
}

/// Create a result stream whose levels each hold `capacity` items.
pub fn result_channel(capacity: usize) -> (ResultSender, ResultStream) {
    let (tx, rx) = bounded(capacity);
    let cancel = CancelToken::new();
    (
        ResultSender {
            tx,
            capacity,
            cancel: cancel.clone(),
        },
        ResultStream { rx, cancel },
    )
}

/// Run `produce` on its own thread, feeding the returned stream.
///
/// The sender is dropped when `produce` returns, which ends the stream.
pub fn spawn_producer<F>(
    capacity: usize,
    produce: F,
) -> (ResultStream, JoinHandle<Result<(), SendError>>)
where
    F: FnOnce(&ResultSender) -> Result<(), SendError> + Send + 'static,
{
    let (tx, rx) = result_channel(capacity);
    let handle = thread::spawn(move || produce(&tx));
    (rx, handle)
}

// ---------------------------------------------------------------------------
// producer side
// ---------------------------------------------------------------------------

pub struct ResultSender {
    tx: Sender<StatementResult>,
    capacity: usize,
    cancel: CancelToken,
}

impl ResultSender {
    /// Start a statement. Its series are sent through the returned writer;
    /// dropping the writer ends the statement.
    pub fn statement(
        &self,
        id: usize,
        messages: Vec<String>,
    ) -> Result<StatementWriter, SendError> {
        let (tx, rx) = bounded(self.capacity);
        let series = SeriesStream {
            rx,
            cancel: self.cancel.clone(),
        };
        send(
            &self.tx,
            &self.cancel,
            StatementResult {
                id,
                messages,
                err: None,
                series,
            },
        )?;
        Ok(StatementWriter {
            tx,
            capacity: self.capacity,
            cancel: self.cancel.clone(),
        })
    }

    /// Report a statement that failed before producing any series.
    pub fn statement_error(
        &self,
        id: usize,
        messages: Vec<String>,
        err: impl Into<String>,
    ) -> Result<(), SendError> {
        // sender dropped right away: the series stream is empty
        let (_, rx) = bounded(0);
        let series = SeriesStream {
            rx,
            cancel: self.cancel.clone(),
        };
        send(
            &self.tx,
            &self.cancel,
            StatementResult {
                id,
                messages,
                err: Some(err.into()),
                series,
            },
        )
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// End the stream. Same as dropping the sender.
    pub fn close(self) {}
}

pub struct StatementWriter {
    tx: Sender<SeriesBlock>,
    capacity: usize,
    cancel: CancelToken,
}

impl StatementWriter {
    pub fn series(
        &self,
        name: impl Into<String>,
        tags: Tags,
        columns: Vec<String>,
    ) -> Result<SeriesWriter, SendError> {
        let (tx, rx) = bounded(self.capacity);
        let rows = RowStream {
            rx,
            cancel: self.cancel.clone(),
        };
        send(
            &self.tx,
            &self.cancel,
            SeriesBlock {
                name: name.into(),
                tags,
                columns,
                err: None,
                rows,
            },
        )?;
        Ok(SeriesWriter {
            tx,
            cancel: self.cancel.clone(),
        })
    }

    /// Report a failed series. Producers must not send further series for
    /// this statement afterwards; emitters abandon the statement here.
    pub fn series_error(&self, err: impl Into<String>) -> Result<(), SendError> {
        let (_, rx) = bounded(0);
        let rows = RowStream {
            rx,
            cancel: self.cancel.clone(),
        };
        send(
            &self.tx,
            &self.cancel,
            SeriesBlock {
                name: String::new(),
                tags: Tags::new(),
                columns: Vec::new(),
                err: Some(err.into()),
                rows,
            },
        )
    }

    pub fn close(self) {}
}

pub struct SeriesWriter {
    tx: Sender<RowRecord>,
    cancel: CancelToken,
}

impl SeriesWriter {
    pub fn emit(&self, values: Vec<Scalar>) -> Result<(), SendError> {
        send(&self.tx, &self.cancel, RowRecord::new(values))
    }

    /// Report a row-level failure.
    pub fn fail(&self, err: impl Into<String>) -> Result<(), SendError> {
        send(&self.tx, &self.cancel, RowRecord::error(err))
    }

    pub fn close(self) {}
}

// ---------------------------------------------------------------------------
// consumer side
// ---------------------------------------------------------------------------

/// Statements in production order. Consumed once, front to back.
pub struct ResultStream {
    rx: Receiver<StatementResult>,
    cancel: CancelToken,
}

impl ResultStream {
    /// Stop the whole response. Every producer send from now on fails with
    /// `SendError::Cancelled`; a send already blocked on a nested stream
    /// fails the same way once that stream is dropped.
    pub fn cancel(self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }
}

impl Iterator for ResultStream {
    type Item = StatementResult;

    fn next(&mut self) -> Option<StatementResult> {
        self.rx.recv().ok()
    }
}

/// One statement. If `err` is set, `series` yields nothing.
pub struct StatementResult {
    pub id: usize,
    pub messages: Vec<String>,
    pub err: Option<String>,
    pub series: SeriesStream,
}

pub struct SeriesStream {
    rx: Receiver<SeriesBlock>,
    cancel: CancelToken,
}

impl SeriesStream {
    /// Stop reading this statement. The producer's next series send for it
    /// fails with `SendError::Abandoned`.
    pub fn abandon(self) {}

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Iterator for SeriesStream {
    type Item = SeriesBlock;

    fn next(&mut self) -> Option<SeriesBlock> {
        self.rx.recv().ok()
    }
}

/// One series. If `err` is set, `rows` yields nothing.
pub struct SeriesBlock {
    pub name: String,
    pub tags: Tags,
    pub columns: Vec<String>,
    pub err: Option<String>,
    pub rows: RowStream,
}

pub struct RowStream {
    rx: Receiver<RowRecord>,
    cancel: CancelToken,
}

impl RowStream {
    /// Stop reading this series. The producer's next row send for it fails
    /// with `SendError::Abandoned`.
    pub fn abandon(self) {}

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Iterator for RowStream {
    type Item = RowRecord;

    fn next(&mut self) -> Option<RowRecord> {
        self.rx.recv().ok()
    }
}
