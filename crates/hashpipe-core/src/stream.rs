//! Bounded item streams connecting pipeline stages.
//!
//! A stream is a `sync_channel` with exactly one writer and one reader. The
//! writer closes the stream by being dropped. Reads poll with a short timeout
//! so a cancelled run is noticed even while the upstream stage is stalled.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender, sync_channel};
use std::time::Duration;

use crate::error::PipelineError;
use crate::item::Item;
use crate::shutdown::CancelToken;

/// Interval between cancellation checks while waiting on an empty stream
const CANCEL_POLL: Duration = Duration::from_millis(50);

/// Shared item counter for stage statistics
pub type ItemCounter = Arc<AtomicUsize>;

/// Create a stream holding at most `capacity` unread items.
///
/// A capacity of 0 makes every send a rendezvous with the reader.
pub fn stream(capacity: usize, cancel: &CancelToken) -> (StreamWriter, StreamReader) {
    let (tx, rx) = sync_channel(capacity);
    let writer = StreamWriter {
        tx,
        sent: Arc::new(AtomicUsize::new(0)),
    };
    let reader = StreamReader {
        rx,
        cancel: cancel.clone(),
    };
    (writer, reader)
}

/// Producer end of a stream. Dropping it closes the stream.
#[derive(Debug)]
pub struct StreamWriter {
    tx: SyncSender<Item>,
    sent: ItemCounter,
}

impl StreamWriter {
    /// Send one item, blocking while the stream is full.
    ///
    /// Fails with [`PipelineError::StreamClosed`] once the reader is gone.
    pub fn send(&self, item: impl Into<Item>) -> Result<(), PipelineError> {
        self.tx
            .send(item.into())
            .map_err(|_| PipelineError::StreamClosed)?;
        self.sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Number of items sent so far
    pub fn sent(&self) -> usize {
        self.sent.load(Ordering::Relaxed)
    }

    /// Counter handle that outlives the writer
    pub fn counter(&self) -> ItemCounter {
        self.sent.clone()
    }
}

/// Consumer end of a stream.
#[derive(Debug)]
pub struct StreamReader {
    rx: Receiver<Item>,
    cancel: CancelToken,
}

impl StreamReader {
    /// Wait for the next item.
    ///
    /// `Ok(None)` is end-of-stream: the writer was dropped and every item
    /// has been read. `Err(Cancelled)` means the run is being torn down.
    pub fn recv(&self) -> Result<Option<Item>, PipelineError> {
        loop {
            if self.cancel.is_cancelled() {
                return Err(PipelineError::Cancelled);
            }
            match self.rx.recv_timeout(CANCEL_POLL) {
                Ok(item) => return Ok(Some(item)),
                Err(RecvTimeoutError::Disconnected) => return Ok(None),
                Err(RecvTimeoutError::Timeout) => continue,
            }
        }
    }
}

impl Iterator for StreamReader {
    type Item = Result<Item, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.recv().transpose()
    }
}
