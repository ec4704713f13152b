//! Transport abstraction used by the queue to fetch bytes
//!
//! A [`Transport`] opens one handle per transfer attempt. The handle is primed
//! when opened and only performs I/O after [`TransportHandle::start`]. Results
//! flow back through the [`TransferReporter`] given to `open`.

use crate::download::queue::QueueShared;
use crate::error::TransportError;
use std::sync::{Arc, Weak};
use std::time::Instant;

/// How a started transport ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The whole payload was received
    Completed(Vec<u8>),
    /// The transfer failed for a reason other than an abort
    Failed(TransportError),
    /// The transfer stopped because it was aborted
    Aborted,
}

pub trait Transport: Send + Sync {
    /// Prepare a transfer of `location` without starting it.
    fn open(
        &self,
        method: &str,
        location: &str,
        reporter: TransferReporter,
    ) -> Arc<dyn TransportHandle>;
}

/// One in-flight or primed transfer attempt.
///
/// `abort` may arrive before `start`; a handle aborted first must not begin
/// any I/O when started later. Neither call may block, and neither may report
/// through the [`TransferReporter`] before returning.
pub trait TransportHandle: Send + Sync {
    fn start(&self);
    fn abort(&self);
}

/// Callback channel from a transport handle back to the queue.
///
/// Each reporter is bound to one record and one attempt. Once the record is
/// removed or retried, or the queue itself is dropped, its calls are ignored.
#[derive(Debug, Clone)]
pub struct TransferReporter {
    queue: Weak<QueueShared>,
    id: String,
    attempt: u32,
}

impl TransferReporter {
    pub(crate) fn new(queue: Weak<QueueShared>, id: String, attempt: u32) -> Self {
        Self { queue, id, attempt }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn started(&self) {
        if let Some(queue) = self.queue.upgrade() {
            queue.on_started(&self.id, self.attempt);
        }
    }

    /// Report `loaded` of `total` bytes. A `total` of 0 means unknown.
    pub fn progress(&self, loaded: u64, total: u64) {
        self.progress_at(loaded, total, Instant::now());
    }

    pub fn progress_at(&self, loaded: u64, total: u64, at: Instant) {
        if let Some(queue) = self.queue.upgrade() {
            queue.on_progress(&self.id, self.attempt, loaded, total, at);
        }
    }

    pub fn complete(&self, outcome: TransferOutcome) {
        if let Some(queue) = self.queue.upgrade() {
            queue.on_complete(&self.id, self.attempt, outcome);
        }
    }
}
