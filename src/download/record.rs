//! Transfer record and transport handle state

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use super::types::{TransferSnapshot, TransferStatus};
use crate::transport::TransportHandle;
use crate::units::SizeInformation;

/// Lifecycle of the transport handle owned by a record
pub(crate) enum HandleState {
    NotPrimed,
    Primed(Arc<dyn TransportHandle>),
    InFlight(Arc<dyn TransportHandle>),
}

impl HandleState {
    /// Move a primed handle to in-flight and return it for starting
    pub(crate) fn launch(&mut self) -> Option<Arc<dyn TransportHandle>> {
        match std::mem::replace(self, HandleState::NotPrimed) {
            HandleState::Primed(handle) => {
                *self = HandleState::InFlight(Arc::clone(&handle));
                Some(handle)
            }
            other => {
                *self = other;
                None
            }
        }
    }

    /// Release the handle, whatever state it is in
    pub(crate) fn take(&mut self) -> Option<Arc<dyn TransportHandle>> {
        match std::mem::replace(self, HandleState::NotPrimed) {
            HandleState::NotPrimed => None,
            HandleState::Primed(handle) | HandleState::InFlight(handle) => Some(handle),
        }
    }

    pub(crate) fn is_in_flight(&self) -> bool {
        matches!(self, HandleState::InFlight(_))
    }

    pub(crate) fn is_not_primed(&self) -> bool {
        matches!(self, HandleState::NotPrimed)
    }
}

impl fmt::Debug for HandleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleState::NotPrimed => write!(f, "NotPrimed"),
            HandleState::Primed(_) => write!(f, "Primed"),
            HandleState::InFlight(_) => write!(f, "InFlight"),
        }
    }
}

#[derive(Debug)]
pub(crate) struct TransferRecord {
    pub id: String,
    pub name: String,
    pub url: String,
    pub total_size: u64,
    pub progress: f64,
    pub status: TransferStatus,
    pub handle: HandleState,
    pub attempt: u32,
    pub last_progress_at: Instant,
    pub loaded_bytes: u64,
    pub started_at: Option<Instant>,
    pub error: Option<String>,
    pub created_at: i64,
}

impl TransferRecord {
    pub(crate) fn new(
        id: String,
        name: String,
        url: String,
        total_size: u64,
        handle: HandleState,
        now: Instant,
    ) -> Self {
        Self {
            id,
            name,
            url,
            total_size,
            progress: 0.0,
            status: TransferStatus::Queued,
            handle,
            attempt: 0,
            last_progress_at: now,
            loaded_bytes: 0,
            started_at: None,
            error: None,
            created_at: Utc::now().timestamp_millis(),
        }
    }

    /// Progress as counted by the aggregate: failures are fully progressed
    pub(crate) fn weighted_progress(&self) -> f64 {
        if self.status == TransferStatus::Failed {
            1.0
        } else {
            self.progress
        }
    }

    /// Put the record back to its initial queued state for a new attempt
    pub(crate) fn reset_for_retry(&mut self) {
        self.attempt += 1;
        self.progress = 0.0;
        self.loaded_bytes = 0;
        self.started_at = None;
        self.error = None;
        self.status = TransferStatus::Queued;
    }

    pub(crate) fn snapshot(&self) -> TransferSnapshot {
        TransferSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            url: self.url.clone(),
            total_bytes: self.total_size,
            display_size: SizeInformation::from_bytes(self.total_size).to_string(),
            progress: self.progress,
            status: self.status,
            error: self.error.clone(),
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingHandle {
        starts: AtomicUsize,
    }

    impl TransportHandle for CountingHandle {
        fn start(&self) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }
        fn abort(&self) {}
    }

    #[test]
    fn launch_only_moves_primed_handles() {
        let mut state = HandleState::Primed(Arc::new(CountingHandle::default()));
        assert!(state.launch().is_some());
        assert!(state.is_in_flight());
        assert!(state.launch().is_none());
        assert!(state.is_in_flight());

        let mut empty = HandleState::NotPrimed;
        assert!(empty.launch().is_none());
        assert!(empty.is_not_primed());
    }

    #[test]
    fn take_releases_any_handle() {
        let mut state = HandleState::InFlight(Arc::new(CountingHandle::default()));
        assert!(state.take().is_some());
        assert!(state.is_not_primed());
        assert!(state.take().is_none());
    }

    #[test]
    fn retry_reset_clears_progress_and_bumps_attempt() {
        let mut record = TransferRecord::new(
            "a".to_string(),
            "a.bin".to_string(),
            "https://files.test/a.bin".to_string(),
            1_500,
            HandleState::NotPrimed,
            Instant::now(),
        );
        record.progress = 1.0;
        record.status = TransferStatus::Failed;
        record.error = Some("boom".to_string());

        record.reset_for_retry();

        assert_eq!(record.attempt, 1);
        assert_eq!(record.progress, 0.0);
        assert_eq!(record.status, TransferStatus::Queued);
        assert_eq!(record.error, None);
        assert_eq!(record.snapshot().display_size, "1.50 kB");
    }
}
