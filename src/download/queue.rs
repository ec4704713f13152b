//! Transfer queue manager - admission control, lifecycle and aggregates
//!
//! All queue state sits behind one mutex. Each operation or transport
//! callback computes its changes under the lock and records the side effects
//! (transport starts and aborts, saves, notifications) in a [`Dispatch`].
//! Notifications are sent under a second lock that is taken before the state
//! lock is released, so they reach the sink in the order the state changed.

use log::{debug, info, warn};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::progress;
use super::record::{HandleState, TransferRecord};
use super::types::{
    DownloadItemAdded, DownloadProgress, DownloadStatusChanged, DownloadTaskDeleted,
    OverallProgressChanged, OverallSizeChanged, QueueEvent, TransferSnapshot, TransferStatus,
};
use crate::config::QueueConfig;
use crate::error::{ConfigError, TransportError};
use crate::events::EventSink;
use crate::ids::IdGenerator;
use crate::persistence::Persistence;
use crate::transport::{TransferOutcome, TransferReporter, Transport, TransportHandle};

/// External collaborators the queue drives
#[derive(Clone)]
pub struct Collaborators {
    pub transport: Arc<dyn Transport>,
    pub persistence: Arc<dyn Persistence>,
    pub ids: Arc<dyn IdGenerator>,
    pub events: Arc<dyn EventSink>,
}

/// Bounded-concurrency download queue.
///
/// Cloning is cheap and every clone drives the same queue. When the last
/// clone is dropped every remaining transport handle is aborted.
#[derive(Clone)]
pub struct TransferQueueManager {
    shared: Arc<QueueShared>,
}

pub(crate) struct QueueShared {
    config: QueueConfig,
    throttle: Duration,
    collaborators: Collaborators,
    state: Mutex<QueueState>,
    emitting: Mutex<()>,
}

#[derive(Debug, Default)]
struct QueueState {
    all: Vec<TransferRecord>,
    pending: VecDeque<String>,
    active: Vec<String>,
}

/// Side effects collected under the lock
#[derive(Default)]
struct Dispatch {
    events: Vec<QueueEvent>,
    aborts: Vec<Arc<dyn TransportHandle>>,
    starts: Vec<Arc<dyn TransportHandle>>,
    saves: Vec<(Vec<u8>, String)>,
}

impl Dispatch {
    fn status(&mut self, record: &TransferRecord) {
        match record.error.as_ref() {
            Some(err) => warn!(
                "download_status: {} -> {} error={}",
                record.id, record.status, err
            ),
            None => info!("download_status: {} -> {}", record.id, record.status),
        }
        self.events
            .push(QueueEvent::StatusChanged(DownloadStatusChanged {
                task_id: record.id.clone(),
                status: record.status,
                error: record.error.clone(),
            }));
    }

    fn progress(&mut self, record: &TransferRecord, now: Instant) {
        let speed = record
            .started_at
            .map(|started| {
                progress::speed(record.loaded_bytes, now.saturating_duration_since(started))
            })
            .unwrap_or(0.0);
        self.events.push(QueueEvent::Progress(DownloadProgress {
            task_id: record.id.clone(),
            percent: progress::percent(record.progress),
            progress: record.progress,
            downloaded_bytes: record.loaded_bytes,
            total_bytes: record.total_size,
            speed,
        }));
    }

    fn overall_progress(&mut self, state: &QueueState) {
        let value = progress::overall_progress(&state.all);
        self.events
            .push(QueueEvent::OverallProgress(OverallProgressChanged {
                percent: progress::percent(value),
                progress: value,
            }));
    }

    fn aggregates(&mut self, state: &QueueState) {
        self.events.push(QueueEvent::OverallSize(OverallSizeChanged {
            total_bytes: progress::overall_size(&state.all),
        }));
        self.overall_progress(state);
    }
}

impl QueueState {
    fn position(&self, id: &str) -> Option<usize> {
        self.all.iter().position(|record| record.id == id)
    }

    fn record(&self, id: &str) -> Option<&TransferRecord> {
        self.all.iter().find(|record| record.id == id)
    }

    fn record_mut(&mut self, id: &str) -> Option<&mut TransferRecord> {
        self.all.iter_mut().find(|record| record.id == id)
    }

    /// The record for `id` if `attempt` is its current, in-flight attempt
    fn in_flight_mut(&mut self, id: &str, attempt: u32) -> Option<&mut TransferRecord> {
        self.record_mut(id)
            .filter(|record| record.attempt == attempt && record.handle.is_in_flight())
    }

    /// Drop `id` from the pending and active queues, keeping the record
    fn detach(&mut self, id: &str) {
        self.pending.retain(|queued| queued != id);
        self.active.retain(|running| running != id);
    }

    /// Promote pending records into free active slots, in arrival order
    fn admit_next(&mut self, limit: usize, now: Instant, dispatch: &mut Dispatch) {
        while self.active.len() < limit {
            let Some(id) = self.pending.pop_front() else {
                break;
            };
            let Some(record) = self.all.iter_mut().find(|record| record.id == id) else {
                warn!("download_admit: {} is queued but unknown, skipping", id);
                continue;
            };
            let Some(handle) = record.handle.launch() else {
                warn!(
                    "download_admit: {} has no primed transport ({:?}), skipping",
                    id, record.handle
                );
                continue;
            };
            record.status = TransferStatus::Downloading;
            record.started_at = Some(now);
            record.loaded_bytes = 0;
            dispatch.status(record);
            self.active.push(id);
            dispatch.starts.push(handle);
        }
    }
}

impl QueueShared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn limit(&self) -> usize {
        self.config.simultaneous_downloads
    }

    /// Prime a transport handle for `attempt` of record `id`. Runs outside the lock.
    fn open(self: &Arc<Self>, id: &str, url: &str, attempt: u32) -> Arc<dyn TransportHandle> {
        let reporter = TransferReporter::new(Arc::downgrade(self), id.to_string(), attempt);
        self.collaborators
            .transport
            .open(&self.config.download_method, url, reporter)
    }

    /// Release `state` and run the effects collected while it was held
    fn finish(&self, state: MutexGuard<'_, QueueState>, dispatch: Dispatch) {
        let emitting = self
            .emitting
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        drop(state);
        for event in dispatch.events {
            self.collaborators.events.emit(event);
        }
        drop(emitting);

        for handle in dispatch.aborts {
            handle.abort();
        }
        for handle in dispatch.starts {
            handle.start();
        }
        for (payload, name) in dispatch.saves {
            self.collaborators.persistence.save(payload, &name);
        }
    }

    pub(crate) fn on_started(&self, id: &str, attempt: u32) {
        let mut state = self.lock();
        let mut dispatch = Dispatch::default();
        let Some(record) = state.in_flight_mut(id, attempt) else {
            debug!("download_start_stale: {} attempt={}", id, attempt);
            return;
        };
        if record.status != TransferStatus::Downloading {
            record.status = TransferStatus::Downloading;
            dispatch.status(record);
        }
        self.finish(state, dispatch);
    }

    pub(crate) fn on_progress(
        &self,
        id: &str,
        attempt: u32,
        loaded: u64,
        total: u64,
        at: Instant,
    ) {
        let mut state = self.lock();
        let mut dispatch = Dispatch::default();
        let Some(record) = state.in_flight_mut(id, attempt) else {
            return;
        };
        if !progress::should_apply(record.last_progress_at, at, self.throttle) {
            return;
        }
        let total = if total > 0 { total } else { record.total_size };
        let Some(fraction) = progress::fraction(loaded, total) else {
            return;
        };
        record.progress = record.progress.max(fraction);
        record.loaded_bytes = loaded;
        record.last_progress_at = at;
        dispatch.progress(record, at);
        dispatch.overall_progress(&state);
        self.finish(state, dispatch);
    }

    pub(crate) fn on_complete(&self, id: &str, attempt: u32, outcome: TransferOutcome) {
        let now = Instant::now();
        let mut state = self.lock();
        let mut dispatch = Dispatch::default();
        let Some(record) = state.in_flight_mut(id, attempt) else {
            // Removed or retried since this attempt started
            debug!("download_complete_stale: {} attempt={}", id, attempt);
            return;
        };
        record.handle = HandleState::NotPrimed;
        record.progress = 1.0;

        match outcome {
            TransferOutcome::Completed(payload) => {
                record.status = TransferStatus::Finished;
                record.loaded_bytes = payload.len() as u64;
                dispatch.saves.push((payload, record.name.clone()));
            }
            TransferOutcome::Failed(err) => {
                record.status = TransferStatus::Failed;
                record.error = Some(err.to_string());
            }
            TransferOutcome::Aborted => {
                // Aborts the queue asked for never reach here: their attempt is stale
                record.status = TransferStatus::Failed;
                record.error = Some(TransportError::Interrupted.to_string());
            }
        }
        dispatch.progress(record, now);
        dispatch.status(record);

        state.detach(id);
        state.admit_next(self.limit(), now, &mut dispatch);
        dispatch.aggregates(&state);
        self.finish(state, dispatch);
    }
}

impl Drop for QueueShared {
    fn drop(&mut self) {
        let state = self
            .state
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for record in state.all.iter_mut() {
            if let Some(handle) = record.handle.take() {
                handle.abort();
            }
        }
    }
}

impl TransferQueueManager {
    pub fn new(config: QueueConfig, collaborators: Collaborators) -> Result<Self, ConfigError> {
        config.validate()?;
        let throttle = config.progress_throttle();
        Ok(Self {
            shared: Arc::new(QueueShared {
                config,
                throttle,
                collaborators,
                state: Mutex::new(QueueState::default()),
                emitting: Mutex::new(()),
            }),
        })
    }

    pub fn config(&self) -> &QueueConfig {
        &self.shared.config
    }

    /// Add a download to the back of the queue and return its id.
    pub fn enqueue(
        &self,
        name: impl Into<String>,
        url: impl Into<String>,
        size_in_bytes: u64,
    ) -> String {
        let shared = &self.shared;
        let name = name.into();
        let url = url.into();
        let id = shared.collaborators.ids.new_id();
        let handle = shared.open(&id, &url, 0);
        let now = Instant::now();

        let mut state = shared.lock();
        let mut dispatch = Dispatch::default();
        info!("download_enqueue: {} name={} size={}", id, name, size_in_bytes);
        dispatch.events.push(QueueEvent::ItemAdded(DownloadItemAdded {
            task_id: id.clone(),
            name: name.clone(),
            total_bytes: size_in_bytes,
        }));
        state.all.push(TransferRecord::new(
            id.clone(),
            name,
            url,
            size_in_bytes,
            HandleState::Primed(handle),
            now,
        ));
        state.pending.push_back(id.clone());
        state.admit_next(shared.limit(), now, &mut dispatch);
        dispatch.aggregates(&state);
        shared.finish(state, dispatch);
        id
    }

    /// Abort every transfer and forget all records.
    pub fn remove_all(&self) {
        let mut state = self.shared.lock();
        let mut dispatch = Dispatch::default();
        let records = std::mem::take(&mut state.all);
        state.pending.clear();
        state.active.clear();
        info!("download_remove_all: count={}", records.len());
        for mut record in records {
            if let Some(handle) = record.handle.take() {
                dispatch.aborts.push(handle);
            }
            dispatch
                .events
                .push(QueueEvent::TaskDeleted(DownloadTaskDeleted { task_id: record.id }));
        }
        dispatch.aggregates(&state);
        self.shared.finish(state, dispatch);
    }

    /// Abort and forget one transfer; its active slot is backfilled at once.
    /// Unknown ids are ignored.
    pub fn remove_item(&self, id: &str) {
        let mut state = self.shared.lock();
        let mut dispatch = Dispatch::default();
        let Some(index) = state.position(id) else {
            debug!("download_remove: {} not found", id);
            return;
        };
        let mut record = state.all.remove(index);
        state.detach(id);
        if let Some(handle) = record.handle.take() {
            dispatch.aborts.push(handle);
        }
        info!("download_remove: {} was {}", id, record.status);
        dispatch
            .events
            .push(QueueEvent::TaskDeleted(DownloadTaskDeleted { task_id: record.id }));
        state.admit_next(self.shared.limit(), Instant::now(), &mut dispatch);
        dispatch.aggregates(&state);
        self.shared.finish(state, dispatch);
    }

    /// Abort any attempt in progress, reset the record and queue it again at
    /// the back. Unknown ids are ignored.
    ///
    /// The freed slot is refilled before the new transport is opened; the
    /// final aggregates are reported once the record is queued again.
    pub fn retry_item(&self, id: &str) {
        let shared = &self.shared;

        let (url, attempt) = {
            let mut state = shared.lock();
            let mut dispatch = Dispatch::default();
            let Some(record) = state.record_mut(id) else {
                debug!("download_retry: {} not found", id);
                return;
            };
            if let Some(handle) = record.handle.take() {
                dispatch.aborts.push(handle);
            }
            record.reset_for_retry();
            dispatch.progress(record, Instant::now());
            dispatch.status(record);
            let reopen = (record.url.clone(), record.attempt);
            state.detach(id);
            state.admit_next(shared.limit(), Instant::now(), &mut dispatch);
            shared.finish(state, dispatch);
            reopen
        };

        let handle = shared.open(id, &url, attempt);

        let mut state = shared.lock();
        let mut dispatch = Dispatch::default();
        let reprimed = match state.record_mut(id) {
            Some(record) if record.attempt == attempt && record.handle.is_not_primed() => {
                record.handle = HandleState::Primed(handle);
                true
            }
            _ => {
                // Removed or retried again while the transport was being opened
                debug!("download_retry_superseded: {} attempt={}", id, attempt);
                dispatch.aborts.push(handle);
                false
            }
        };
        if reprimed {
            state.pending.push_back(id.to_string());
        }
        state.admit_next(shared.limit(), Instant::now(), &mut dispatch);
        dispatch.aggregates(&state);
        shared.finish(state, dispatch);
    }

    /// Fill free slots from the queue, unless something is already running.
    pub fn start_all(&self) {
        let mut state = self.shared.lock();
        let mut dispatch = Dispatch::default();
        if !state.active.is_empty() {
            return;
        }
        state.admit_next(self.shared.limit(), Instant::now(), &mut dispatch);
        self.shared.finish(state, dispatch);
    }

    /// Does nothing: in-flight transfers cannot be suspended and admission
    /// keeps running.
    pub fn pause_all(&self) {
        debug!("download_pause_all: not supported, ignoring");
    }

    pub fn is_active(&self) -> bool {
        !self.shared.lock().active.is_empty()
    }

    pub fn overall_size(&self) -> u64 {
        progress::overall_size(&self.shared.lock().all)
    }

    pub fn overall_progress(&self) -> f64 {
        progress::overall_progress(&self.shared.lock().all)
    }

    /// Snapshots of every record in insertion order
    pub fn items(&self) -> Vec<TransferSnapshot> {
        self.shared
            .lock()
            .all
            .iter()
            .map(TransferRecord::snapshot)
            .collect()
    }

    pub fn item(&self, id: &str) -> Option<TransferSnapshot> {
        self.shared.lock().record(id).map(TransferRecord::snapshot)
    }

    /// Ids waiting for a slot, front first
    pub fn pending(&self) -> Vec<String> {
        self.shared.lock().pending.iter().cloned().collect()
    }

    /// Ids currently transferring, in admission order
    pub fn active(&self) -> Vec<String> {
        self.shared.lock().active.clone()
    }
}
