//! In-memory collaborators for queue tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::queue::{Collaborators, TransferQueueManager};
use super::types::{OverallProgressChanged, QueueEvent, TransferStatus};
use crate::config::QueueConfig;
use crate::events::EventSink;
use crate::persistence::Persistence;
use crate::transport::{TransferReporter, Transport, TransportHandle};

pub(crate) struct MockHandle {
    pub method: String,
    pub location: String,
    pub reporter: TransferReporter,
    started: AtomicBool,
    aborted: AtomicBool,
}

impl MockHandle {
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}

impl TransportHandle for MockHandle {
    fn start(&self) {
        if !self.is_aborted() {
            self.started.store(true, Ordering::SeqCst);
        }
    }

    fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }
}

type OpenHook = Box<dyn FnOnce() + Send>;

/// Records every opened handle so tests can drive its callbacks
#[derive(Default)]
pub(crate) struct MockTransport {
    opened: Mutex<Vec<Arc<MockHandle>>>,
    on_open: Mutex<Option<(String, OpenHook)>>,
}

impl MockTransport {
    /// Run `hook` once, the next time a transport is opened for `id`
    pub fn on_next_open(&self, id: &str, hook: impl FnOnce() + Send + 'static) {
        *self.on_open.lock().unwrap() = Some((id.to_string(), Box::new(hook)));
    }

    /// Every handle opened for `id`, oldest first
    pub fn handles(&self, id: &str) -> Vec<Arc<MockHandle>> {
        self.opened
            .lock()
            .unwrap()
            .iter()
            .filter(|handle| handle.reporter.id() == id)
            .cloned()
            .collect()
    }

    /// Latest handle opened for transfer `id`
    pub fn handle(&self, id: &str) -> Arc<MockHandle> {
        self.opened
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|handle| handle.reporter.id() == id)
            .cloned()
            .unwrap_or_else(|| panic!("no transport opened for {}", id))
    }

    pub fn opened_for(&self, id: &str) -> usize {
        self.handles(id).len()
    }
}

impl Transport for MockTransport {
    fn open(
        &self,
        method: &str,
        location: &str,
        reporter: TransferReporter,
    ) -> Arc<dyn TransportHandle> {
        let handle = Arc::new(MockHandle {
            method: method.to_string(),
            location: location.to_string(),
            reporter,
            started: AtomicBool::new(false),
            aborted: AtomicBool::new(false),
        });
        self.opened.lock().unwrap().push(Arc::clone(&handle));

        let hook = {
            let mut on_open = self.on_open.lock().unwrap();
            match on_open.take() {
                Some((hook_id, hook)) if hook_id == handle.reporter.id() => Some(hook),
                other => {
                    *on_open = other;
                    None
                }
            }
        };
        if let Some(hook) = hook {
            hook();
        }
        handle
    }
}

/// Captures emitted events and saved payloads
#[derive(Default)]
pub(crate) struct Recorder {
    events: Mutex<Vec<QueueEvent>>,
    saves: Mutex<Vec<(Vec<u8>, String)>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<QueueEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn saves(&self) -> Vec<(Vec<u8>, String)> {
        self.saves.lock().unwrap().clone()
    }

    pub fn statuses_for(&self, id: &str) -> Vec<TransferStatus> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                QueueEvent::StatusChanged(changed) if changed.task_id == id => Some(changed.status),
                _ => None,
            })
            .collect()
    }

    pub fn progress_events_for(&self, id: &str) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, QueueEvent::Progress(p) if p.task_id == id))
            .count()
    }

    pub fn last_overall_progress(&self) -> Option<OverallProgressChanged> {
        self.events().into_iter().rev().find_map(|event| match event {
            QueueEvent::OverallProgress(overall) => Some(overall),
            _ => None,
        })
    }
}

impl EventSink for Recorder {
    fn emit(&self, event: QueueEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl Persistence for Recorder {
    fn save(&self, payload: Vec<u8>, suggested_name: &str) {
        self.saves
            .lock()
            .unwrap()
            .push((payload, suggested_name.to_string()));
    }
}

pub(crate) struct Harness {
    pub manager: TransferQueueManager,
    pub transport: Arc<MockTransport>,
    pub recorder: Arc<Recorder>,
}

pub(crate) fn harness(limit: usize) -> Harness {
    harness_with_sink(limit, |recorder| recorder as Arc<dyn EventSink>)
}

/// Like [`harness`], with the event sink built around the recorder
pub(crate) fn harness_with_sink(
    limit: usize,
    sink: impl FnOnce(Arc<Recorder>) -> Arc<dyn EventSink>,
) -> Harness {
    let transport = Arc::new(MockTransport::default());
    let recorder = Arc::new(Recorder::default());
    let counter = Arc::new(AtomicUsize::new(0));
    let ids = move || format!("t{}", counter.fetch_add(1, Ordering::SeqCst) + 1);

    let config = QueueConfig {
        simultaneous_downloads: limit,
        ..QueueConfig::default()
    };
    let manager = TransferQueueManager::new(
        config,
        Collaborators {
            transport: transport.clone(),
            persistence: recorder.clone(),
            ids: Arc::new(ids),
            events: sink(recorder.clone()),
        },
    )
    .unwrap();

    Harness {
        manager,
        transport,
        recorder,
    }
}
