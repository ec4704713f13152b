//! HTTP transport - streams each transfer into memory on the tokio runtime

use blob_fetch::{fetch, FetchError, FetchRequest};
use log::{debug, warn};
use reqwest::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;
use crate::transport::{TransferOutcome, TransferReporter, Transport, TransportHandle};

/// [`Transport`] backed by `reqwest`
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    runtime: Handle,
}

impl HttpTransport {
    pub fn new(client: Client, runtime: Handle) -> Self {
        Self { client, runtime }
    }

    pub fn with_runtime(runtime: Handle) -> Self {
        Self::new(Client::new(), runtime)
    }
}

impl Transport for HttpTransport {
    fn open(
        &self,
        method: &str,
        location: &str,
        reporter: TransferReporter,
    ) -> Arc<dyn TransportHandle> {
        let request = FetchRequest::new(method, location).map_err(|e| {
            warn!("download_open: {} rejected: {}", reporter.id(), e);
            TransportError::from(e)
        });
        Arc::new(HttpHandle {
            client: self.client.clone(),
            runtime: self.runtime.clone(),
            request,
            reporter,
            cancel: CancellationToken::new(),
            started: AtomicBool::new(false),
        })
    }
}

struct HttpHandle {
    client: Client,
    runtime: Handle,
    request: Result<FetchRequest, TransportError>,
    reporter: TransferReporter,
    cancel: CancellationToken,
    started: AtomicBool,
}

impl TransportHandle for HttpHandle {
    fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let client = self.client.clone();
        let request = self.request.clone();
        let reporter = self.reporter.clone();
        let cancel = self.cancel.clone();

        self.runtime.spawn(async move {
            let request = match request {
                Ok(request) => request,
                Err(e) => {
                    reporter.complete(TransferOutcome::Failed(e));
                    return;
                }
            };
            if cancel.is_cancelled() {
                reporter.complete(TransferOutcome::Aborted);
                return;
            }

            reporter.started();
            let result = fetch(&client, &request, &cancel, |p| {
                reporter.progress(p.loaded, p.total.unwrap_or(0))
            })
            .await;

            let outcome = match result {
                Ok(fetched) => TransferOutcome::Completed(fetched.body),
                Err(FetchError::Cancelled) => {
                    debug!("download_aborted: {}", reporter.id());
                    TransferOutcome::Aborted
                }
                Err(e) => TransferOutcome::Failed(e.into()),
            };
            reporter.complete(outcome);
        });
    }

    fn abort(&self) {
        self.cancel.cancel();
    }
}
