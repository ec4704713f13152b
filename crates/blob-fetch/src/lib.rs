//! Cancellable streaming HTTP fetch
//!
//! Fetches a whole response body into memory while reporting progress for
//! every received chunk. The request can be cancelled at any point through a
//! [`CancellationToken`]; cancellation wins over any pending network read.

use futures_util::StreamExt;
use log::debug;
use reqwest::{Client, Method};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Upper bound for the body buffer reserved up front from Content-Length (8 MB)
const MAX_PREALLOC: u64 = 8 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("fetch cancelled")]
    Cancelled,

    #[error("server responded with status {0}")]
    Status(u16),

    #[error("invalid request method: {0}")]
    InvalidMethod(String),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// A request that has been prepared but not sent yet
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: String,
}

impl FetchRequest {
    pub fn new(method: &str, url: impl Into<String>) -> Result<Self, FetchError> {
        let method = Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
            .map_err(|_| FetchError::InvalidMethod(method.to_string()))?;
        Ok(Self {
            method,
            url: url.into(),
        })
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
        }
    }
}

/// Progress snapshot passed to the progress callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub loaded: u64,
    /// Content-Length of the response, when the server sent one
    pub total: Option<u64>,
}

/// A successfully fetched response
#[derive(Debug, Clone)]
pub struct Fetched {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Send `request` and collect its body, calling `on_progress` after each chunk.
///
/// Non-2xx responses are returned as [`FetchError::Status`] without reading
/// the body. If `cancel` fires before the body is complete the partial data is
/// dropped and [`FetchError::Cancelled`] is returned.
pub async fn fetch<F>(
    client: &Client,
    request: &FetchRequest,
    cancel: &CancellationToken,
    mut on_progress: F,
) -> Result<Fetched, FetchError>
where
    F: FnMut(Progress),
{
    if cancel.is_cancelled() {
        return Err(FetchError::Cancelled);
    }

    let send = client.request(request.method.clone(), &request.url).send();
    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(FetchError::Cancelled),
        response = send => response?,
    };

    let status = response.status();
    if !status.is_success() {
        debug!("fetch_status: {} {} -> {}", request.method, request.url, status);
        return Err(FetchError::Status(status.as_u16()));
    }

    let total = response.content_length();
    let mut body = Vec::with_capacity(total.unwrap_or(0).min(MAX_PREALLOC) as usize);
    let mut stream = response.bytes_stream();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            next = stream.next() => next,
        };
        let Some(chunk) = next else {
            break;
        };
        let chunk = chunk?;
        body.extend_from_slice(&chunk);
        on_progress(Progress {
            loaded: body.len() as u64,
            total,
        });
    }

    debug!(
        "fetch_finish: {} {} bytes={}",
        request.method,
        request.url,
        body.len()
    );
    Ok(Fetched {
        status: status.as_u16(),
        body,
    })
}
