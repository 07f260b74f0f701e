//! HTTP transport seam and the callback-to-future bridge
//!
//! Transports are push-style: [`HttpTransport::enqueue`] starts a request and
//! later invokes a one-shot [`Callback`] with the outcome. [`call`] turns that
//! into a pull-style future that suspends the calling task (without blocking
//! its worker thread) until the callback fires or the task is cancelled.

use crate::config::Config;
use crate::error::{Error, Result, TransportError};
use std::time::Instant;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// A fully constructed request description
///
/// Every request the aggregator issues is a plain GET.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    /// Absolute target URL
    pub url: String,
}

impl Request {
    /// Describe a GET request for `url`
    pub fn get(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Readable response payload
///
/// Reading may block, so callers run it on a blocking-capable thread.
/// Dropping the body releases whatever resources back it.
pub trait ResponseBody: Send {
    /// Read the whole body
    fn read_bytes(&mut self) -> std::io::Result<Vec<u8>>;
}

/// A body that has already been buffered in memory
#[derive(Clone, Debug, Default)]
pub struct BufferedBody {
    bytes: Vec<u8>,
}

impl BufferedBody {
    /// Wrap buffered bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }
}

impl ResponseBody for BufferedBody {
    fn read_bytes(&mut self) -> std::io::Result<Vec<u8>> {
        Ok(std::mem::take(&mut self.bytes))
    }
}

/// Response handle delivered by a transport
pub struct Response {
    /// URL the response belongs to
    pub url: String,
    /// HTTP status code
    pub status: u16,
    /// Reason phrase ("Not Found", ...)
    pub reason: String,
    body: Option<Box<dyn ResponseBody>>,
}

impl Response {
    /// Create a response without a body
    pub fn new(url: impl Into<String>, status: u16, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status,
            reason: reason.into(),
            body: None,
        }
    }

    /// Attach a body
    pub fn with_body(mut self, body: impl ResponseBody + 'static) -> Self {
        self.body = Some(Box::new(body));
        self
    }

    /// True for 2xx statuses
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// True if a body is attached
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Take ownership of the body, leaving the response without one
    pub fn take_body(&mut self) -> Option<Box<dyn ResponseBody>> {
        self.body.take()
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("url", &self.url)
            .field("status", &self.status)
            .field("reason", &self.reason)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// Completion callback handed to a transport
///
/// `FnOnce` makes a second invocation unrepresentable.
pub type Callback = Box<dyn FnOnce(std::result::Result<Response, TransportError>) + Send>;

/// Handle to an enqueued call
///
/// Dropping a handle aborts the call unless it was marked complete first.
pub struct CallHandle {
    abort: Option<Box<dyn FnOnce() + Send>>,
}

impl CallHandle {
    /// Handle whose cancellation runs `abort`
    pub fn new(abort: impl FnOnce() + Send + 'static) -> Self {
        Self {
            abort: Some(Box::new(abort)),
        }
    }

    /// Handle for a transport that cannot abort in-flight calls
    pub fn detached() -> Self {
        Self { abort: None }
    }

    /// Handle backed by the tokio task driving the call
    pub fn from_abort_handle(handle: tokio::task::AbortHandle) -> Self {
        Self::new(move || handle.abort())
    }

    /// Abort the call
    pub fn cancel(mut self) {
        if let Some(abort) = self.abort.take() {
            abort();
        }
    }

    /// The call finished; release the handle without aborting anything
    pub fn complete(mut self) {
        self.abort = None;
    }
}

impl Drop for CallHandle {
    fn drop(&mut self) {
        if let Some(abort) = self.abort.take() {
            abort();
        }
    }
}

/// Callback-based HTTP transport
///
/// Implementations must invoke the callback exactly once per call and must be
/// safe to use from many tasks at the same time.
pub trait HttpTransport: Send + Sync {
    /// Start `request` and arrange for `callback` to receive its outcome
    fn enqueue(&self, request: Request, callback: Callback) -> CallHandle;
}

/// Issue one call through `transport` and wait for its outcome
///
/// Returns [`Error::Cancelled`] (after aborting the call) if `cancel` fires
/// first. A transport that drops the callback without calling it yields
/// [`Error::CallbackDropped`]. No retries.
pub async fn call(
    transport: &dyn HttpTransport,
    request: Request,
    cancel: &CancellationToken,
) -> Result<Response> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    let url = request.url.clone();
    let (tx, rx) = oneshot::channel();
    let late_url = url.clone();
    let handle = transport.enqueue(
        request,
        Box::new(move |outcome| {
            if tx.send(outcome).is_err() {
                tracing::trace!(
                    url = %late_url,
                    "call completed after its caller left, result discarded"
                );
            }
        }),
    );

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::debug!(url = %url, "call cancelled while in flight");
            handle.cancel();
            Err(Error::Cancelled)
        }
        outcome = rx => {
            handle.complete();
            match outcome {
                Ok(Ok(response)) => Ok(response),
                Ok(Err(source)) => Err(Error::Transport { url, source }),
                Err(_) => {
                    tracing::error!(
                        url = %url,
                        "transport dropped the completion callback without invoking it"
                    );
                    Err(Error::CallbackDropped { url })
                }
            }
        }
    }
}

/// Production transport backed by a shared [`reqwest::Client`]
///
/// The client's connection pool is shared by every call; cloning the
/// transport is cheap. Calls run on spawned tokio tasks, so `enqueue` must be
/// invoked from within a tokio runtime.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    log_bodies: bool,
}

impl ReqwestTransport {
    /// Build a transport from the timeouts and user agent in `config`
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone());
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(|e| Error::Config {
            message: format!("failed to create HTTP client: {e}"),
            key: None,
        })?;

        Ok(Self {
            client,
            log_bodies: config.log_bodies,
        })
    }

}

impl HttpTransport for ReqwestTransport {
    fn enqueue(&self, request: Request, callback: Callback) -> CallHandle {
        let client = self.client.clone();
        let log_bodies = self.log_bodies;

        let task = tokio::spawn(async move {
            let outcome = execute(&client, &request.url, log_bodies).await;
            callback(outcome);
        });

        CallHandle::from_abort_handle(task.abort_handle())
    }
}

async fn execute(
    client: &reqwest::Client,
    url: &str,
    log_bodies: bool,
) -> std::result::Result<Response, TransportError> {
    let start = Instant::now();

    let response = client.get(url).send().await.map_err(|e| {
        tracing::debug!(
            url = %url,
            timeout = e.is_timeout(),
            connect = e.is_connect(),
            error = %e,
            "request failed"
        );
        e
    })?;

    let status = response.status();
    let bytes = response.bytes().await?;

    tracing::debug!(
        url = %url,
        status = status.as_u16(),
        bytes = bytes.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "response received"
    );
    if log_bodies {
        tracing::trace!(url = %url, body = %String::from_utf8_lossy(&bytes), "response body");
    }

    let reason = status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
    let response = Response::new(url, status.as_u16(), reason);
    if bytes.is_empty() {
        Ok(response)
    } else {
        Ok(response.with_body(BufferedBody::new(bytes.to_vec())))
    }
}
