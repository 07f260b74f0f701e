//! In-memory transport for unit tests
//!
//! Routes are keyed by path. Every call is answered from a spawned task after
//! the route's delay, and each start, completion and abort is recorded.

use crate::client::FetchClient;
use crate::error::TransportError;
use crate::transport::{BufferedBody, CallHandle, Callback, HttpTransport, Request, Response};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) const FAKE_BASE: &str = "http://fake.test";

#[derive(Clone, Debug)]
pub(crate) enum Reply {
    Body(u16, String),
    Empty(u16),
    Fail(std::io::ErrorKind),
}

impl Reply {
    pub(crate) fn json(value: serde_json::Value) -> Self {
        Reply::Body(200, value.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum CallEvent {
    Started(String),
    Completed(String),
    Aborted(String),
}

#[derive(Default)]
pub(crate) struct FakeTransport {
    routes: Mutex<HashMap<String, (Reply, Duration)>>,
    events: Arc<Mutex<Vec<CallEvent>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl FakeTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn route(self: &Arc<Self>, path: &str, reply: Reply) -> Arc<Self> {
        self.delayed(path, reply, Duration::from_millis(1))
    }

    pub(crate) fn delayed(
        self: &Arc<Self>,
        path: &str,
        reply: Reply,
        delay: Duration,
    ) -> Arc<Self> {
        self.routes
            .lock()
            .expect("routes lock poisoned")
            .insert(path.to_string(), (reply, delay));
        Arc::clone(self)
    }

    pub(crate) fn client(self: &Arc<Self>) -> FetchClient {
        FetchClient::new(self.clone(), FAKE_BASE).expect("fake base URL is valid")
    }

    pub(crate) fn events(&self) -> Vec<CallEvent> {
        self.events.lock().expect("events lock poisoned").clone()
    }

    pub(crate) fn started(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                CallEvent::Started(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn completed(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                CallEvent::Completed(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn aborted(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                CallEvent::Aborted(path) => Some(path),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(events: &Mutex<Vec<CallEvent>>, event: CallEvent) {
        events.lock().expect("events lock poisoned").push(event);
    }
}

impl HttpTransport for FakeTransport {
    fn enqueue(&self, request: Request, callback: Callback) -> CallHandle {
        let path = request
            .url
            .strip_prefix(FAKE_BASE)
            .unwrap_or(&request.url)
            .to_string();
        let (reply, delay) = self
            .routes
            .lock()
            .expect("routes lock poisoned")
            .get(&path)
            .cloned()
            .unwrap_or((Reply::Empty(404), Duration::from_millis(1)));

        Self::record(&self.events, CallEvent::Started(path.clone()));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let settled = Arc::new(AtomicBool::new(false));
        let task = {
            let settled = Arc::clone(&settled);
            let events = Arc::clone(&self.events);
            let in_flight = Arc::clone(&self.in_flight);
            let path = path.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if settled.swap(true, Ordering::SeqCst) {
                    return;
                }
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Self::record(&events, CallEvent::Completed(path));

                let outcome = match reply {
                    Reply::Body(status, body) => {
                        Ok(Response::new(request.url, status, reason(status))
                            .with_body(BufferedBody::new(body)))
                    }
                    Reply::Empty(status) => Ok(Response::new(request.url, status, reason(status))),
                    Reply::Fail(kind) => Err(TransportError::Io(std::io::Error::new(
                        kind,
                        "simulated transport failure",
                    ))),
                };
                callback(outcome);
            })
        };

        let events = Arc::clone(&self.events);
        let in_flight = Arc::clone(&self.in_flight);
        CallHandle::new(move || {
            if !settled.swap(true, Ordering::SeqCst) {
                task.abort();
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Self::record(&events, CallEvent::Aborted(path));
            }
        })
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "",
    }
}
