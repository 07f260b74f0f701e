//! Error types for post-aggregator
//!
//! Every layer of the fetch pipeline reports failures through [`Error`]:
//! - transport failures before a response exists ([`Error::Transport`])
//! - HTTP-level failures ([`Error::HttpStatus`], [`Error::EmptyBody`])
//! - payload failures ([`Error::Decode`])
//! - scheduling outcomes ([`Error::Cancelled`], [`Error::Task`])
//!
//! None of these are recovered locally. They travel up unchanged to the
//! aggregation scheduler, which cancels sibling work and surfaces the first one.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for post-aggregator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for post-aggregator
#[derive(Debug, Error)]
pub enum Error {
    /// Connection or I/O failure before a response was obtained
    #[error("transport error for {url}: {source}")]
    Transport {
        /// The URL being requested
        url: String,
        /// Underlying transport failure
        source: TransportError,
    },

    /// A response was obtained but its status indicates failure
    #[error("HTTP {status} {message} for {url}")]
    HttpStatus {
        /// The URL being requested
        url: String,
        /// HTTP status code
        status: u16,
        /// Reason phrase reported with the status
        message: String,
    },

    /// Success status, but the response carried no body
    #[error("response body is empty for {url}")]
    EmptyBody {
        /// The URL being requested
        url: String,
    },

    /// The body could not be decoded into the expected type
    #[error("failed to decode response from {url}: {cause}")]
    Decode {
        /// The URL being requested
        url: String,
        /// The JSON error
        #[source]
        cause: serde_json::Error,
    },

    /// The unit of work observed a cancellation request
    #[error("operation cancelled")]
    Cancelled,

    /// The transport dropped its completion callback without invoking it
    #[error("transport dropped the completion callback for {url}")]
    CallbackDropped {
        /// The URL being requested
        url: String,
    },

    /// A spawned task panicked or was aborted externally
    #[error("task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "base_url")
        key: Option<String>,
    },

    /// Serializing output failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The whole aggregation did not finish within the configured deadline
    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
}

/// Failures raised by an [`HttpTransport`](crate::transport::HttpTransport)
#[derive(Debug, Error)]
pub enum TransportError {
    /// reqwest failed to connect, send, or read
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Generic I/O failure (body reads, custom transports)
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// True if the failure was a timeout
    pub fn is_timeout(&self) -> bool {
        match self {
            TransportError::Http(e) => e.is_timeout(),
            TransportError::Io(e) => e.kind() == std::io::ErrorKind::TimedOut,
        }
    }

    /// True if the failure happened while establishing the connection
    pub fn is_connect(&self) -> bool {
        match self {
            TransportError::Http(e) => e.is_connect(),
            TransportError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::NotConnected
            ),
        }
    }
}

impl Error {
    /// Create a configuration error for a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Machine-readable error code
    pub fn error_code(&self) -> &str {
        match self {
            Error::Transport { .. } => "transport_error",
            Error::HttpStatus { .. } => "http_status_error",
            Error::EmptyBody { .. } => "empty_body",
            Error::Decode { .. } => "decode_error",
            Error::Cancelled => "cancelled",
            Error::CallbackDropped { .. } => "callback_dropped",
            Error::Task(_) => "task_failed",
            Error::Config { .. } => "config_error",
            Error::Serialization(_) => "serialization_error",
            Error::DeadlineExceeded(_) => "deadline_exceeded",
        }
    }

    /// True for the error a cancelled sibling reports, as opposed to a root cause
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}
