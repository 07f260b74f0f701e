//! Typed fetch client: one GET, status check, body presence check, JSON decode

use crate::error::{Error, Result};
use crate::transport::{self, HttpTransport, Request};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Issues typed requests against the posts service
///
/// Holds the shared transport and the service base URL. Cloning is cheap, and
/// every clone talks through the same transport instance.
#[derive(Clone)]
pub struct FetchClient {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
}

impl FetchClient {
    /// Create a client for `base_url` on top of `transport`
    ///
    /// The base URL may carry a path prefix; a trailing slash is ignored.
    pub fn new(transport: Arc<dyn HttpTransport>, base_url: &str) -> Result<Self> {
        let parsed = url::Url::parse(base_url).map_err(|e| {
            Error::config("base_url", format!("invalid base URL '{base_url}': {e}"))
        })?;
        if parsed.cannot_be_a_base() {
            return Err(Error::config(
                "base_url",
                format!("'{base_url}' cannot be used as a base URL"),
            ));
        }

        Ok(Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a service path such as `/api/slow/posts`
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET `path` and decode the JSON body as `T`
    ///
    /// Fails with [`Error::HttpStatus`] for non-2xx responses without touching
    /// the body, with [`Error::EmptyBody`] when a 2xx response has no body,
    /// and with [`Error::Decode`] when the body is not a valid `T`. Decoding
    /// runs on the blocking pool. The response is released on every path.
    pub async fn get_json<T>(&self, path: &str, cancel: &CancellationToken) -> Result<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let url = self.url_for(path);
        let mut response =
            transport::call(self.transport.as_ref(), Request::get(url.clone()), cancel).await?;

        if !response.is_success() {
            tracing::debug!(
                url = %url,
                status = response.status,
                "non-success status, body not decoded"
            );
            return Err(Error::HttpStatus {
                url,
                status: response.status,
                message: response.reason.clone(),
            });
        }

        let Some(mut body) = response.take_body() else {
            return Err(Error::EmptyBody { url });
        };
        drop(response);

        let decode_url = url.clone();
        tokio::task::spawn_blocking(move || {
            let bytes = body.read_bytes().map_err(|e| Error::Transport {
                url: decode_url.clone(),
                source: e.into(),
            })?;
            serde_json::from_slice::<T>(&bytes).map_err(|cause| Error::Decode {
                url: decode_url,
                cause,
            })
        })
        .await?
    }
}

impl std::fmt::Debug for FetchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
