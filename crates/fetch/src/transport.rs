//! The HTTP seam.

use async_trait::async_trait;
use exn::ResultExt;
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

use crate::error::{ErrorKind, Result};

/// A complete HTTP response: status and body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}
impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues GET requests on behalf of the caching client.
///
/// Only transport failures are errors; any status code is a valid
/// [`Response`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &Url) -> Result<Response>;

    /// Releases pooled connections. Later requests fail with
    /// [`Closed`](ErrorKind::Closed).
    async fn close(&self) {}
}

/// [`Transport`] over a pooled `reqwest` client.
pub struct HttpTransport {
    client: Mutex<Option<reqwest::Client>>,
}
impl HttpTransport {
    /// Builds a client whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .or_raise(|| ErrorKind::Usage("could not build HTTP client".to_string()))?;
        Ok(Self { client: Mutex::new(Some(client)) })
    }

    fn client(&self) -> Result<reqwest::Client> {
        // A poisoned lock only means another request panicked; the client is
        // still usable.
        let guard = self.client.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.clone().ok_or_else(|| exn::Exn::from(ErrorKind::Closed))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &Url) -> Result<Response> {
        let client = self.client()?;
        let response = client.get(url.clone()).send().await.or_raise(|| ErrorKind::Network(url.to_string()))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.or_raise(|| ErrorKind::Network(url.to_string()))?;
        tracing::debug!(url = %url, status, bytes = body.len(), "fetched");
        Ok(Response { status, body: body.to_vec() })
    }

    async fn close(&self) {
        let client = self.client.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).take();
        if client.is_some() {
            tracing::debug!("closed HTTP connection pool");
        }
    }
}
