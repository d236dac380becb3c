//! Scripted transport for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

use crate::error::{ErrorKind, Result};
use crate::transport::{Response, Transport};

#[derive(Debug, Clone)]
enum Reply {
    Respond(Response),
    Fail,
}

/// In-memory [`Transport`] answering from scripted replies keyed by URL path.
///
/// Each path holds a queue of replies; the last one repeats forever. Unknown
/// paths answer 404. Every request is counted, and an optional delay makes
/// concurrent requests overlap.
///
/// ```
/// use blockmap_fetch::MockTransport;
///
/// let transport = MockTransport::default()
///     .respond("/all_domains/current/index.json", 200, r#"{"a.json":"label"}"#)
///     .respond("/all_domains/current/index.json", 500, "");
/// assert_eq!(transport.request_count(), 0);
/// ```
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    requests: Mutex<Vec<String>>,
    count: AtomicUsize,
    delay: Duration,
    closed: AtomicBool,
}
impl MockTransport {
    /// Queue a response for `path`.
    pub fn respond(self, path: &str, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.push(path, Reply::Respond(Response { status, body: body.into() }))
    }

    /// Queue a network failure for `path`.
    pub fn fail(self, path: &str) -> Self {
        self.push(path, Reply::Fail)
    }

    /// Delay every reply, so concurrent callers overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn push(self, path: &str, reply: Reply) -> Self {
        self.replies.lock().unwrap_or_else(|p| p.into_inner()).entry(path.to_string()).or_default().push_back(reply);
        self
    }

    /// Number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// Paths requested, in order.
    pub fn requested_paths(&self) -> Vec<String> {
        self.requests.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn next_reply(&self, path: &str) -> Option<Reply> {
        let mut replies = self.replies.lock().unwrap_or_else(|p| p.into_inner());
        let queue = replies.get_mut(path)?;
        match queue.len() {
            0 => None,
            1 => queue.front().cloned(),
            _ => queue.pop_front(),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: &Url) -> Result<Response> {
        if self.is_closed() {
            exn::bail!(ErrorKind::Closed);
        }
        self.count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap_or_else(|p| p.into_inner()).push(url.path().to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.next_reply(url.path()) {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Fail) => exn::bail!(ErrorKind::Network(url.to_string())),
            None => Ok(Response { status: 404, body: Vec::new() }),
        }
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
