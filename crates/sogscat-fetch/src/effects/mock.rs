use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use url::Url;

use super::http::HttpClient;
use crate::data::{Request, Response};
use crate::error::HttpError;

#[derive(Debug, Clone)]
enum Scripted {
    Respond { status: u16, body: Bytes },
    Fail(HttpError),
}

#[derive(Debug, Default)]
struct MockState {
    routes: HashMap<String, VecDeque<Scripted>>,
    attempts: Vec<String>,
}

/// Mock HTTP client for testing.
///
/// Outcomes are queued per URL and replayed in order; the last one repeats
/// once the queue is drained. Unscripted URLs fail to connect. Every attempt
/// is recorded, and clones share the same script and record.
#[derive(Debug, Clone, Default)]
pub struct MockClient {
    state: Arc<Mutex<MockState>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a completed response for `url`.
    pub fn respond(&self, url: &str, status: u16, body: impl Into<Bytes>) -> &Self {
        self.push(
            url,
            Scripted::Respond {
                status,
                body: body.into(),
            },
        )
    }

    /// Queue a transport failure for `url`.
    pub fn fail(&self, url: &str, error: HttpError) -> &Self {
        self.push(url, Scripted::Fail(error))
    }

    /// URLs of all attempts so far, in order.
    pub fn attempts(&self) -> Vec<String> {
        self.lock().attempts.clone()
    }

    /// Number of attempts made against `url`.
    pub fn attempts_for(&self, url: &str) -> usize {
        let key = normalize(url);
        self.lock().attempts.iter().filter(|a| **a == key).count()
    }

    fn push(&self, url: &str, scripted: Scripted) -> &Self {
        self.lock()
            .routes
            .entry(normalize(url))
            .or_default()
            .push_back(scripted);
        self
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_outcome(&self, url: &Url) -> std::result::Result<Response, HttpError> {
        let mut state = self.lock();
        state.attempts.push(url.to_string());
        let scripted = match state.routes.get_mut(url.as_str()) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        match scripted {
            Some(Scripted::Respond { status, body }) => Ok(Response::new(url.clone(), status, body)),
            Some(Scripted::Fail(error)) => Err(error),
            None => Err(HttpError::Connect(format!("no route to {url}"))),
        }
    }
}

impl HttpClient for MockClient {
    fn execute(
        &self,
        request: Request,
    ) -> impl Future<Output = std::result::Result<Response, HttpError>> + Send {
        let outcome = self.next_outcome(request.url());
        async move { outcome }
    }
}

fn normalize(url: &str) -> String {
    Url::parse(url).map_or_else(|_| url.to_string(), |u| u.to_string())
}
