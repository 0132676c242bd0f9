//! Falling back from HTTPS to plain HTTP.

use tracing::info;

use super::task::{FetchTask, Fetched, ResponseFilter, Step};
use crate::data::Request;
use crate::error::{FetchError, Result};

/// Output of a [`Downgradeable`] task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downgrade<T> {
    pub value: T,
    /// Whether any request had to fall back to plain HTTP.
    pub downgraded: bool,
}

enum DowngradeState {
    Fresh,
    Secure(Request),
    Plain,
    Finished,
}

/// Retries failed HTTPS requests once over plain HTTP.
///
/// Only the outcome of the last attempt of each request reaches the wrapped
/// task. Requests that are already plain HTTP pass through untouched.
pub struct Downgradeable<T> {
    inner: T,
    filter: ResponseFilter,
    state: DowngradeState,
    downgraded: bool,
}

impl<T: FetchTask> Downgradeable<T> {
    pub fn new(inner: T) -> Self {
        let filter = inner.filter().clone();
        Self {
            inner,
            filter,
            state: DowngradeState::Fresh,
            downgraded: false,
        }
    }

    fn forward(&mut self, input: Option<Fetched>) -> Result<Step<Downgrade<T::Output>>> {
        match self.inner.step(input)? {
            Step::Request(request) => {
                self.state = if request.is_secure() {
                    DowngradeState::Secure(request.clone())
                } else {
                    DowngradeState::Plain
                };
                Ok(Step::Request(request))
            }
            Step::Done(value) => Ok(Step::Done(Downgrade {
                value,
                downgraded: self.downgraded,
            })),
        }
    }
}

impl<T: FetchTask> FetchTask for Downgradeable<T> {
    type Output = Downgrade<T::Output>;

    fn step(&mut self, previous: Option<Fetched>) -> Result<Step<Self::Output>> {
        match std::mem::replace(&mut self.state, DowngradeState::Finished) {
            DowngradeState::Finished => Err(FetchError::TaskFinished),
            DowngradeState::Fresh => match previous {
                None => self.forward(None),
                Some(_) => Err(FetchError::UnexpectedResult),
            },
            DowngradeState::Secure(request) => {
                let fetched = previous.ok_or(FetchError::MissingResult)?;
                if !self.filter.classify(&fetched) {
                    if let Some(plain) = request.downgraded() {
                        info!("Downgrading {} to HTTP", request.url());
                        self.downgraded = true;
                        self.state = DowngradeState::Plain;
                        return Ok(Step::Request(plain));
                    }
                }
                self.forward(Some(fetched))
            }
            DowngradeState::Plain => {
                let fetched = previous.ok_or(FetchError::MissingResult)?;
                self.forward(Some(fetched))
            }
        }
    }

    fn filter(&self) -> &ResponseFilter {
        &self.filter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::{drive, failure, success};
    use crate::core::{FetchTaskExt, fetch};
    use crate::data::RequestOptions;

    #[test]
    fn test_secure_success_is_not_downgraded() {
        let task = fetch("https://example.com/rooms", RequestOptions::default())
            .unwrap()
            .downgradeable();
        let (output, requests) = drive(task, |_| success(200, "[]"));
        assert!(output.value.is_some());
        assert!(!output.downgraded);
        assert_eq!(requests.len(), 1);
    }

    #[test]
    fn test_secure_failure_falls_back_to_http() {
        let task = fetch("https://example.com/rooms", RequestOptions::default())
            .unwrap()
            .downgradeable();
        let (output, requests) = drive(task, |request| {
            if request.is_secure() { failure() } else { success(200, "[]") }
        });
        assert!(output.value.is_some());
        assert!(output.downgraded);
        let urls: Vec<_> = requests.iter().map(|r| r.url().as_str()).collect();
        assert_eq!(urls, ["https://example.com/rooms", "http://example.com/rooms"]);
    }

    #[test]
    fn test_failed_fallback_reports_failure() {
        let task = fetch("https://example.com/rooms", RequestOptions::default())
            .unwrap()
            .downgradeable();
        let (output, requests) = drive(task, |_| failure());
        assert!(output.value.is_none());
        assert!(output.downgraded);
        assert_eq!(requests.len(), 2);
    }

    #[test]
    fn test_plain_request_is_not_repeated() {
        let task = fetch("http://example.com/rooms", RequestOptions::default())
            .unwrap()
            .downgradeable();
        let (output, requests) = drive(task, |_| failure());
        assert!(output.value.is_none());
        assert!(!output.downgraded);
        assert_eq!(requests.len(), 1);
    }

    #[test]
    fn test_each_retry_attempt_may_downgrade() {
        let mut plain_failures = 1;
        let task = fetch("https://example.com/rooms", RequestOptions::default())
            .unwrap()
            .retryable(2, true)
            .downgradeable();
        let (output, requests) = drive(task, |request| {
            if request.is_secure() {
                failure()
            } else if plain_failures > 0 {
                plain_failures -= 1;
                failure()
            } else {
                success(200, "[]")
            }
        });
        assert!(output.downgraded);
        assert!(output.value.is_some());
        let schemes: Vec<_> = requests.iter().map(|r| r.url().scheme()).collect();
        assert_eq!(schemes, ["https", "http", "https", "http"]);
    }
}
