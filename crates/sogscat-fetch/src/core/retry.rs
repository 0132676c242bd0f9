//! Retrying failed requests.

use tracing::debug;

use super::task::{FetchTask, Fetched, ResponseFilter, Step};
use crate::data::Request;
use crate::error::{FetchError, Result};

/// Retry allowance of a [`Retryable`] task.
///
/// A tallied budget is shared by every request the wrapped task issues; an
/// untallied one is refilled whenever the task issues a new request.
///
/// Every retry is charged when it is issued, so a request that succeeds on
/// its third attempt still costs two retries of a tallied budget. Retries
/// are not refunded on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    retries: u32,
    remaining: u32,
    tallied: bool,
}

impl RetryBudget {
    pub fn new(retries: u32, tallied: bool) -> Self {
        Self {
            retries,
            remaining: retries,
            tallied,
        }
    }

    /// Account for the wrapped task issuing a new request.
    pub fn begin_request(&mut self) {
        if !self.tallied {
            self.remaining = self.retries;
        }
    }

    /// Spend one retry. Returns `false` once the budget is exhausted.
    pub fn take(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}

enum RetryState {
    Fresh,
    InFlight { request: Request, attempt: u32 },
    Finished,
}

/// Re-issues failed requests of the wrapped task.
///
/// Each request is always attempted at least once. Failed attempts are
/// swallowed while the [`RetryBudget`] lasts; the wrapped task only sees the
/// final outcome of each of its requests.
pub struct Retryable<T> {
    inner: T,
    budget: RetryBudget,
    filter: ResponseFilter,
    state: RetryState,
}

impl<T: FetchTask> Retryable<T> {
    pub fn new(inner: T, retries: u32, tallied: bool) -> Self {
        let filter = inner.filter().clone();
        Self {
            inner,
            budget: RetryBudget::new(retries, tallied),
            filter,
            state: RetryState::Fresh,
        }
    }

    pub fn budget(&self) -> &RetryBudget {
        &self.budget
    }

    fn forward(&mut self, input: Option<Fetched>) -> Result<Step<T::Output>> {
        match self.inner.step(input)? {
            Step::Request(request) => {
                self.budget.begin_request();
                self.state = RetryState::InFlight {
                    request: request.clone(),
                    attempt: 1,
                };
                Ok(Step::Request(request))
            }
            Step::Done(output) => Ok(Step::Done(output)),
        }
    }
}

impl<T: FetchTask> FetchTask for Retryable<T> {
    type Output = T::Output;

    fn step(&mut self, previous: Option<Fetched>) -> Result<Step<Self::Output>> {
        match std::mem::replace(&mut self.state, RetryState::Finished) {
            RetryState::Finished => Err(FetchError::TaskFinished),
            RetryState::Fresh => match previous {
                None => self.forward(None),
                Some(_) => Err(FetchError::UnexpectedResult),
            },
            RetryState::InFlight { request, attempt } => {
                let fetched = previous.ok_or(FetchError::MissingResult)?;
                if self.filter.classify(&fetched) {
                    return self.forward(Some(fetched));
                }
                match &fetched {
                    Ok(response) => debug!(url = %request.url(), attempt, status = response.status(), "request rejected"),
                    Err(e) => debug!(url = %request.url(), attempt, error = %e, "request failed"),
                }
                if self.budget.take() {
                    debug!(url = %request.url(), remaining = self.budget.remaining(), "retrying");
                    let retry = request.clone();
                    self.state = RetryState::InFlight {
                        request,
                        attempt: attempt + 1,
                    };
                    return Ok(Step::Request(retry));
                }
                self.forward(Some(fetched))
            }
        }
    }

    fn filter(&self) -> &ResponseFilter {
        &self.filter
    }
}
