//! Task state machines and fetch policies.
//!
//! Nothing in this layer performs I/O: tasks describe requests and consume
//! their outcomes, and the scheduler in the effects layer moves data between
//! the two.

mod downgrade;
mod driver;
mod map;
mod retry;
mod stop;
mod task;

pub use downgrade::{Downgrade, Downgradeable};
pub use driver::{Driven, Next, Protocol};
pub use map::Map;
pub use retry::{RetryBudget, Retryable};
pub use stop::StopOnFailure;
pub use task::{BoxTask, FetchTask, Fetched, Leaf, ResponseFilter, Step, fetch};

/// Policy combinators available on every task.
pub trait FetchTaskExt: FetchTask + Sized {
    /// Retry failed requests up to `retries` extra times.
    ///
    /// With `tallied`, the budget covers the whole task instead of each request.
    fn retryable(self, retries: u32, tallied: bool) -> Retryable<Self> {
        Retryable::new(self, retries, tallied)
    }

    /// Fall back to plain HTTP when an HTTPS request fails.
    fn downgradeable(self) -> Downgradeable<Self> {
        Downgradeable::new(self)
    }

    /// Abandon the task on its first failed request.
    fn stopping_on_failure(self) -> StopOnFailure<Self> {
        StopOnFailure::new(self)
    }

    fn map<F, U>(self, f: F) -> Map<Self, F>
    where
        F: FnOnce(Self::Output) -> U,
    {
        Map::new(self, f)
    }

    fn boxed(self) -> BoxTask<Self::Output>
    where
        Self: 'static,
    {
        Box::new(self)
    }
}

impl<T: FetchTask> FetchTaskExt for T {}

#[cfg(test)]
pub(crate) mod testing {
    use url::Url;

    use super::{FetchTask, Fetched, Step};
    use crate::data::{Request, Response};
    use crate::error::HttpError;

    /// Run a task to completion, answering each request with `answer`.
    pub fn drive<T: FetchTask>(
        mut task: T,
        mut answer: impl FnMut(&Request) -> Fetched,
    ) -> (T::Output, Vec<Request>) {
        let mut requests = Vec::new();
        let mut input = None;
        loop {
            match task.step(input.take()).unwrap() {
                Step::Request(request) => {
                    input = Some(answer(&request));
                    requests.push(request);
                }
                Step::Done(output) => return (output, requests),
            }
        }
    }

    pub fn success(status: u16, body: &'static str) -> Fetched {
        Ok(Response::new(Url::parse("http://example.com/").unwrap(), status, body))
    }

    pub fn failure() -> Fetched {
        Err(HttpError::Connect("connection refused".to_string()))
    }
}
