use std::fmt;
use std::sync::Arc;

use crate::data::{Request, RequestOptions, Response};
use crate::error::{FetchError, HttpError, Result};

/// Raw outcome of one request as delivered by the scheduler.
pub type Fetched = std::result::Result<Response, HttpError>;

/// What a task wants next.
#[derive(Debug)]
pub enum Step<T> {
    /// Perform this request and resume the task with its outcome.
    Request(Request),
    /// The task is finished.
    Done(T),
}

/// Decides whether a completed response counts as a success.
#[derive(Clone)]
pub struct ResponseFilter(Arc<dyn Fn(&Response) -> bool + Send + Sync>);

impl ResponseFilter {
    pub fn new(accepts: impl Fn(&Response) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(accepts))
    }

    /// Accept 2xx statuses.
    pub fn success_status() -> Self {
        Self::new(Response::is_success)
    }

    /// Accept every completed response, whatever its status.
    pub fn any_status() -> Self {
        Self::new(|_| true)
    }

    pub fn accepts(&self, response: &Response) -> bool {
        (self.0)(response)
    }

    /// Transport failures never pass.
    pub fn classify(&self, fetched: &Fetched) -> bool {
        matches!(fetched, Ok(response) if self.accepts(response))
    }
}

impl Default for ResponseFilter {
    fn default() -> Self {
        Self::success_status()
    }
}

impl fmt::Debug for ResponseFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResponseFilter { .. }")
    }
}

/// A resumable computation that issues requests one at a time.
///
/// The first call to [`step`](FetchTask::step) passes `None`. Every
/// [`Step::Request`] must be answered by stepping again with `Some` outcome of
/// that very request; the task does nothing in between. A task that returned
/// [`Step::Done`] must not be stepped again.
pub trait FetchTask {
    type Output;

    fn step(&mut self, previous: Option<Fetched>) -> Result<Step<Self::Output>>;

    /// Filter wrappers use to classify outcomes of this task's requests.
    fn filter(&self) -> &ResponseFilter;
}

/// Type-erased task, as accepted by the scheduler.
pub type BoxTask<T> = Box<dyn FetchTask<Output = T>>;

impl<T: FetchTask + ?Sized> FetchTask for Box<T> {
    type Output = T::Output;

    fn step(&mut self, previous: Option<Fetched>) -> Result<Step<Self::Output>> {
        (**self).step(previous)
    }

    fn filter(&self) -> &ResponseFilter {
        (**self).filter()
    }
}

enum LeafState {
    Fresh(Request),
    Waiting,
    Finished,
}

/// Task issuing exactly one request.
///
/// Finishes with the response when its filter accepts the outcome and with
/// `None` otherwise.
pub struct Leaf {
    state: LeafState,
    filter: ResponseFilter,
}

impl Leaf {
    pub fn new(request: Request) -> Self {
        Self {
            state: LeafState::Fresh(request),
            filter: ResponseFilter::default(),
        }
    }

    /// Replace the default 2xx filter.
    #[must_use]
    pub fn with_filter(mut self, filter: ResponseFilter) -> Self {
        self.filter = filter;
        self
    }
}

impl FetchTask for Leaf {
    type Output = Option<Response>;

    fn step(&mut self, previous: Option<Fetched>) -> Result<Step<Self::Output>> {
        match (std::mem::replace(&mut self.state, LeafState::Finished), previous) {
            (LeafState::Fresh(request), None) => {
                self.state = LeafState::Waiting;
                Ok(Step::Request(request))
            }
            (LeafState::Fresh(_), Some(_)) => Err(FetchError::UnexpectedResult),
            (LeafState::Waiting, Some(fetched)) => Ok(Step::Done(match fetched {
                Ok(response) if self.filter.accepts(&response) => Some(response),
                _ => None,
            })),
            (LeafState::Waiting, None) => Err(FetchError::MissingResult),
            (LeafState::Finished, _) => Err(FetchError::TaskFinished),
        }
    }

    fn filter(&self) -> &ResponseFilter {
        &self.filter
    }
}

/// GET `url` once.
///
/// Fails immediately when the URL cannot be parsed.
pub fn fetch(url: &str, options: RequestOptions) -> Result<Leaf> {
    Ok(Leaf::new(Request::get(url, options)?))
}
