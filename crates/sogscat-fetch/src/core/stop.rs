use tracing::debug;

use super::task::{FetchTask, Fetched, ResponseFilter, Step};
use crate::error::{FetchError, Result};

enum StopState {
    Fresh,
    Waiting,
    Finished,
}

/// Abandons the wrapped task on its first failed request.
///
/// Finishes with `None` in that case, `Some` of the wrapped output otherwise.
pub struct StopOnFailure<T> {
    inner: T,
    filter: ResponseFilter,
    state: StopState,
}

impl<T: FetchTask> StopOnFailure<T> {
    pub fn new(inner: T) -> Self {
        let filter = inner.filter().clone();
        Self {
            inner,
            filter,
            state: StopState::Fresh,
        }
    }

    fn forward(&mut self, input: Option<Fetched>) -> Result<Step<Option<T::Output>>> {
        match self.inner.step(input)? {
            Step::Request(request) => {
                self.state = StopState::Waiting;
                Ok(Step::Request(request))
            }
            Step::Done(output) => Ok(Step::Done(Some(output))),
        }
    }
}

impl<T: FetchTask> FetchTask for StopOnFailure<T> {
    type Output = Option<T::Output>;

    fn step(&mut self, previous: Option<Fetched>) -> Result<Step<Self::Output>> {
        match (std::mem::replace(&mut self.state, StopState::Finished), previous) {
            (StopState::Finished, _) => Err(FetchError::TaskFinished),
            (StopState::Fresh, None) => self.forward(None),
            (StopState::Fresh, Some(_)) => Err(FetchError::UnexpectedResult),
            (StopState::Waiting, None) => Err(FetchError::MissingResult),
            (StopState::Waiting, Some(fetched)) => {
                if self.filter.classify(&fetched) {
                    self.forward(Some(fetched))
                } else {
                    debug!("request failed, abandoning task");
                    Ok(Step::Done(None))
                }
            }
        }
    }

    fn filter(&self) -> &ResponseFilter {
        &self.filter
    }
}
