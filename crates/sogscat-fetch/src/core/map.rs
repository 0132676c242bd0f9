use super::task::{FetchTask, Fetched, ResponseFilter, Step};
use crate::error::{FetchError, Result};

/// Transforms the output of the wrapped task.
pub struct Map<T, F> {
    inner: T,
    f: Option<F>,
}

impl<T, F> Map<T, F> {
    pub fn new(inner: T, f: F) -> Self {
        Self { inner, f: Some(f) }
    }
}

impl<T, F, U> FetchTask for Map<T, F>
where
    T: FetchTask,
    F: FnOnce(T::Output) -> U,
{
    type Output = U;

    fn step(&mut self, previous: Option<Fetched>) -> Result<Step<U>> {
        match self.inner.step(previous)? {
            Step::Request(request) => Ok(Step::Request(request)),
            Step::Done(output) => {
                let f = self.f.take().ok_or(FetchError::TaskFinished)?;
                Ok(Step::Done(f(output)))
            }
        }
    }

    fn filter(&self) -> &ResponseFilter {
        self.inner.filter()
    }
}
