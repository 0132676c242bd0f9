//! Multi-phase tasks built from sub-tasks.

use super::task::{BoxTask, FetchTask, Fetched, ResponseFilter, Step};
use crate::error::{FetchError, Result};

/// Next action of a [`Protocol`].
pub enum Next<S, T> {
    /// Run this sub-task to completion and report its output back.
    Fetch(BoxTask<S>),
    /// The protocol is finished.
    Finish(T),
}

/// A continuation that sequences sub-tasks.
///
/// [`resume`](Protocol::resume) is called with `None` once at the start and
/// then with the output of every sub-task it asked for, in order.
pub trait Protocol {
    type Sub;
    type Output;

    fn resume(&mut self, finished: Option<Self::Sub>) -> Result<Next<Self::Sub, Self::Output>>;
}

/// Runs a [`Protocol`] as a single [`FetchTask`].
///
/// Sub-tasks run one at a time and do their own response filtering, so the
/// driven task accepts any completed response by default.
pub struct Driven<P: Protocol> {
    protocol: P,
    current: Option<BoxTask<P::Sub>>,
    filter: ResponseFilter,
    finished: bool,
}

impl<P: Protocol> Driven<P> {
    pub fn new(protocol: P) -> Self {
        Self {
            protocol,
            current: None,
            filter: ResponseFilter::any_status(),
            finished: false,
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: ResponseFilter) -> Self {
        self.filter = filter;
        self
    }
}

impl<P: Protocol> FetchTask for Driven<P> {
    type Output = P::Output;

    fn step(&mut self, previous: Option<Fetched>) -> Result<Step<P::Output>> {
        if self.finished {
            return Err(FetchError::TaskFinished);
        }
        if self.current.is_none() && previous.is_some() {
            return Err(FetchError::UnexpectedResult);
        }

        let mut input = previous;
        let mut report = None;
        loop {
            if let Some(task) = self.current.as_mut() {
                match task.step(input.take())? {
                    Step::Request(request) => return Ok(Step::Request(request)),
                    Step::Done(output) => {
                        self.current = None;
                        report = Some(output);
                    }
                }
            }
            match self.protocol.resume(report.take())? {
                Next::Fetch(task) => self.current = Some(task),
                Next::Finish(output) => {
                    self.finished = true;
                    return Ok(Step::Done(output));
                }
            }
        }
    }

    fn filter(&self) -> &ResponseFilter {
        &self.filter
    }
}
