//! Single-loop execution of many fetch tasks.
//!
//! Every task keeps at most one request in flight. The scheduler enrolls the
//! first request of each task, then waits for whichever request completes
//! first, resumes its owner with the outcome and enrolls whatever that owner
//! asks for next. The run ends once no request is left in flight.

use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::{StreamExt, stream::FuturesUnordered};
use tracing::{debug, info, trace};

use super::http::HttpClient;
use crate::core::{BoxTask, Fetched, Step};
use crate::data::Request;
use crate::error::SchedulerError;

/// Position of a task in the list handed to [`Scheduler::run`].
pub type TaskId = usize;

/// Configuration for scheduler runs.
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Longest single wait for request activity before the loop checks in again.
    pub poll_interval: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Counters of one scheduler run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub tasks: usize,
    /// Requests enrolled, retries and downgrades included.
    pub requests: usize,
    /// Requests that failed at the transport level.
    pub failed_requests: usize,
}

type InFlight<'a> = FuturesUnordered<BoxFuture<'a, (TaskId, Fetched)>>;

struct RunState<'a, T> {
    tasks: Vec<Option<BoxTask<T>>>,
    in_flight: InFlight<'a>,
    finished: Vec<T>,
    summary: RunSummary,
}

/// Drives fetch tasks against an [`HttpClient`].
pub struct Scheduler<C: HttpClient> {
    client: C,
    options: SchedulerOptions,
}

impl<C: HttpClient> Scheduler<C> {
    pub fn new(client: C) -> Self {
        Self::with_options(client, SchedulerOptions::default())
    }

    pub fn with_options(client: C, options: SchedulerOptions) -> Self {
        Self { client, options }
    }

    #[must_use]
    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.options.poll_interval = poll_interval;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Run all tasks to completion and collect their outputs.
    ///
    /// Outputs are in completion order, not submission order.
    pub async fn run_all<T>(&self, tasks: Vec<BoxTask<T>>) -> Result<Vec<T>, SchedulerError> {
        self.run(tasks).await.map(|(outputs, _)| outputs)
    }

    /// Like [`run_all`](Self::run_all), also returning the run's counters.
    pub async fn run<T>(
        &self,
        tasks: Vec<BoxTask<T>>,
    ) -> Result<(Vec<T>, RunSummary), SchedulerError> {
        let mut run = RunState {
            finished: Vec::with_capacity(tasks.len()),
            summary: RunSummary {
                tasks: tasks.len(),
                ..RunSummary::default()
            },
            tasks: tasks.into_iter().map(Some).collect(),
            in_flight: FuturesUnordered::new(),
        };
        debug!(tasks = run.summary.tasks, "starting fetch tasks");

        for id in 0..run.tasks.len() {
            self.advance(&mut run, id, None)?;
        }

        while !run.in_flight.is_empty() {
            let Ok(completed) =
                tokio::time::timeout(self.options.poll_interval, run.in_flight.next()).await
            else {
                debug!(in_flight = run.in_flight.len(), "waiting for requests");
                continue;
            };
            let Some((id, fetched)) = completed else {
                break;
            };
            if fetched.is_err() {
                run.summary.failed_requests += 1;
            }
            self.advance(&mut run, id, Some(fetched))?;
        }

        info!(
            tasks = run.summary.tasks,
            requests = run.summary.requests,
            failed = run.summary.failed_requests,
            "fetch tasks finished"
        );
        Ok((run.finished, run.summary))
    }

    /// Step task `id` and enroll its next request, if any.
    fn advance<'s, T>(
        &'s self,
        run: &mut RunState<'s, T>,
        id: TaskId,
        input: Option<Fetched>,
    ) -> Result<(), SchedulerError> {
        let slot = run.tasks.get_mut(id).ok_or(SchedulerError::UnknownTask(id))?;
        let task = slot.as_mut().ok_or(SchedulerError::UnknownTask(id))?;

        match task
            .step(input)
            .map_err(|source| SchedulerError::Task { id, source })?
        {
            Step::Request(request) => {
                run.summary.requests += 1;
                run.in_flight.push(self.enroll(id, request));
            }
            Step::Done(output) => {
                trace!(task = id, "task finished");
                *slot = None;
                run.finished.push(output);
            }
        }
        Ok(())
    }

    fn enroll(&self, id: TaskId, request: Request) -> BoxFuture<'_, (TaskId, Fetched)> {
        trace!(task = id, method = ?request.method(), url = %request.url(), "enrolling request");
        let response = self.client.execute(request);
        Box::pin(async move { (id, response.await) })
    }
}
