//! Resumable fetch tasks driven by a single request loop.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Immutable request and response descriptors
//! - [`core`] - Task state machines and fetch policies, free of I/O
//! - [`effects`] - HTTP clients and the scheduler that drives tasks
//!
//! # Key Features
//!
//! - **One request at a time per task**: a [`FetchTask`] yields a [`Request`],
//!   is suspended, and is resumed with the outcome of exactly that request
//! - **Composable policies**: retrying, HTTPS to HTTP downgrading and
//!   stop-on-failure wrap any task through [`FetchTaskExt`]
//! - **Multi-phase protocols**: [`Driven`] runs a [`Protocol`] that starts
//!   sub-tasks one after another and reacts to their outputs
//! - **Single loop**: [`Scheduler`] keeps every task's request in flight at once
//!   and resumes each owner as its request completes

mod core;
mod data;
mod effects;
mod error;

pub use self::core::{
    BoxTask, Downgrade, Downgradeable, Driven, FetchTask, FetchTaskExt, Fetched, Leaf, Map, Next,
    Protocol, ResponseFilter, RetryBudget, Retryable, Step, StopOnFailure, fetch,
};
pub use data::{Method, Request, RequestOptions, Response, Timeouts};
pub use effects::{HttpClient, MockClient, RunSummary, Scheduler, SchedulerOptions, TaskId};

#[cfg(feature = "reqwest")]
pub use effects::ReqwestClient;

pub use error::{FetchError, HttpError, Result, SchedulerError};
