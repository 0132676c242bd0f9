//! HTTP clients and the scheduler that drives fetch tasks.

mod http;
mod mock;
mod scheduler;

pub use http::HttpClient;
pub use mock::MockClient;
pub use scheduler::{RunSummary, Scheduler, SchedulerOptions, TaskId};

#[cfg(feature = "reqwest")]
pub use http::ReqwestClient;
