//! Asynchronous background-job engine.
//!
//! Long-running jobs are split into short executions over a durable queue.
//! An execution is always entered through a trigger (a continuation
//! scheduled by the previous execution, or a health-check re-dispatch),
//! holds the drain lock while it works, and leaves everything it needs for
//! the next execution in the key/value store before it returns. The engine
//! survives crashes at any point: locks expire, batches persist per item and
//! the health-check schedule replaces lost triggers.

mod dispatch;
mod healthcheck;
mod models;
mod process;
mod queue;
mod registry;
mod task;
mod trigger_auth;

pub use dispatch::{ChannelDispatcher, ContinuationRunner, DispatchError, Dispatcher};
pub use healthcheck::HealthcheckTick;
pub use models::{
    Batch, Continuation, DispatchOutcome, ProcessConfig, ProcessFlag, ProcessLock, TaskOutcome,
    TriggerOutcome, WorkItem,
};
pub use process::BackgroundProcess;
pub use queue::ProcessQueue;
pub use registry::ProcessRegistry;
pub use task::ProcessTask;
pub use trigger_auth::TriggerAuth;
