//! In-process job scheduler.
//!
//! Units of work (`Stage`s) are queued FIFO and executed on a bounded worker
//! pool. Stages can be chained so that each one receives the previous
//! stage's output. Failures are classified and retried per `RetryPolicy`
//! without holding a worker during backoff.

pub mod config;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod registry;
pub mod retry;
pub mod scheduler;
pub mod stage;

pub use config::SchedulerConfig;
pub use error::{QueueError, QueueResult};
pub use handle::{ChainHandle, JobHandle};
pub use registry::JobRegistry;
pub use retry::{RetryDecision, RetryPolicy};
pub use scheduler::Scheduler;
pub use stage::{Stage, StageContext, StageError, StageResult};
