//! Background work
//!
//! Email delivery runs off the request path: handlers push a [`Task`] onto
//! the [`TaskQueue`] and a single [`TaskWorker`] drains it. The
//! [`DigestScheduler`] enqueues the weekly digest at the configured time.

pub mod queue;
pub mod scheduler;
pub mod worker;

use chrono::{DateTime, Utc};
use std::sync::Arc;

pub use queue::{QueueError, Task, TaskQueue, QUEUE_CAPACITY};
pub use scheduler::{next_digest_at, DigestScheduler};
pub use worker::TaskWorker;

/// Injectable source of the current time
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(Utc::now)
}
