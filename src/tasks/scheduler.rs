//! Weekly digest schedule
//!
//! Sleeps until the next configured weekday and time in the site time zone,
//! then enqueues the digest and prunes old bookkeeping rows.

use chrono::{DateTime, Datelike, Duration, LocalResult, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use std::sync::Arc;

use super::{Clock, Task, TaskQueue};
use crate::config::{ConfigError, SchedulerConfig};
use crate::db::repositories::{JobRunRepository, SessionRepository};

/// First instant strictly after `now` that falls on `weekday` at
/// `hour:minute` local time. Local times skipped by a DST jump move to the
/// following week.
pub fn next_digest_at(now: DateTime<Utc>, tz: Tz, weekday: Weekday, hour: u32, minute: u32) -> Option<DateTime<Utc>> {
    let today = now.with_timezone(&tz).date_naive();

    (0..=14)
        .map(|offset| today + Duration::days(offset))
        .filter(|date| date.weekday() == weekday)
        .filter_map(|date| date.and_hms_opt(hour, minute, 0))
        .filter_map(|naive| match tz.from_local_datetime(&naive) {
            LocalResult::Single(at) => Some(at),
            LocalResult::Ambiguous(earliest, _) => Some(earliest),
            LocalResult::None => None,
        })
        .map(|at| at.with_timezone(&Utc))
        .find(|at| *at > now)
}

pub struct DigestScheduler {
    queue: TaskQueue,
    job_runs: Arc<dyn JobRunRepository>,
    sessions: Arc<dyn SessionRepository>,
    tz: Tz,
    weekday: Weekday,
    hour: u32,
    minute: u32,
    history_days: i64,
    clock: Clock,
}

impl DigestScheduler {
    pub fn new(
        queue: TaskQueue,
        job_runs: Arc<dyn JobRunRepository>,
        sessions: Arc<dyn SessionRepository>,
        tz: Tz,
        config: &SchedulerConfig,
        clock: Clock,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            queue,
            job_runs,
            sessions,
            tz,
            weekday: config.weekday()?,
            hour: config.digest_hour,
            minute: config.digest_minute,
            history_days: config.job_history_days,
            clock,
        })
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(self) {
        loop {
            let now = (self.clock)();
            let Some(next) = self.next_run(now) else {
                tracing::error!(
                    weekday = %self.weekday,
                    hour = self.hour,
                    minute = self.minute,
                    "Cannot compute next digest time, scheduler stopping"
                );
                return;
            };

            tracing::info!(next = %next.with_timezone(&self.tz), "Next weekly digest scheduled");
            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;
            self.fire().await;
        }
    }

    pub fn next_run(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        next_digest_at(now, self.tz, self.weekday, self.hour, self.minute)
    }

    /// Enqueue the digest and clean up expired rows
    pub async fn fire(&self) {
        if let Err(e) = self.queue.enqueue(Task::WeeklyDigest) {
            tracing::error!(error = %e, "Failed to enqueue weekly digest");
        }

        let now = (self.clock)();
        match self.job_runs.prune_before(now - Duration::days(self.history_days)).await {
            Ok(pruned) if pruned > 0 => tracing::info!(pruned, "Old job runs pruned"),
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "Failed to prune job runs"),
        }
        match self.sessions.delete_expired(now).await {
            Ok(removed) if removed > 0 => tracing::info!(removed, "Expired sessions removed"),
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "Failed to remove expired sessions"),
        }
    }
}
