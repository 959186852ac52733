//! Job run repository
//!
//! Execution log of scheduled jobs.

use crate::db::{Backend, DynDatabasePool};
use crate::models::{JobRun, JobStatus};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::sync::Arc;

#[async_trait]
pub trait JobRunRepository: Send + Sync {
    /// Record the start of a run, returns its id
    async fn start(&self, job_name: &str, started_at: DateTime<Utc>) -> Result<i64>;

    async fn finish(
        &self,
        id: i64,
        status: JobStatus,
        finished_at: DateTime<Utc>,
        detail: Option<&str>,
    ) -> Result<()>;

    /// Most recent runs first
    async fn recent(&self, limit: i64) -> Result<Vec<JobRun>>;

    /// Delete runs started before `cutoff`
    async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

pub struct SqlxJobRunRepository {
    pool: DynDatabasePool,
}

impl SqlxJobRunRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn JobRunRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl JobRunRepository for SqlxJobRunRepository {
    async fn start(&self, job_name: &str, started_at: DateTime<Utc>) -> Result<i64> {
        let sql = "INSERT INTO job_runs (job_name, started_at, status) VALUES (?, ?, ?)";
        let status = JobStatus::Running.to_string();
        let id = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(job_name)
                .bind(started_at)
                .bind(&status)
                .execute(pool)
                .await
                .context("Failed to record job start")?
                .last_insert_rowid(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(job_name)
                .bind(started_at)
                .bind(&status)
                .execute(pool)
                .await
                .context("Failed to record job start")?
                .last_insert_id() as i64,
        };
        Ok(id)
    }

    async fn finish(
        &self,
        id: i64,
        status: JobStatus,
        finished_at: DateTime<Utc>,
        detail: Option<&str>,
    ) -> Result<()> {
        let sql = "UPDATE job_runs SET status = ?, finished_at = ?, detail = ? WHERE id = ?";
        match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(status.to_string())
                .bind(finished_at)
                .bind(detail)
                .bind(id)
                .execute(pool)
                .await
                .map(|_| ()),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(status.to_string())
                .bind(finished_at)
                .bind(detail)
                .bind(id)
                .execute(pool)
                .await
                .map(|_| ()),
        }
        .context("Failed to record job result")
    }

    async fn recent(&self, limit: i64) -> Result<Vec<JobRun>> {
        let sql = "SELECT id, job_name, started_at, finished_at, status, detail \
                   FROM job_runs ORDER BY started_at DESC, id DESC LIMIT ?";
        macro_rules! to_run {
            ($row:expr) => {{
                let status: String = $row.get("status");
                Ok(JobRun {
                    id: $row.get("id"),
                    job_name: $row.get("job_name"),
                    started_at: $row.get("started_at"),
                    finished_at: $row.get("finished_at"),
                    status: status.parse().map_err(anyhow::Error::msg)?,
                    detail: $row.get("detail"),
                })
            }};
        }
        match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(limit)
                .fetch_all(pool)
                .await
                .context("Failed to list job runs")?
                .iter()
                .map(|row| -> Result<JobRun> { to_run!(row) })
                .collect(),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(limit)
                .fetch_all(pool)
                .await
                .context("Failed to list job runs")?
                .iter()
                .map(|row| -> Result<JobRun> { to_run!(row) })
                .collect(),
        }
    }

    async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let sql = "DELETE FROM job_runs WHERE started_at < ?";
        let affected = match self.pool.backend() {
            Backend::Sqlite(pool) => sqlx::query(sql)
                .bind(cutoff)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
            Backend::Mysql(pool) => sqlx::query(sql)
                .bind(cutoff)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
        }
        .context("Failed to prune job runs")?;
        Ok(affected)
    }
}
