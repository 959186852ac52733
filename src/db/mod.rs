//! Database layer
//!
//! SQLite is the default backend; MySQL is available for larger deployments.
//! The driver is selected from configuration and hidden behind the
//! `DatabasePool` trait. Repositories that need dialect-specific SQL match on
//! [`DatabasePool::backend`].
//!
//! # Usage
//!
//! ```ignore
//! use newsportal::config::DatabaseConfig;
//! use newsportal::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, Backend, DatabasePool, DynDatabasePool, MysqlDatabase,
    SqliteDatabase,
};
