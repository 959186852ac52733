//! News portal
//!
//! News and articles grouped into categories, with per-category email
//! subscriptions, a weekly digest, ratings and a word censor.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod seed;
pub mod services;
pub mod tasks;
