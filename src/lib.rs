//! forum_core - discussion platform backend core
//!
//! A scoped, fail-open result cache and a bounded fan-out aggregator that
//! hydrate pages of profiles, events and ignore lists, served over a REST API.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod hydrate;
pub mod models;
pub mod services;
pub mod tasks;

pub use api::{create_router, AppState};
pub use config::Config;
pub use error::{AppError, Result};
pub use tasks::spawn_cleanup_task;
