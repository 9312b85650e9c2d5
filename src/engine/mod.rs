// QMS Metrics Engine - Core module structure
pub mod adapter;
pub mod api;
pub mod cli;
pub mod config;
pub mod database;
pub mod logging;
pub mod observability;

pub use config::Config;
pub use database::Database;
pub use observability::MetricsCollector;
