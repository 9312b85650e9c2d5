//! QMS Metrics - MongoDB operational health reporting
//!
//! Backs the Super Admin database-health page of the QMS platform: database
//! statistics, slow-query sampling, missing-index heuristics and per-collection
//! latency, folded into a 0-100 health score.

pub mod engine;

pub use engine::adapter::{MemorySource, MetricsSource, MongoSource};
pub use engine::api::{create_router, ApiEnvelope, ApiState};
pub use engine::config::Config;
pub use engine::observability::{HealthStatus, HealthSummary, MetricsCollector, MetricsError};
