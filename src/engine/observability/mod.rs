//! Observability Module
//!
//! MongoDB metrics collection and the admin health dashboard

pub mod dashboard;
pub mod format;
pub mod indexes;
pub mod metrics;
pub mod profiling;
pub mod report;

pub use dashboard::{Facet, FacetFailure, HealthStatus, HealthSummary, LatencyStatus};
pub use format::{format_bytes, format_uptime, Uptime};
pub use metrics::{MetricsCollector, MetricsError, MetricsResult};
pub use profiling::ProfilingGuard;
pub use report::{
    CollectionLatency, DatabaseStats, IndexRecommendation, MissingIndexReport, Priority,
    SlowQuery, SlowQueryReport,
};
