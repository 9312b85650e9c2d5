//! Metrics Source Adapter Layer
//!
//! Provides a trait-based abstraction over the administrative commands the
//! metrics collector needs. `MongoSource` talks to a live server through the
//! official driver; `MemorySource` is a scriptable in-process backend.

pub mod memory;
pub mod mongo;

pub use memory::{MemoryCollection, MemorySource, SourceCall};
pub use mongo::MongoSource;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Universal result type for source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Core metrics source trait. All backends implement this.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Name of the database being inspected
    fn database_name(&self) -> &str;

    /// Round-trip to the server
    async fn ping(&self) -> SourceResult<()>;

    /// Aggregate storage figures (`dbStats`)
    async fn db_stats(&self) -> SourceResult<RawDbStats>;

    /// Connection, opcounter, memory and uptime figures (`serverStatus`)
    async fn server_status(&self) -> SourceResult<RawServerStatus>;

    /// Current profiler level and `slowms`
    async fn profiling_status(&self) -> SourceResult<ProfilingStatus>;

    /// Change the profiler level and `slowms`
    async fn set_profiling(&self, level: ProfilingLevel, slow_ms: u64) -> SourceResult<()>;

    /// Entries of `system.profile` slower than `threshold_ms`, newest first
    async fn slow_operations(&self, threshold_ms: u64, limit: usize) -> SourceResult<Vec<ProfileEntry>>;

    /// Every collection name, system collections included
    async fn collection_names(&self) -> SourceResult<Vec<String>>;

    /// Indexes defined on a collection
    async fn indexes(&self, collection: &str) -> SourceResult<Vec<IndexInfo>>;

    /// Document count for a collection
    async fn document_count(&self, collection: &str) -> SourceResult<u64>;

    /// Unconstrained single-document read, used as a latency probe
    async fn find_one(&self, collection: &str) -> SourceResult<()>;
}

/// Raw `dbStats` figures. Byte values are as reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDbStats {
    pub collections: u64,
    pub views: u64,
    pub objects: u64,
    pub avg_obj_size: f64,
    pub data_size: f64,
    pub storage_size: f64,
    pub indexes: u64,
    pub index_size: f64,
    pub total_size: f64,
}

/// Raw `serverStatus` figures
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawServerStatus {
    pub host: String,
    pub version: String,
    pub uptime_secs: u64,
    pub connections: ConnectionCounts,
    pub opcounters: OpCounters,
    pub memory: MemoryUsage,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionCounts {
    pub current: u64,
    pub available: u64,
    pub total_created: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpCounters {
    pub insert: u64,
    pub query: u64,
    pub update: u64,
    pub delete: u64,
    pub getmore: u64,
    pub command: u64,
}

/// Resident and virtual memory, in megabytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUsage {
    pub resident_mb: u64,
    pub virtual_mb: u64,
}

/// Server-side profiler level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProfilingLevel {
    Off,
    SlowOnly,
    All,
}

impl ProfilingLevel {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(ProfilingLevel::Off),
            1 => Some(ProfilingLevel::SlowOnly),
            2 => Some(ProfilingLevel::All),
            _ => None,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            ProfilingLevel::Off => 0,
            ProfilingLevel::SlowOnly => 1,
            ProfilingLevel::All => 2,
        }
    }
}

impl fmt::Display for ProfilingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfilingLevel::Off => write!(f, "off"),
            ProfilingLevel::SlowOnly => write!(f, "slowOnly"),
            ProfilingLevel::All => write!(f, "all"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilingStatus {
    pub level: ProfilingLevel,
    pub slow_ms: u64,
}

/// One `system.profile` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileEntry {
    pub timestamp: Option<DateTime<Utc>>,
    pub operation: String,
    pub namespace: String,
    pub millis: u64,
    pub command: serde_json::Value,
    pub plan_summary: Option<String>,
}

/// Index information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    pub keys: Vec<String>,
}

impl IndexInfo {
    pub fn new(name: &str, keys: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keys: keys.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// The default `_id_` index every collection carries
    pub fn primary() -> Self {
        Self::new("_id_", &["_id"])
    }

    pub fn covers(&self, field: &str) -> bool {
        self.keys.iter().any(|k| k == field)
    }
}

/// Metrics source errors
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("MongoDB error: {0}")]
    Driver(#[from] mongodb::error::Error),

    #[error("Unexpected {command} response: {message}")]
    Decode {
        command: &'static str,
        message: String,
    },

    #[error("{0}")]
    Injected(String),
}
