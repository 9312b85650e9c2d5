//! Report types returned by the metrics collector

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::dashboard::LatencyStatus;
use super::format::{format_byte_figure, format_uptime, Uptime};
use crate::engine::adapter::{
    ConnectionCounts, MemoryUsage, OpCounters, ProfileEntry, ProfilingLevel, RawDbStats,
    RawServerStatus,
};

/// A byte figure, raw and human-readable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ByteFigure {
    pub bytes: f64,
    pub formatted: String,
}

impl From<f64> for ByteFigure {
    fn from(bytes: f64) -> Self {
        Self {
            bytes,
            formatted: format_byte_figure(bytes),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    pub name: String,
    pub collections: u64,
    pub views: u64,
    pub objects: u64,
    pub avg_obj_size: ByteFigure,
    pub data_size: ByteFigure,
    pub storage_size: ByteFigure,
    pub indexes: u64,
    pub index_size: ByteFigure,
    pub total_size: ByteFigure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub host: String,
    pub version: String,
}

/// Output of `getDatabaseStats`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseStats {
    pub database: StorageStats,
    pub server: ServerInfo,
    pub connections: ConnectionCounts,
    pub operations: OpCounters,
    pub memory: MemoryUsage,
    pub uptime: Uptime,
}

impl DatabaseStats {
    pub fn from_raw(name: &str, stats: RawDbStats, status: RawServerStatus) -> Self {
        Self {
            database: StorageStats {
                name: name.to_string(),
                collections: stats.collections,
                views: stats.views,
                objects: stats.objects,
                avg_obj_size: stats.avg_obj_size.into(),
                data_size: stats.data_size.into(),
                storage_size: stats.storage_size.into(),
                indexes: stats.indexes,
                index_size: stats.index_size.into(),
                total_size: stats.total_size.into(),
            },
            server: ServerInfo {
                host: status.host,
                version: status.version,
            },
            connections: status.connections,
            operations: status.opcounters,
            memory: status.memory,
            uptime: format_uptime(status.uptime_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlowQuery {
    pub timestamp: Option<DateTime<Utc>>,
    pub operation: String,
    pub namespace: String,
    pub duration_ms: u64,
    pub command: serde_json::Value,
    pub plan_summary: Option<String>,
}

impl From<ProfileEntry> for SlowQuery {
    fn from(entry: ProfileEntry) -> Self {
        Self {
            timestamp: entry.timestamp,
            operation: entry.operation,
            namespace: entry.namespace,
            duration_ms: entry.millis,
            command: entry.command,
            plan_summary: entry.plan_summary,
        }
    }
}

/// Output of `MetricsCollector::slow_queries`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlowQueryReport {
    pub profiling_level: ProfilingLevel,
    pub threshold_ms: u64,
    pub queries: Vec<SlowQuery>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexRecommendation {
    pub fields: Vec<String>,
    pub reason: String,
    pub suggested_index: String,
    pub priority: Priority,
}

/// One collection flagged by the missing-index heuristics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingIndexReport {
    pub collection: String,
    pub document_count: u64,
    pub existing_indexes: Vec<String>,
    pub recommendations: Vec<IndexRecommendation>,
}

/// One probe of `getCollectionLatency`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionLatency {
    pub collection: String,
    pub latency_ms: u64,
    pub status: LatencyStatus,
}
