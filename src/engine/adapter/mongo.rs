//! MongoDB Metrics Source
//!
//! Implements `MetricsSource` on top of the official driver. Missing or
//! oddly-typed fields in admin command replies default to zero.

use async_trait::async_trait;
use chrono::DateTime;
use futures_util::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::IndexModel;
use tracing::debug;

use super::{
    ConnectionCounts, IndexInfo, MemoryUsage, MetricsSource, OpCounters, ProfileEntry,
    ProfilingLevel, ProfilingStatus, RawDbStats, RawServerStatus, SourceError, SourceResult,
};
use crate::engine::database::Database;

pub struct MongoSource {
    db: Database,
}

impl MongoSource {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn collection(&self, name: &str) -> mongodb::Collection<Document> {
        self.db.handle().collection::<Document>(name)
    }
}

#[async_trait]
impl MetricsSource for MongoSource {
    fn database_name(&self) -> &str {
        self.db.name()
    }

    async fn ping(&self) -> SourceResult<()> {
        self.db.admin().run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn db_stats(&self) -> SourceResult<RawDbStats> {
        let reply = self.db.handle().run_command(doc! { "dbStats": 1 }).await?;

        Ok(RawDbStats {
            collections: count(&reply, "collections"),
            views: count(&reply, "views"),
            objects: count(&reply, "objects"),
            avg_obj_size: number(&reply, "avgObjSize"),
            data_size: number(&reply, "dataSize"),
            storage_size: number(&reply, "storageSize"),
            indexes: count(&reply, "indexes"),
            index_size: number(&reply, "indexSize"),
            total_size: number(&reply, "totalSize"),
        })
    }

    async fn server_status(&self) -> SourceResult<RawServerStatus> {
        let reply = self.db.admin().run_command(doc! { "serverStatus": 1 }).await?;

        let connections = section(&reply, "connections");
        let opcounters = section(&reply, "opcounters");
        let mem = section(&reply, "mem");

        Ok(RawServerStatus {
            host: reply.get_str("host").unwrap_or_default().to_string(),
            version: reply.get_str("version").unwrap_or_default().to_string(),
            uptime_secs: count(&reply, "uptime"),
            connections: ConnectionCounts {
                current: count(&connections, "current"),
                available: count(&connections, "available"),
                total_created: count(&connections, "totalCreated"),
            },
            opcounters: OpCounters {
                insert: count(&opcounters, "insert"),
                query: count(&opcounters, "query"),
                update: count(&opcounters, "update"),
                delete: count(&opcounters, "delete"),
                getmore: count(&opcounters, "getmore"),
                command: count(&opcounters, "command"),
            },
            memory: MemoryUsage {
                resident_mb: count(&mem, "resident"),
                virtual_mb: count(&mem, "virtual"),
            },
        })
    }

    async fn profiling_status(&self) -> SourceResult<ProfilingStatus> {
        let reply = self.db.handle().run_command(doc! { "profile": -1 }).await?;

        let code = reply.get("was").and_then(as_i64).unwrap_or(0);
        let level = ProfilingLevel::from_code(code).ok_or_else(|| SourceError::Decode {
            command: "profile",
            message: format!("unknown profiling level {}", code),
        })?;

        Ok(ProfilingStatus {
            level,
            slow_ms: count(&reply, "slowms"),
        })
    }

    async fn set_profiling(&self, level: ProfilingLevel, slow_ms: u64) -> SourceResult<()> {
        let slow_ms = i64::try_from(slow_ms).unwrap_or(i64::MAX);
        self.db
            .handle()
            .run_command(doc! { "profile": level.code(), "slowms": slow_ms })
            .await?;
        debug!(%level, slow_ms, "profiling level changed");
        Ok(())
    }

    async fn slow_operations(&self, threshold_ms: u64, limit: usize) -> SourceResult<Vec<ProfileEntry>> {
        let threshold = i64::try_from(threshold_ms).unwrap_or(i64::MAX);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let cursor = self
            .collection("system.profile")
            .find(doc! { "millis": { "$gt": threshold } })
            .sort(doc! { "ts": -1 })
            .limit(limit)
            .await?;
        let docs: Vec<Document> = cursor.try_collect().await?;

        Ok(docs.iter().map(profile_entry).collect())
    }

    async fn collection_names(&self) -> SourceResult<Vec<String>> {
        Ok(self.db.handle().list_collection_names().await?)
    }

    async fn indexes(&self, collection: &str) -> SourceResult<Vec<IndexInfo>> {
        let cursor = self.collection(collection).list_indexes().await?;
        let models: Vec<IndexModel> = cursor.try_collect().await?;

        Ok(models
            .into_iter()
            .map(|model| IndexInfo {
                name: model
                    .options
                    .and_then(|o| o.name)
                    .unwrap_or_default(),
                keys: model.keys.keys().cloned().collect(),
            })
            .collect())
    }

    async fn document_count(&self, collection: &str) -> SourceResult<u64> {
        Ok(self.collection(collection).estimated_document_count().await?)
    }

    async fn find_one(&self, collection: &str) -> SourceResult<()> {
        self.collection(collection).find_one(doc! {}).await?;
        Ok(())
    }
}

fn profile_entry(doc: &Document) -> ProfileEntry {
    let timestamp = match doc.get("ts") {
        Some(Bson::DateTime(ts)) => DateTime::from_timestamp_millis(ts.timestamp_millis()),
        _ => None,
    };

    let command = doc
        .get("command")
        .cloned()
        .map(Bson::into_relaxed_extjson)
        .unwrap_or(serde_json::Value::Null);

    ProfileEntry {
        timestamp,
        operation: doc.get_str("op").unwrap_or("unknown").to_string(),
        namespace: doc.get_str("ns").unwrap_or_default().to_string(),
        millis: count(doc, "millis"),
        command,
        plan_summary: doc.get_str("planSummary").ok().map(str::to_string),
    }
}

fn section(doc: &Document, key: &str) -> Document {
    doc.get_document(key).cloned().unwrap_or_default()
}

fn as_i64(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(v) => Some(i64::from(*v)),
        Bson::Int64(v) => Some(*v),
        Bson::Double(v) => Some(*v as i64),
        _ => None,
    }
}

fn number(doc: &Document, key: &str) -> f64 {
    match doc.get(key) {
        Some(Bson::Int32(v)) => f64::from(*v),
        Some(Bson::Int64(v)) => *v as f64,
        Some(Bson::Double(v)) => *v,
        _ => 0.0,
    }
}

fn count(doc: &Document, key: &str) -> u64 {
    doc.get(key)
        .and_then(as_i64)
        .map(|v| v.max(0) as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_fields_accept_any_bson_number() {
        let reply = doc! { "a": 3_i32, "b": 4_i64, "c": 5.9_f64, "d": "x", "e": -2_i32 };
        assert_eq!(count(&reply, "a"), 3);
        assert_eq!(count(&reply, "b"), 4);
        assert_eq!(count(&reply, "c"), 5);
        assert_eq!(count(&reply, "d"), 0);
        assert_eq!(count(&reply, "e"), 0);
        assert_eq!(count(&reply, "missing"), 0);
        assert_eq!(number(&reply, "c"), 5.9);
    }

    #[test]
    fn test_profile_entry_normalization() {
        let ts = mongodb::bson::DateTime::from_millis(1_700_000_000_000);
        let raw = doc! {
            "ts": ts,
            "op": "query",
            "ns": "qms.audits",
            "millis": 250_i32,
            "command": { "find": "audits", "filter": { "status": "open" } },
            "planSummary": "COLLSCAN",
        };

        let entry = profile_entry(&raw);
        assert_eq!(entry.operation, "query");
        assert_eq!(entry.namespace, "qms.audits");
        assert_eq!(entry.millis, 250);
        assert_eq!(entry.plan_summary.as_deref(), Some("COLLSCAN"));
        assert_eq!(entry.command["find"], serde_json::json!("audits"));
        assert_eq!(
            entry.timestamp.map(|t| t.timestamp_millis()),
            Some(1_700_000_000_000)
        );
    }

    #[test]
    fn test_profile_entry_defaults() {
        let entry = profile_entry(&doc! {});
        assert_eq!(entry.operation, "unknown");
        assert!(entry.timestamp.is_none());
        assert!(entry.command.is_null());
        assert!(entry.plan_summary.is_none());
    }
}
