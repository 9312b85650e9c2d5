//! In-memory Metrics Source
//!
//! A scriptable backend: collections with fixed document counts, indexes and
//! simulated read latency, canned stats, a profile log, and per-call failure
//! or panic injection.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{
    IndexInfo, MetricsSource, ProfileEntry, ProfilingLevel, ProfilingStatus, RawDbStats,
    RawServerStatus, SourceError, SourceResult,
};

/// Identifies one `MetricsSource` method for failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceCall {
    Ping,
    DbStats,
    ServerStatus,
    ProfilingStatus,
    SetProfiling,
    SlowOperations,
    CollectionNames,
    Indexes,
    DocumentCount,
    FindOne,
}

#[derive(Debug, Clone)]
pub struct MemoryCollection {
    pub name: String,
    pub documents: u64,
    pub indexes: Vec<IndexInfo>,
    pub latency: Duration,
    /// Fail `indexes`/`document_count`/`find_one` for this collection only
    pub broken: bool,
}

impl MemoryCollection {
    /// A collection carrying only the default `_id_` index
    pub fn new(name: &str, documents: u64) -> Self {
        Self {
            name: name.to_string(),
            documents,
            indexes: vec![IndexInfo::primary()],
            latency: Duration::ZERO,
            broken: false,
        }
    }

    pub fn with_index(mut self, name: &str, keys: &[&str]) -> Self {
        self.indexes.push(IndexInfo::new(name, keys));
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn broken(mut self) -> Self {
        self.broken = true;
        self
    }
}

pub struct MemorySource {
    name: String,
    collections: Vec<MemoryCollection>,
    db_stats: RawDbStats,
    server_status: RawServerStatus,
    profile_log: Vec<ProfileEntry>,
    profiling: Mutex<ProfilingStatus>,
    profiling_writes: AtomicUsize,
    /// Delay between applying a profiler change and acknowledging it
    profiling_ack_delay: Duration,
    failures: HashSet<SourceCall>,
    panics: HashSet<SourceCall>,
}

impl MemorySource {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            collections: Vec::new(),
            db_stats: RawDbStats::default(),
            server_status: RawServerStatus::default(),
            profile_log: Vec::new(),
            profiling: Mutex::new(ProfilingStatus {
                level: ProfilingLevel::Off,
                slow_ms: 100,
            }),
            profiling_writes: AtomicUsize::new(0),
            profiling_ack_delay: Duration::ZERO,
            failures: HashSet::new(),
            panics: HashSet::new(),
        }
    }

    pub fn with_collection(mut self, collection: MemoryCollection) -> Self {
        self.collections.push(collection);
        self
    }

    pub fn with_db_stats(mut self, stats: RawDbStats) -> Self {
        self.db_stats = stats;
        self
    }

    pub fn with_server_status(mut self, status: RawServerStatus) -> Self {
        self.server_status = status;
        self
    }

    pub fn with_profile_entry(mut self, entry: ProfileEntry) -> Self {
        self.profile_log.push(entry);
        self
    }

    pub fn with_profiling(self, level: ProfilingLevel, slow_ms: u64) -> Self {
        *self.profiling.lock().unwrap_or_else(|e| e.into_inner()) = ProfilingStatus { level, slow_ms };
        self
    }

    /// Apply `set_profiling` immediately but reply only after `delay`
    pub fn with_profiling_ack_delay(mut self, delay: Duration) -> Self {
        self.profiling_ack_delay = delay;
        self
    }

    /// Make `call` return an error
    pub fn failing(mut self, call: SourceCall) -> Self {
        self.failures.insert(call);
        self
    }

    /// Make `call` panic
    pub fn panicking(mut self, call: SourceCall) -> Self {
        self.panics.insert(call);
        self
    }

    /// Profiler state as last written
    pub fn current_profiling(&self) -> ProfilingStatus {
        *self.profiling.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of `set_profiling` calls received
    pub fn profiling_writes(&self) -> usize {
        self.profiling_writes.load(Ordering::SeqCst)
    }

    fn check(&self, call: SourceCall) -> SourceResult<()> {
        if self.panics.contains(&call) {
            panic!("injected panic in {:?}", call);
        }
        if self.failures.contains(&call) {
            return Err(SourceError::Injected(format!("{:?} failed", call)));
        }
        Ok(())
    }

    fn collection(&self, call: SourceCall, name: &str) -> SourceResult<&MemoryCollection> {
        self.check(call)?;
        let collection = self
            .collections
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| SourceError::Injected(format!("collection not found: {}", name)))?;
        if collection.broken {
            return Err(SourceError::Injected(format!("{:?} failed on {}", call, name)));
        }
        Ok(collection)
    }
}

#[async_trait]
impl MetricsSource for MemorySource {
    fn database_name(&self) -> &str {
        &self.name
    }

    async fn ping(&self) -> SourceResult<()> {
        self.check(SourceCall::Ping)
    }

    async fn db_stats(&self) -> SourceResult<RawDbStats> {
        self.check(SourceCall::DbStats)?;
        Ok(self.db_stats.clone())
    }

    async fn server_status(&self) -> SourceResult<RawServerStatus> {
        self.check(SourceCall::ServerStatus)?;
        Ok(self.server_status.clone())
    }

    async fn profiling_status(&self) -> SourceResult<ProfilingStatus> {
        self.check(SourceCall::ProfilingStatus)?;
        Ok(self.current_profiling())
    }

    async fn set_profiling(&self, level: ProfilingLevel, slow_ms: u64) -> SourceResult<()> {
        self.check(SourceCall::SetProfiling)?;
        *self.profiling.lock().unwrap_or_else(|e| e.into_inner()) = ProfilingStatus { level, slow_ms };
        self.profiling_writes.fetch_add(1, Ordering::SeqCst);
        if !self.profiling_ack_delay.is_zero() {
            tokio::time::sleep(self.profiling_ack_delay).await;
        }
        Ok(())
    }

    async fn slow_operations(&self, threshold_ms: u64, limit: usize) -> SourceResult<Vec<ProfileEntry>> {
        self.check(SourceCall::SlowOperations)?;

        let mut entries: Vec<ProfileEntry> = self
            .profile_log
            .iter()
            .filter(|e| e.millis > threshold_ms)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries.truncate(limit);
        Ok(entries)
    }

    async fn collection_names(&self) -> SourceResult<Vec<String>> {
        self.check(SourceCall::CollectionNames)?;
        Ok(self.collections.iter().map(|c| c.name.clone()).collect())
    }

    async fn indexes(&self, collection: &str) -> SourceResult<Vec<IndexInfo>> {
        Ok(self.collection(SourceCall::Indexes, collection)?.indexes.clone())
    }

    async fn document_count(&self, collection: &str) -> SourceResult<u64> {
        Ok(self.collection(SourceCall::DocumentCount, collection)?.documents)
    }

    async fn find_one(&self, collection: &str) -> SourceResult<()> {
        let latency = self.collection(SourceCall::FindOne, collection)?.latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(millis: u64, minute: u32) -> ProfileEntry {
        ProfileEntry {
            timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 9, minute, 0).single(),
            operation: "query".to_string(),
            namespace: "qms.findings".to_string(),
            millis,
            command: serde_json::json!({ "find": "findings" }),
            plan_summary: None,
        }
    }

    #[tokio::test]
    async fn test_slow_operations_filter_order_and_limit() {
        let source = MemorySource::new("qms")
            .with_profile_entry(entry(150, 1))
            .with_profile_entry(entry(90, 2))
            .with_profile_entry(entry(300, 3))
            .with_profile_entry(entry(120, 4));

        let ops = source.slow_operations(100, 2).await.unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].millis, 120);
        assert_eq!(ops[1].millis, 300);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let source = MemorySource::new("qms")
            .with_collection(MemoryCollection::new("audits", 10).broken())
            .failing(SourceCall::DbStats);

        assert!(source.db_stats().await.is_err());
        assert!(source.indexes("audits").await.is_err());
        assert!(source.document_count("missing").await.is_err());
        assert!(source.server_status().await.is_ok());
    }

    #[tokio::test]
    async fn test_set_profiling_is_recorded() {
        let source = MemorySource::new("qms");
        source.set_profiling(ProfilingLevel::SlowOnly, 100).await.unwrap();

        assert_eq!(source.profiling_writes(), 1);
        assert_eq!(source.current_profiling().level, ProfilingLevel::SlowOnly);
    }
}
