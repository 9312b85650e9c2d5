//! Observability Metrics Module
//!
//! The MongoDB metrics collector behind the admin database-health page.
//! Every operation is bounded by the configured command timeout and returns
//! its own `Result`; the health summary tolerates failed facets.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use super::dashboard::{Facet, FacetFailure, HealthSummary, LatencyStatus};
use super::indexes::index_recommendations;
use super::profiling::ProfilingGuard;
use super::report::{
    CollectionLatency, DatabaseStats, MissingIndexReport, SlowQueryReport,
};
use crate::engine::adapter::{
    MetricsSource, ProfilingLevel, ProfilingStatus, SourceError,
};
use crate::engine::config::{CollectorConfig, Config, HealthThresholds};

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("Database connection not established")]
    NotConnected,
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("{operation} timed out after {}ms", .timeout.as_millis())]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },
}

pub type MetricsResult<T> = Result<T, MetricsError>;

/// Point-in-time reporter over one database connection
pub struct MetricsCollector {
    source: Option<Arc<dyn MetricsSource>>,
    settings: CollectorConfig,
    thresholds: HealthThresholds,
}

impl MetricsCollector {
    pub fn new(
        source: Option<Arc<dyn MetricsSource>>,
        settings: CollectorConfig,
        thresholds: HealthThresholds,
    ) -> Self {
        Self {
            source,
            settings,
            thresholds,
        }
    }

    pub fn from_config(source: Option<Arc<dyn MetricsSource>>, config: &Config) -> Self {
        Self::new(source, config.collector.clone(), config.thresholds.clone())
    }

    pub fn is_connected(&self) -> bool {
        self.source.is_some()
    }

    pub fn settings(&self) -> &CollectorConfig {
        &self.settings
    }

    fn source(&self) -> MetricsResult<&Arc<dyn MetricsSource>> {
        self.source.as_ref().ok_or(MetricsError::NotConnected)
    }

    /// Run `fut` under the command timeout and log its outcome
    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> MetricsResult<T>
    where
        F: Future<Output = MetricsResult<T>>,
    {
        let timeout = self.settings.command_timeout();
        let started = Instant::now();

        let result = match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(MetricsError::Timeout { operation, timeout }),
        };

        match &result {
            Ok(_) => debug!(
                operation,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "metrics operation completed"
            ),
            Err(MetricsError::NotConnected) => {
                warn!(operation, "metrics requested without a database connection")
            }
            Err(e) => error!(operation, error = %e, "metrics operation failed"),
        }

        result
    }

    /// Non-system collections, in server order
    async fn user_collections(&self, source: &Arc<dyn MetricsSource>) -> MetricsResult<Vec<String>> {
        let names = source.collection_names().await?;
        Ok(names
            .into_iter()
            .filter(|name| !name.starts_with("system."))
            .collect())
    }

    /// Round-trip to the server under the command timeout
    pub async fn ping(&self) -> MetricsResult<()> {
        self.bounded("ping", async { Ok(self.source()?.ping().await?) }).await
    }

    /// Storage, connection, opcounter, memory and uptime figures
    pub async fn database_stats(&self) -> MetricsResult<DatabaseStats> {
        self.bounded("database_stats", async {
            let source = self.source()?;
            let (stats, status) = tokio::try_join!(source.db_stats(), source.server_status())?;
            Ok(DatabaseStats::from_raw(source.database_name(), stats, status))
        })
        .await
    }

    /// Profiled operations slower than the configured threshold, newest first.
    /// Reads only: the profiler level is reported, never changed.
    pub async fn slow_queries(&self, limit: Option<usize>) -> MetricsResult<SlowQueryReport> {
        let limit = limit
            .filter(|l| *l > 0)
            .unwrap_or(self.settings.default_slow_query_limit);
        let threshold_ms = self.settings.slow_query_threshold_ms;

        self.bounded("slow_queries", async {
            let source = self.source()?;
            let profiling = source.profiling_status().await?;
            if profiling.level == ProfilingLevel::Off {
                debug!("profiler is off; reporting existing system.profile entries only");
            }

            let entries = source.slow_operations(threshold_ms, limit).await?;
            Ok(SlowQueryReport {
                profiling_level: profiling.level,
                threshold_ms,
                queries: entries.into_iter().map(Into::into).collect(),
            })
        })
        .await
    }

    /// Collections tripping at least one missing-index heuristic
    pub async fn missing_indexes(&self) -> MetricsResult<Vec<MissingIndexReport>> {
        self.bounded("missing_indexes", async {
            let source = self.source()?;
            let mut reports = Vec::new();

            for name in self.user_collections(source).await? {
                let (indexes, document_count) =
                    match tokio::try_join!(source.indexes(&name), source.document_count(&name)) {
                        Ok(found) => found,
                        Err(e) => {
                            warn!(collection = %name, error = %e, "skipping collection in index analysis");
                            continue;
                        }
                    };

                let recommendations =
                    index_recommendations(document_count, &indexes, &self.thresholds.indexes);
                if recommendations.is_empty() {
                    continue;
                }

                reports.push(MissingIndexReport {
                    collection: name,
                    document_count,
                    existing_indexes: indexes.into_iter().map(|i| i.name).collect(),
                    recommendations,
                });
            }

            Ok(reports)
        })
        .await
    }

    /// One timed `findOne` per collection, slowest first
    pub async fn collection_latency(&self) -> MetricsResult<Vec<CollectionLatency>> {
        self.bounded("collection_latency", async {
            let source = self.source()?;
            let mut samples = Vec::new();

            for name in self.user_collections(source).await? {
                let started = Instant::now();
                if let Err(e) = source.find_one(&name).await {
                    warn!(collection = %name, error = %e, "latency probe failed");
                    continue;
                }
                let latency_ms = started.elapsed().as_millis() as u64;

                samples.push(CollectionLatency {
                    status: LatencyStatus::classify(latency_ms, &self.thresholds.latency),
                    collection: name,
                    latency_ms,
                });
            }

            samples.sort_by(|a, b| b.latency_ms.cmp(&a.latency_ms));
            Ok(samples)
        })
        .await
    }

    /// All four facets concurrently, folded into a scored snapshot.
    /// A failed facet contributes empty data and an `unavailable` entry.
    pub async fn health_summary(&self) -> MetricsResult<HealthSummary> {
        self.source()?;

        let (stats, slow, missing, latency) = tokio::join!(
            self.database_stats(),
            self.slow_queries(Some(self.settings.summary_slow_query_sample)),
            self.missing_indexes(),
            self.collection_latency(),
        );

        let mut unavailable = Vec::new();
        let db_stats = settle(Facet::DatabaseStats, stats, &mut unavailable);
        let slow_queries = settle(Facet::SlowQueries, slow, &mut unavailable)
            .map(|report| report.queries)
            .unwrap_or_default();
        let missing_indexes =
            settle(Facet::MissingIndexes, missing, &mut unavailable).unwrap_or_default();
        let collection_latency =
            settle(Facet::CollectionLatency, latency, &mut unavailable).unwrap_or_default();

        if !unavailable.is_empty() {
            warn!(failed = unavailable.len(), "health summary assembled with missing facets");
        }

        Ok(HealthSummary::assemble(
            db_stats,
            slow_queries,
            missing_indexes,
            collection_latency,
            unavailable,
        ))
    }

    pub async fn profiling_status(&self) -> MetricsResult<ProfilingStatus> {
        self.bounded("profiling_status", async {
            Ok(self.source()?.profiling_status().await?)
        })
        .await
    }

    pub async fn set_profiling(&self, level: ProfilingLevel, slow_ms: u64) -> MetricsResult<()> {
        self.bounded("set_profiling", async {
            Ok(self.source()?.set_profiling(level, slow_ms).await?)
        })
        .await
    }

    /// Scoped slow-operation profiling; see `ProfilingGuard`.
    /// A timed-out acquisition may already have reached the server, so the
    /// level read beforehand is written back before the timeout is returned.
    pub async fn profile(&self, slow_ms: u64) -> MetricsResult<ProfilingGuard> {
        let source = Arc::clone(self.source()?);
        let previous = self.profiling_status().await?;

        let result = self
            .bounded("profile", async {
                Ok(ProfilingGuard::acquire(Arc::clone(&source), slow_ms).await?)
            })
            .await;

        let timed_out = matches!(result, Err(MetricsError::Timeout { .. }));
        if timed_out && previous.level == ProfilingLevel::Off {
            let restore = source.set_profiling(previous.level, previous.slow_ms);
            match tokio::time::timeout(self.settings.command_timeout(), restore).await {
                Ok(Ok(())) => {
                    warn!(level = %previous.level, "profiling acquisition timed out; level restored")
                }
                Ok(Err(e)) => error!(error = %e, "failed to restore profiling level after timeout"),
                Err(_) => error!("restoring profiling level after timeout also timed out"),
            }
        }

        result
    }
}

fn settle<T>(
    facet: Facet,
    result: MetricsResult<T>,
    unavailable: &mut Vec<FacetFailure>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            unavailable.push(FacetFailure {
                facet,
                error: e.to_string(),
            });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::adapter::{MemoryCollection, MemorySource, SourceCall};

    fn collector(source: MemorySource) -> MetricsCollector {
        MetricsCollector::new(
            Some(Arc::new(source)),
            CollectorConfig::default(),
            HealthThresholds::default(),
        )
    }

    #[tokio::test]
    async fn test_not_connected() {
        let collector = MetricsCollector::new(
            None,
            CollectorConfig::default(),
            HealthThresholds::default(),
        );

        assert!(!collector.is_connected());
        assert!(matches!(collector.database_stats().await, Err(MetricsError::NotConnected)));
        assert!(matches!(collector.health_summary().await, Err(MetricsError::NotConnected)));
        assert_eq!(
            collector.slow_queries(None).await.unwrap_err().to_string(),
            "Database connection not established"
        );
    }

    #[tokio::test]
    async fn test_system_collections_are_ignored() {
        let collector = collector(
            MemorySource::new("qms")
                .with_collection(MemoryCollection::new("system.profile", 5_000))
                .with_collection(MemoryCollection::new("system.views", 5_000))
                .with_collection(MemoryCollection::new("audits", 20)),
        );

        assert!(collector.missing_indexes().await.unwrap().is_empty());
        let latency = collector.collection_latency().await.unwrap();
        assert_eq!(latency.len(), 1);
        assert_eq!(latency[0].collection, "audits");
    }

    #[tokio::test]
    async fn test_database_stats_failure_is_tagged() {
        let collector = collector(MemorySource::new("qms").failing(SourceCall::ServerStatus));
        let err = collector.database_stats().await.unwrap_err();
        assert!(matches!(err, MetricsError::Source(SourceError::Injected(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_profile_restores_level() {
        let memory = Arc::new(
            MemorySource::new("qms").with_profiling_ack_delay(Duration::from_secs(5)),
        );
        let collector = MetricsCollector::new(
            Some(memory.clone() as Arc<dyn MetricsSource>),
            CollectorConfig {
                command_timeout_ms: 1_000,
                ..Default::default()
            },
            HealthThresholds::default(),
        );

        let err = collector.profile(150).await.err().unwrap();
        assert_eq!(err.to_string(), "profile timed out after 1000ms");
        assert_eq!(
            memory.current_profiling(),
            ProfilingStatus { level: ProfilingLevel::Off, slow_ms: 100 }
        );
    }

    #[tokio::test]
    async fn test_profile_leaves_active_profiler_alone() {
        let memory = Arc::new(MemorySource::new("qms").with_profiling(ProfilingLevel::All, 20));
        let collector = MetricsCollector::new(
            Some(memory.clone() as Arc<dyn MetricsSource>),
            CollectorConfig::default(),
            HealthThresholds::default(),
        );

        let guard = collector.profile(150).await.unwrap();
        assert!(!guard.changed());
        guard.release().await.unwrap();
        assert_eq!(memory.profiling_writes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_reported() {
        let collector = MetricsCollector::new(
            Some(Arc::new(MemorySource::new("qms").with_collection(
                MemoryCollection::new("documents", 10).with_latency(Duration::from_secs(60)),
            ))),
            CollectorConfig {
                command_timeout_ms: 1_000,
                ..Default::default()
            },
            HealthThresholds::default(),
        );

        let err = collector.collection_latency().await.unwrap_err();
        assert_eq!(err.to_string(), "collection_latency timed out after 1000ms");
    }
}
