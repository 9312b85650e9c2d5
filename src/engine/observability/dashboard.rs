//! Health Dashboard Module
//!
//! Health score, status bands, latency classification and the
//! recommendations shown on the admin database-health page

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::report::{CollectionLatency, DatabaseStats, MissingIndexReport, SlowQuery};
use crate::engine::config::LatencyThresholds;

pub const PERFECT_SCORE: u8 = 100;
pub const SLOW_QUERY_PENALTY: u32 = 5;
pub const MISSING_INDEX_PENALTY: u32 = 10;
pub const SLOW_COLLECTION_PENALTY: u32 = 8;
/// Slow queries beyond this many do not lower the score further
pub const MAX_SCORED_SLOW_QUERIES: usize = 5;

/// Overall health status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Excellent,
    Good,
    Warning,
    Critical,
}

impl HealthStatus {
    /// `(80,100]` excellent, `(60,80]` good, `(40,60]` warning, else critical
    pub fn from_score(score: u8) -> Self {
        if score > 80 {
            HealthStatus::Excellent
        } else if score > 60 {
            HealthStatus::Good
        } else if score > 40 {
            HealthStatus::Warning
        } else {
            HealthStatus::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Excellent => "excellent",
            HealthStatus::Good => "good",
            HealthStatus::Warning => "warning",
            HealthStatus::Critical => "critical",
        }
    }
}

/// Latency band of a single `findOne` probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LatencyStatus {
    Good,
    Warning,
    Slow,
}

impl LatencyStatus {
    pub fn classify(latency_ms: u64, thresholds: &LatencyThresholds) -> Self {
        if latency_ms > thresholds.slow_ms {
            LatencyStatus::Slow
        } else if latency_ms >= thresholds.warning_ms {
            LatencyStatus::Warning
        } else {
            LatencyStatus::Good
        }
    }
}

/// Counts the score and recommendations are derived from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HealthInputs {
    pub slow_queries: usize,
    pub missing_indexes: usize,
    pub slow_collections: usize,
}

impl HealthInputs {
    pub fn score(&self) -> u8 {
        health_score(self.slow_queries, self.missing_indexes, self.slow_collections)
    }
}

/// 100 minus fixed penalties, floored at 0
pub fn health_score(slow_queries: usize, missing_indexes: usize, slow_collections: usize) -> u8 {
    let penalty = |count: usize, each: u32| (count as u64).saturating_mul(u64::from(each));

    let total = penalty(slow_queries.min(MAX_SCORED_SLOW_QUERIES), SLOW_QUERY_PENALTY)
        .saturating_add(penalty(missing_indexes, MISSING_INDEX_PENALTY))
        .saturating_add(penalty(slow_collections, SLOW_COLLECTION_PENALTY));

    u64::from(PERFECT_SCORE).saturating_sub(total) as u8
}

pub fn recommendations(inputs: &HealthInputs) -> Vec<String> {
    let mut out = Vec::new();

    if inputs.slow_queries > 0 {
        out.push(format!(
            "{} slow {} found in the profiler log. Review their plans with explain() and add indexes for the filtered fields.",
            inputs.slow_queries,
            plural(inputs.slow_queries, "query", "queries"),
        ));
    }

    if inputs.missing_indexes > 0 {
        out.push(format!(
            "{} {} missing recommended indexes. Create the suggested indexes to speed up tenant and date-range queries.",
            inputs.missing_indexes,
            plural(inputs.missing_indexes, "collection is", "collections are"),
        ));
    }

    if inputs.slow_collections > 0 {
        out.push(format!(
            "{} {} slowly to a single-document read. Check working-set size against available memory and index coverage.",
            inputs.slow_collections,
            plural(inputs.slow_collections, "collection responds", "collections respond"),
        ));
    }

    if out.is_empty() {
        out.push("Database performance looks healthy. No action required.".to_string());
    }

    out
}

fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 {
        one
    } else {
        many
    }
}

/// Sub-metric of the health summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Facet {
    DatabaseStats,
    SlowQueries,
    MissingIndexes,
    CollectionLatency,
}

/// A facet that failed and was replaced by empty data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetFailure {
    pub facet: Facet,
    pub error: String,
}

/// Point-in-time health snapshot; rebuilt on every request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSummary {
    pub timestamp: DateTime<Utc>,
    pub health_score: u8,
    pub status: HealthStatus,
    pub db_stats: Option<DatabaseStats>,
    pub slow_queries: Vec<SlowQuery>,
    pub missing_indexes: Vec<MissingIndexReport>,
    pub collection_latency: Vec<CollectionLatency>,
    pub recommendations: Vec<String>,
    pub unavailable: Vec<FacetFailure>,
}

impl HealthSummary {
    pub fn assemble(
        db_stats: Option<DatabaseStats>,
        slow_queries: Vec<SlowQuery>,
        missing_indexes: Vec<MissingIndexReport>,
        collection_latency: Vec<CollectionLatency>,
        unavailable: Vec<FacetFailure>,
    ) -> Self {
        let inputs = HealthInputs {
            slow_queries: slow_queries.len(),
            missing_indexes: missing_indexes.len(),
            slow_collections: collection_latency
                .iter()
                .filter(|c| c.status == LatencyStatus::Slow)
                .count(),
        };
        let health_score = inputs.score();

        Self {
            timestamp: Utc::now(),
            health_score,
            status: HealthStatus::from_score(health_score),
            db_stats,
            slow_queries,
            missing_indexes,
            collection_latency,
            recommendations: recommendations(&inputs),
            unavailable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_score_penalties() {
        assert_eq!(health_score(0, 0, 0), 100);
        assert_eq!(health_score(1, 0, 0), 95);
        assert_eq!(health_score(0, 1, 0), 90);
        assert_eq!(health_score(0, 0, 1), 92);
        assert_eq!(health_score(2, 1, 1), 72);
    }

    #[test]
    fn test_health_score_caps_slow_queries_and_floors_at_zero() {
        assert_eq!(health_score(5, 0, 0), 75);
        assert_eq!(health_score(50, 0, 0), 75);
        assert_eq!(health_score(5, 10, 10), 0);
        assert_eq!(health_score(usize::MAX, usize::MAX, usize::MAX), 0);
    }

    #[test]
    fn test_status_partition() {
        assert_eq!(HealthStatus::from_score(100), HealthStatus::Excellent);
        assert_eq!(HealthStatus::from_score(81), HealthStatus::Excellent);
        assert_eq!(HealthStatus::from_score(80), HealthStatus::Good);
        assert_eq!(HealthStatus::from_score(61), HealthStatus::Good);
        assert_eq!(HealthStatus::from_score(60), HealthStatus::Warning);
        assert_eq!(HealthStatus::from_score(41), HealthStatus::Warning);
        assert_eq!(HealthStatus::from_score(40), HealthStatus::Critical);
        assert_eq!(HealthStatus::from_score(0), HealthStatus::Critical);
    }

    #[test]
    fn test_status_is_monotonic_over_whole_range() {
        let rank = |s: HealthStatus| match s {
            HealthStatus::Critical => 0,
            HealthStatus::Warning => 1,
            HealthStatus::Good => 2,
            HealthStatus::Excellent => 3,
        };
        let mut previous = 0;
        for score in 0..=100u8 {
            let current = rank(HealthStatus::from_score(score));
            assert!(current >= previous);
            previous = current;
        }
    }

    #[test]
    fn test_latency_classification() {
        let thresholds = LatencyThresholds::default();
        assert_eq!(LatencyStatus::classify(0, &thresholds), LatencyStatus::Good);
        assert_eq!(LatencyStatus::classify(49, &thresholds), LatencyStatus::Good);
        assert_eq!(LatencyStatus::classify(50, &thresholds), LatencyStatus::Warning);
        assert_eq!(LatencyStatus::classify(100, &thresholds), LatencyStatus::Warning);
        assert_eq!(LatencyStatus::classify(101, &thresholds), LatencyStatus::Slow);
    }

    #[test]
    fn test_recommendations() {
        let healthy = recommendations(&HealthInputs::default());
        assert_eq!(healthy.len(), 1);
        assert!(healthy[0].contains("healthy"));

        let inputs = HealthInputs {
            slow_queries: 1,
            missing_indexes: 2,
            slow_collections: 0,
        };
        let recs = recommendations(&inputs);
        assert_eq!(recs.len(), 2);
        assert!(recs[0].starts_with("1 slow query "));
        assert!(recs[1].starts_with("2 collections are missing"));
    }

    #[test]
    fn test_assemble_counts_only_slow_collections() {
        let latency = vec![
            CollectionLatency {
                collection: "audits".to_string(),
                latency_ms: 180,
                status: LatencyStatus::Slow,
            },
            CollectionLatency {
                collection: "findings".to_string(),
                latency_ms: 70,
                status: LatencyStatus::Warning,
            },
        ];

        let summary = HealthSummary::assemble(None, vec![], vec![], latency, vec![]);
        assert_eq!(summary.health_score, 92);
        assert_eq!(summary.status, HealthStatus::Excellent);
        assert_eq!(summary.recommendations.len(), 1);
        assert!(summary.recommendations[0].starts_with("1 collection responds"));
    }
}
