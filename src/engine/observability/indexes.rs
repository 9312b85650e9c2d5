//! Missing-index heuristics
//!
//! Three fixed rules over a collection's document count and index list.
//! Rules are independent: a large collection can trip all three.

use super::report::{IndexRecommendation, Priority};
use crate::engine::adapter::IndexInfo;
use crate::engine::config::IndexThresholds;

pub fn index_recommendations(
    document_count: u64,
    indexes: &[IndexInfo],
    thresholds: &IndexThresholds,
) -> Vec<IndexRecommendation> {
    let mut out = Vec::new();
    let indexed = |field: &str| indexes.iter().any(|index| index.covers(field));

    let tenant = thresholds.tenant_field.as_str();
    if document_count > thresholds.tenant_min_documents && !indexed(tenant) {
        out.push(IndexRecommendation {
            fields: vec![tenant.to_string()],
            reason: format!(
                "{} documents and no index on {}; every tenant-scoped query scans the collection",
                document_count, tenant
            ),
            suggested_index: format!("{{ {}: 1 }}", tenant),
            priority: Priority::High,
        });
    }

    let timestamp_fields = &thresholds.timestamp_fields;
    if document_count > thresholds.timestamp_min_documents
        && !timestamp_fields.is_empty()
        && !timestamp_fields.iter().any(|f| indexed(f.as_str()))
    {
        out.push(IndexRecommendation {
            fields: timestamp_fields.clone(),
            reason: format!(
                "{} documents and no index on any date field ({}); date-range queries and sorts scan the collection",
                document_count,
                timestamp_fields.join(", ")
            ),
            suggested_index: format!("{{ {}: -1 }}", timestamp_fields[0]),
            priority: Priority::Medium,
        });
    }

    if document_count > thresholds.id_only_min_documents && indexes.len() == 1 {
        let date_field = timestamp_fields.first().map(String::as_str).unwrap_or("_id");
        out.push(IndexRecommendation {
            fields: vec!["_id".to_string()],
            reason: format!(
                "{} documents served by the _id index alone; review query patterns for compound indexes",
                document_count
            ),
            suggested_index: format!("{{ {}: 1, {}: -1 }}", tenant, date_field),
            priority: Priority::Low,
        });
    }

    out
}
