//! # Summary Aggregation
//!
//! Reduces one run's per-dependency records into a single dated totals
//! record. The fold is pure and order-independent; records missing a
//! metric field contribute zero for it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::drift::DependencyMetricRecord;

/// One run's totals for a tracked entry. These are the elements of the
/// persisted history sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Total drift across all dependencies, in libyears.
    pub drift: f64,
    /// Total pulse across all dependencies, in libyears.
    pub pulse: f64,
    /// Timestamp taken at aggregation time.
    pub date: DateTime<Utc>,
    /// Count of yesterday's merged `[BUMP]` pull requests, attached by the
    /// enrichment step when a search token is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_bump_pull_requests: Option<u64>,
}

/// Sum `drift` and `pulse` across `records`, stamping the current time.
pub fn aggregate(records: &[DependencyMetricRecord]) -> Summary {
    aggregate_at(records, Utc::now())
}

/// Aggregation with an explicit timestamp, for deterministic tests.
pub fn aggregate_at(records: &[DependencyMetricRecord], date: DateTime<Utc>) -> Summary {
    Summary {
        drift: records.iter().map(|r| r.drift.unwrap_or(0.0)).sum(),
        pulse: records.iter().map(|r| r.pulse.unwrap_or(0.0)).sum(),
        date,
        merged_bump_pull_requests: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(drift: Option<f64>, pulse: Option<f64>) -> DependencyMetricRecord {
        DependencyMetricRecord {
            drift,
            pulse,
            extra: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_aggregate_sums_fields() {
        let records = vec![
            record(Some(1.0), Some(2.0)),
            record(Some(3.0), Some(1.0)),
            record(None, None),
        ];
        let summary = aggregate(&records);
        assert_eq!(summary.drift, 4.0);
        assert_eq!(summary.pulse, 3.0);
        assert_eq!(summary.merged_bump_pull_requests, None);
    }

    #[test]
    fn test_aggregate_missing_fields_count_as_zero() {
        let records = vec![record(Some(0.5), None), record(None, Some(0.25))];
        let summary = aggregate(&records);
        assert_eq!(summary.drift, 0.5);
        assert_eq!(summary.pulse, 0.25);
    }

    #[test]
    fn test_aggregate_empty_list_yields_zeros() {
        let summary = aggregate(&[]);
        assert_eq!(summary.drift, 0.0);
        assert_eq!(summary.pulse, 0.0);
    }

    #[test]
    fn test_aggregate_is_order_independent() {
        let mut records = vec![
            record(Some(1.25), Some(0.5)),
            record(Some(2.5), None),
            record(None, Some(3.0)),
        ];
        let forward = aggregate(&records);
        records.reverse();
        let reversed = aggregate(&records);
        assert_eq!(forward.drift, reversed.drift);
        assert_eq!(forward.pulse, reversed.pulse);
    }

    #[test]
    fn test_summary_serializes_camel_case() {
        let summary = Summary {
            drift: 1.0,
            pulse: 2.0,
            date: "2023-02-01T00:00:00Z".parse().unwrap(),
            merged_bump_pull_requests: Some(4),
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["mergedBumpPullRequests"], 4);
        assert!(json.get("merged_bump_pull_requests").is_none());
    }

    #[test]
    fn test_summary_omits_absent_enrichment() {
        let summary = aggregate(&[]);
        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("mergedBumpPullRequests"));
    }
}
