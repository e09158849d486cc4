use crate::accessor::SkippedRow;
use crate::duplicates::DuplicateGroup;
use crate::gaps::{GapDetection, GapRange};
use crate::latency::LatencyStats;
use crate::levels::LevelPair;
use crate::returns::ReturnPair;
use core_types::SeriesKey;
use serde::Serialize;
use std::collections::BTreeMap;

/// Ledger health for one snapshot: duplication, calendar gaps and
/// ingestion latency.
///
/// This struct is the output of the `QualityEngine` and the input of the
/// quality CSV writer and the terminal summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub total_rows: usize,
    pub unparseable_rows: usize,
    pub skipped: Vec<SkippedRow>,

    pub duplicate_row_count: usize,
    pub duplicate_groups: Vec<DuplicateGroup>,

    pub gap_detection: GapDetection,
    pub gaps: BTreeMap<String, Vec<GapRange>>,
    pub max_gap_days: u32,

    pub latency: BTreeMap<SeriesKey, LatencyStats>,
    pub max_latency_hours: f64,
}

impl QualityReport {
    pub fn symbols_with_gaps(&self) -> usize {
        self.gaps.values().filter(|ranges| !ranges.is_empty()).count()
    }

    /// Informational: ranges longer than `max_gap_days`. Nothing is filtered.
    pub fn gap_ranges_over_max(&self) -> usize {
        self.gaps
            .values()
            .flatten()
            .filter(|range| range.exceeds_max_gap)
            .count()
    }

    pub fn series_with_latency_violations(&self) -> usize {
        self.latency.values().filter(|s| s.has_violations()).count()
    }
}

/// Cross-source agreement for one snapshot.
///
/// Anomaly lists are complete; writers truncate detail rows, never the
/// totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationReport {
    pub total_level_pairs: usize,
    pub level_anomalies: Vec<LevelPair>,
    pub price_delta_pct_threshold: f64,

    pub total_return_pairs: usize,
    pub return_anomalies: Vec<ReturnPair>,
    pub return_delta_pct_threshold: f64,
    /// NaN when fewer than two return pairs exist or a side has no variance.
    pub return_correlation: f64,

    pub unparseable_rows: usize,
}

impl ReconciliationReport {
    pub fn level_anomaly_count(&self) -> usize {
        self.level_anomalies.len()
    }

    pub fn return_anomaly_count(&self) -> usize {
        self.return_anomalies.len()
    }
}
