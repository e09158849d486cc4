use crate::accessor::LedgerSnapshot;
use crate::bias::{self, BiasDiagnosis};
use crate::duplicates::audit_duplicates;
use crate::error::AnalyticsError;
use crate::gaps::detect_gaps;
use crate::latency::profile_latency;
use crate::levels::pair_levels;
use crate::report::{QualityReport, ReconciliationReport};
use crate::returns::{pair_returns, return_correlation};
use core_types::Frequency;

fn check_threshold(name: &'static str, value: f64) -> Result<(), AnalyticsError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(AnalyticsError::InvalidParameter { name, value })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QualityParams {
    pub expected_frequency: Frequency,
    pub max_latency_hours: f64,
    pub max_gap_days: u32,
}

impl Default for QualityParams {
    fn default() -> Self {
        Self {
            expected_frequency: Frequency::Daily,
            max_latency_hours: 48.0,
            max_gap_days: 3,
        }
    }
}

/// A stateless calculator for ledger health.
#[derive(Debug, Clone)]
pub struct QualityEngine {
    params: QualityParams,
}

impl QualityEngine {
    pub fn new(params: QualityParams) -> Result<Self, AnalyticsError> {
        check_threshold("max_latency_hours", params.max_latency_hours)?;
        Ok(Self { params })
    }

    /// Audits one snapshot for duplicates, calendar gaps and latency.
    pub fn calculate(&self, snapshot: &LedgerSnapshot) -> QualityReport {
        let duplicates = audit_duplicates(snapshot);
        let (gap_detection, gaps) = detect_gaps(
            snapshot,
            &self.params.expected_frequency,
            self.params.max_gap_days,
        );
        let latency = profile_latency(snapshot, self.params.max_latency_hours);

        let report = QualityReport {
            total_rows: snapshot.total_rows(),
            unparseable_rows: snapshot.unparseable_count(),
            skipped: snapshot.skipped().to_vec(),
            duplicate_row_count: duplicates.duplicate_row_count,
            duplicate_groups: duplicates.groups,
            gap_detection,
            gaps,
            max_gap_days: self.params.max_gap_days,
            latency,
            max_latency_hours: self.params.max_latency_hours,
        };

        tracing::info!(
            total_rows = report.total_rows,
            unparseable_rows = report.unparseable_rows,
            duplicate_rows = report.duplicate_row_count,
            symbols_with_gaps = report.symbols_with_gaps(),
            latency_violations = report.series_with_latency_violations(),
            "Quality report calculated."
        );
        report
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconciliationParams {
    pub price_delta_pct_threshold: f64,
    pub return_delta_pct_threshold: f64,
}

impl Default for ReconciliationParams {
    fn default() -> Self {
        Self {
            price_delta_pct_threshold: 0.5,
            return_delta_pct_threshold: 0.2,
        }
    }
}

/// A stateless calculator for cross-source agreement.
#[derive(Debug, Clone)]
pub struct ReconciliationEngine {
    params: ReconciliationParams,
}

impl ReconciliationEngine {
    pub fn new(params: ReconciliationParams) -> Result<Self, AnalyticsError> {
        check_threshold("price_delta_pct_threshold", params.price_delta_pct_threshold)?;
        check_threshold("return_delta_pct_threshold", params.return_delta_pct_threshold)?;
        Ok(Self { params })
    }

    /// Compares levels and returns across every source pair in the snapshot.
    pub fn calculate(&self, snapshot: &LedgerSnapshot) -> ReconciliationReport {
        let level_pairs = pair_levels(snapshot);
        let return_pairs = pair_returns(snapshot, &level_pairs);
        let correlation = return_correlation(&return_pairs);

        let total_level_pairs = level_pairs.len();
        let total_return_pairs = return_pairs.len();
        let level_anomalies: Vec<_> = level_pairs
            .into_iter()
            .filter(|p| p.pct_diff > self.params.price_delta_pct_threshold)
            .collect();
        let return_anomalies: Vec<_> = return_pairs
            .into_iter()
            .filter(|p| p.abs_diff_pp > self.params.return_delta_pct_threshold)
            .collect();

        let report = ReconciliationReport {
            total_level_pairs,
            level_anomalies,
            price_delta_pct_threshold: self.params.price_delta_pct_threshold,
            total_return_pairs,
            return_anomalies,
            return_delta_pct_threshold: self.params.return_delta_pct_threshold,
            return_correlation: correlation,
            unparseable_rows: snapshot.unparseable_count(),
        };

        tracing::info!(
            level_pairs = report.total_level_pairs,
            level_anomalies = report.level_anomaly_count(),
            return_pairs = report.total_return_pairs,
            return_anomalies = report.return_anomaly_count(),
            return_correlation = report.return_correlation,
            "Reconciliation report calculated."
        );
        report
    }

    /// Diagnoses scale bias between `source_a` and `source_b`, in that
    /// direction, optionally for one symbol.
    pub fn diagnose_bias(
        &self,
        snapshot: &LedgerSnapshot,
        source_a: &str,
        source_b: &str,
        symbol: Option<&str>,
    ) -> Result<BiasDiagnosis, AnalyticsError> {
        if source_a == source_b {
            return Err(AnalyticsError::SameSource(source_a.to_string()));
        }

        let level_pairs = pair_levels(snapshot);
        let pairs = bias::orient(&level_pairs, source_a, source_b, symbol);
        let diagnosis = bias::diagnose(&pairs, source_a, source_b, symbol);

        tracing::info!(
            source_a,
            source_b,
            symbol = symbol.unwrap_or("*"),
            pairs = diagnosis.pairs,
            ratio_k = diagnosis.ratio_k,
            "Bias diagnosis calculated."
        );
        Ok(diagnosis)
    }
}
