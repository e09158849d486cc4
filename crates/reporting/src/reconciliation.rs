use crate::error::ReportError;
use crate::sections::{MetricRow, SectionWriter, create_report_file, fmt_fixed, fmt_ts};
use analytics::ReconciliationReport;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const RECONCILIATION_REPORT_FILE: &str = "reconciliation_report.csv";

pub fn reconciliation_summary(report: &ReconciliationReport) -> Vec<MetricRow> {
    vec![
        MetricRow::new(
            "total_pairs_compared",
            report.total_level_pairs,
            "Pairs across distinct sources on the same (symbol, ts)",
        ),
        MetricRow::new(
            "anomalies_over_threshold_levels",
            report.level_anomaly_count(),
            format!("Levels threshold: {}% (symmetric)", report.price_delta_pct_threshold),
        ),
        MetricRow::new(
            "returns_pairs_compared",
            report.total_return_pairs,
            "Pairs of day-over-day returns on the same (symbol, ts)",
        ),
        MetricRow::new(
            "anomalies_over_threshold_returns",
            report.return_anomaly_count(),
            format!(
                "Returns threshold: {} pct-pts (abs diff)",
                report.return_delta_pct_threshold
            ),
        ),
        MetricRow::new(
            "returns_correlation",
            fmt_fixed(report.return_correlation, 4),
            "Pearson correlation of returns (scale-invariant)",
        ),
    ]
}

/// Writes the summary block, then level anomalies and return anomalies.
pub fn write_reconciliation_csv<W: Write>(
    report: &ReconciliationReport,
    out: W,
    max_detail_rows: usize,
) -> Result<W, ReportError> {
    let mut writer = SectionWriter::new(out);
    writer.summary(&reconciliation_summary(report))?;

    let levels = writer.section(
        &["symbol", "ts", "source_a", "price_a", "source_b", "price_b", "pct_diff"],
        report.level_anomalies.iter().map(|p| {
            vec![
                p.symbol.clone(),
                fmt_ts(&p.ts),
                p.source_a.clone(),
                p.price_a.to_string(),
                p.source_b.clone(),
                p.price_b.to_string(),
                fmt_fixed(p.pct_diff, 6),
            ]
        }),
        Some(max_detail_rows),
    )?;

    let returns = writer.section(
        &["symbol", "ts", "source_a", "ret_a_pct", "source_b", "ret_b_pct", "abs_diff_pct"],
        report.return_anomalies.iter().map(|p| {
            vec![
                p.symbol.clone(),
                fmt_ts(&p.ts),
                p.source_a.clone(),
                fmt_fixed(p.ret_a, 6),
                p.source_b.clone(),
                fmt_fixed(p.ret_b, 6),
                fmt_fixed(p.abs_diff_pp, 6),
            ]
        }),
        Some(max_detail_rows),
    )?;

    if levels < report.level_anomaly_count() || returns < report.return_anomaly_count() {
        tracing::info!(
            max_detail_rows,
            level_anomalies = report.level_anomaly_count(),
            return_anomalies = report.return_anomaly_count(),
            "Anomaly detail truncated; summary counts are complete."
        );
    }
    writer.finish()
}

/// Writes `reconciliation_report.csv` into `output_dir`.
pub fn write_reconciliation_report(
    report: &ReconciliationReport,
    output_dir: &Path,
    max_detail_rows: usize,
) -> Result<PathBuf, ReportError> {
    let (path, file) = create_report_file(output_dir, RECONCILIATION_REPORT_FILE)?;
    write_reconciliation_csv(report, file, max_detail_rows)?;
    tracing::info!(path = %path.display(), "Wrote reconciliation report.");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::read_metrics_block;
    use analytics::{LevelPair, ReturnPair};
    use chrono::{TimeZone, Utc};

    fn report(anomalies: usize) -> ReconciliationReport {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let level = |i: usize| LevelPair {
            symbol: "AAPL".to_string(),
            ts,
            source_a: "A".to_string(),
            price_a: 100.0 + i as f64,
            source_b: "B".to_string(),
            price_b: 110.0,
            pct_diff: 5.0,
        };
        ReconciliationReport {
            total_level_pairs: 10,
            level_anomalies: (0..anomalies).map(level).collect(),
            price_delta_pct_threshold: 0.5,
            total_return_pairs: 4,
            return_anomalies: vec![ReturnPair {
                symbol: "AAPL".to_string(),
                ts,
                source_a: "A".to_string(),
                ret_a: 1.5,
                source_b: "B".to_string(),
                ret_b: 1.0,
                abs_diff_pp: 0.5,
            }],
            return_delta_pct_threshold: 0.2,
            return_correlation: f64::NAN,
            unparseable_rows: 0,
        }
    }

    #[test]
    fn summary_counts_survive_truncation() {
        let out = write_reconciliation_csv(&report(3), Vec::new(), 2).unwrap();
        let text = String::from_utf8(out).unwrap();
        let block = read_metrics_block(text.as_bytes()).unwrap();

        assert_eq!(block.count("total_pairs_compared").unwrap(), 10);
        assert_eq!(block.count("anomalies_over_threshold_levels").unwrap(), 3);
        assert_eq!(block.count("returns_pairs_compared").unwrap(), 4);
        assert_eq!(block.count("anomalies_over_threshold_returns").unwrap(), 1);
        assert_eq!(block.get("returns_correlation"), Some("nan"));

        assert_eq!(text.matches("AAPL,2024-01-02T00:00:00Z,A,10").count(), 2);
        assert!(text.contains("AAPL,2024-01-02T00:00:00Z,A,100,B,110,5.000000\n"));
        assert!(!text.contains(",A,102,B,"));
        assert!(text.contains("AAPL,2024-01-02T00:00:00Z,A,1.500000,B,1.000000,0.500000\n"));
    }

    #[test]
    fn writes_into_the_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("out");
        let path = write_reconciliation_report(&report(0), &nested, 5000).unwrap();

        assert_eq!(path, nested.join(RECONCILIATION_REPORT_FILE));
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.starts_with("metric,value,notes\ntotal_pairs_compared,10,"));
    }
}
