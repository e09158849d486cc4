use crate::error::ReportError;
use crate::sections::{MetricRow, SectionWriter, create_report_file, fmt_fixed, fmt_ts};
use analytics::{GapDetection, QualityReport, SkipScope};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const QUALITY_REPORT_FILE: &str = "quality_report.csv";

pub fn quality_summary(report: &QualityReport) -> Vec<MetricRow> {
    let gap_note = match &report.gap_detection {
        GapDetection::Enabled => format!(
            "Max allowed consecutive gap (days): {} (informational)",
            report.max_gap_days
        ),
        GapDetection::Disabled { frequency } => {
            format!("Gap detection disabled: unsupported frequency '{frequency}'")
        }
    };

    vec![
        MetricRow::new("total_rows", report.total_rows, "All rows in the ledger snapshot"),
        MetricRow::new(
            "unparseable_rows",
            report.unparseable_rows,
            "Rows with a malformed price or timestamp (see scope)",
        ),
        MetricRow::new(
            "duplicate_rows",
            report.duplicate_row_count,
            "Rows beyond one per (source, symbol, event_time)",
        ),
        MetricRow::new("symbols_with_gaps", report.symbols_with_gaps(), gap_note),
        MetricRow::new(
            "gap_ranges_over_max",
            report.gap_ranges_over_max(),
            format!("Missing ranges longer than {} days", report.max_gap_days),
        ),
        MetricRow::new(
            "sources_with_latency_violations",
            report.series_with_latency_violations(),
            format!("Threshold (hours): {}", report.max_latency_hours),
        ),
    ]
}

/// Writes the summary block, then latency, missing ranges, duplicate keys
/// and skipped rows.
pub fn write_quality_csv<W: Write>(
    report: &QualityReport,
    out: W,
    max_detail_rows: usize,
) -> Result<W, ReportError> {
    let mut writer = SectionWriter::new(out);
    writer.summary(&quality_summary(report))?;

    writer.section(
        &[
            "source",
            "symbol",
            "count",
            "latency_avg_hours",
            "latency_max_hours",
            "violations_over_threshold",
        ],
        report.latency.iter().map(|(key, stats)| {
            vec![
                key.source.clone(),
                key.symbol.clone(),
                stats.count.to_string(),
                fmt_fixed(stats.avg_hours, 2),
                fmt_fixed(stats.max_hours, 2),
                stats.violation_count.to_string(),
            ]
        }),
        Some(max_detail_rows),
    )?;

    let gap_rows = report.gaps.iter().flat_map(|(symbol, ranges)| {
        ranges.iter().map(move |range| {
            vec![
                symbol.clone(),
                range.source.clone(),
                format!("{}→{}", range.start, range.end),
                range.length_days.to_string(),
                range.exceeds_max_gap.to_string(),
            ]
        })
    });
    writer.section(
        &["symbol", "source", "missing_range", "days_missing", "exceeds_max_gap"],
        gap_rows,
        Some(max_detail_rows),
    )?;

    writer.section(
        &["source", "symbol", "event_time", "rows"],
        report.duplicate_groups.iter().map(|group| {
            vec![
                group.key.source.clone(),
                group.key.symbol.clone(),
                fmt_ts(&group.key.event_time),
                group.size.to_string(),
            ]
        }),
        Some(max_detail_rows),
    )?;

    writer.section(
        &["row_id", "source", "symbol", "scope", "reason"],
        report.skipped.iter().map(|row| {
            let scope = match row.scope {
                SkipScope::Row => "row",
                SkipScope::Latency => "latency",
            };
            vec![
                row.row_id.map(|id| id.to_string()).unwrap_or_default(),
                row.source.clone(),
                row.symbol.clone(),
                scope.to_string(),
                row.reason.to_string(),
            ]
        }),
        Some(max_detail_rows),
    )?;

    writer.finish()
}

/// Writes `quality_report.csv` into `output_dir`.
pub fn write_quality_report(
    report: &QualityReport,
    output_dir: &Path,
    max_detail_rows: usize,
) -> Result<PathBuf, ReportError> {
    let (path, file) = create_report_file(output_dir, QUALITY_REPORT_FILE)?;
    write_quality_csv(report, file, max_detail_rows)?;
    tracing::info!(path = %path.display(), "Wrote quality report.");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::read_metrics_file;
    use analytics::{DuplicateGroup, GapRange, LatencyStats, SkippedRow};
    use chrono::{NaiveDate, TimeZone, Utc};
    use core_types::{CoreError, ObservationKey, SeriesKey};
    use std::collections::BTreeMap;

    fn report() -> QualityReport {
        let day = |d: u32| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        let mut gaps = BTreeMap::new();
        gaps.insert(
            "AAPL".to_string(),
            vec![
                GapRange {
                    source: "A".to_string(),
                    start: day(2),
                    end: day(4),
                    length_days: 3,
                    exceeds_max_gap: false,
                },
                GapRange {
                    source: "B".to_string(),
                    start: day(2),
                    end: day(9),
                    length_days: 8,
                    exceeds_max_gap: true,
                },
            ],
        );
        let mut latency = BTreeMap::new();
        latency.insert(
            SeriesKey::new("A", "AAPL"),
            LatencyStats {
                count: 2,
                avg_hours: 30.0,
                max_hours: 49.5,
                violation_count: 1,
            },
        );

        QualityReport {
            total_rows: 6,
            unparseable_rows: 1,
            skipped: vec![SkippedRow {
                row_id: Some(7),
                source: "B".to_string(),
                symbol: "AAPL".to_string(),
                event_time: None,
                scope: SkipScope::Row,
                reason: CoreError::InvalidPrice("abc".to_string()),
            }],
            duplicate_row_count: 2,
            duplicate_groups: vec![DuplicateGroup {
                key: ObservationKey {
                    source: "A".to_string(),
                    symbol: "AAPL".to_string(),
                    event_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                },
                size: 3,
            }],
            gap_detection: GapDetection::Enabled,
            gaps,
            max_gap_days: 3,
            latency,
            max_latency_hours: 48.0,
        }
    }

    #[test]
    fn file_layout_and_summary_block() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_quality_report(&report(), dir.path(), 5000).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();

        let block = read_metrics_file(&path).unwrap();
        assert_eq!(block.len(), 6);
        assert_eq!(block.count("total_rows").unwrap(), 6);
        assert_eq!(block.count("unparseable_rows").unwrap(), 1);
        assert_eq!(block.count("duplicate_rows").unwrap(), 2);
        assert_eq!(block.count("symbols_with_gaps").unwrap(), 1);
        assert_eq!(block.count("gap_ranges_over_max").unwrap(), 1);
        assert_eq!(block.count("sources_with_latency_violations").unwrap(), 1);

        assert!(text.contains("\n\nsource,symbol,count,latency_avg_hours"));
        assert!(text.contains("A,AAPL,2,30.00,49.50,1\n"));
        assert!(text.contains("AAPL,A,2024-01-02→2024-01-04,3,false\n"));
        assert!(text.contains("AAPL,B,2024-01-02→2024-01-09,8,true\n"));
        assert!(text.contains("\n\nsource,symbol,event_time,rows\nA,AAPL,2024-01-01T00:00:00Z,3\n"));
        assert!(text.contains("7,B,AAPL,row,"));
    }

    #[test]
    fn detail_rows_are_truncated_but_counts_are_not() {
        let out = write_quality_csv(&report(), Vec::new(), 1).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("gap_ranges_over_max,1,"));
        assert!(text.contains("2024-01-02→2024-01-04"));
        assert!(!text.contains("2024-01-02→2024-01-09"));
    }

    #[test]
    fn disabled_gap_detection_is_noted() {
        let mut report = report();
        report.gap_detection = GapDetection::Disabled {
            frequency: "weekly".to_string(),
        };
        report.gaps.clear();

        let rows = quality_summary(&report);
        let gaps = rows.iter().find(|r| r.metric == "symbols_with_gaps").unwrap();
        assert_eq!(gaps.value, "0");
        assert!(gaps.notes.contains("'weekly'"));
    }
}
