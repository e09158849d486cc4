//! Terminal summaries.

use crate::kpi::KpiSummary;
use crate::quality::quality_summary;
use crate::reconciliation::reconciliation_summary;
use crate::sections::{MetricRow, fmt_fixed};
use analytics::{BiasDiagnosis, Distribution, QualityReport, ReconciliationReport};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn metrics_table(rows: &[MetricRow]) -> Table {
    let mut table = new_table(vec!["Metric", "Value", "Notes"]);
    for row in rows {
        table.add_row(vec![row.metric.to_string(), row.value.clone(), row.notes.clone()]);
    }
    table
}

pub fn quality_table(report: &QualityReport) -> Table {
    metrics_table(&quality_summary(report))
}

pub fn reconciliation_table(report: &ReconciliationReport) -> Table {
    metrics_table(&reconciliation_summary(report))
}

pub fn kpi_table(summary: &KpiSummary) -> Table {
    let mut table = new_table(vec!["Metric", "Value"]);
    for (metric, value) in summary.rows() {
        table.add_row(vec![metric.to_string(), value]);
    }
    table
}

fn distribution_row(label: &str, d: &Distribution) -> Vec<String> {
    vec![
        label.to_string(),
        d.count.to_string(),
        fmt_fixed(d.median, 4),
        fmt_fixed(d.mean, 4),
        fmt_fixed(d.p95, 4),
    ]
}

pub fn bias_table(diagnosis: &BiasDiagnosis) -> Table {
    let mut table = new_table(vec!["pct_diff", "Count", "Median", "Mean", "p95"]);
    table.add_row(distribution_row("raw", &diagnosis.raw));
    table.add_row(distribution_row(
        &format!("de-biased (k = {})", fmt_fixed(diagnosis.ratio_k, 6)),
        &diagnosis.debiased,
    ));
    table.add_row(vec![
        "return correlation".to_string(),
        diagnosis.pairs.to_string(),
        fmt_fixed(diagnosis.return_correlation, 4),
        String::new(),
        String::new(),
    ]);
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bias_table_shows_nan_for_undefined_values() {
        let diagnosis = BiasDiagnosis {
            source_a: "A".to_string(),
            source_b: "B".to_string(),
            symbol: None,
            pairs: 0,
            raw: Distribution::empty(),
            ratio_k: f64::NAN,
            debiased: Distribution::empty(),
            return_correlation: f64::NAN,
        };
        let rendered = bias_table(&diagnosis).to_string();

        assert!(rendered.contains("k = nan"));
        assert!(rendered.contains("return correlation"));
    }

    #[test]
    fn kpi_table_lists_every_metric() {
        let summary = KpiSummary {
            total_raw_rows: 10,
            duplicate_rows: 0,
            pairs_compared: 4,
            anomalies_over_threshold: 1,
            anomaly_rate_pct: 25.0,
        };
        let rendered = kpi_table(&summary).to_string();
        for (metric, _) in summary.rows() {
            assert!(rendered.contains(metric), "missing {metric}");
        }
    }
}
