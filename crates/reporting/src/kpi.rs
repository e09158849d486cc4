use crate::error::ReportError;
use crate::metrics::{MetricBlock, read_metrics_file};
use crate::quality::QUALITY_REPORT_FILE;
use crate::reconciliation::RECONCILIATION_REPORT_FILE;
use crate::sections::{create_report_file, fmt_fixed};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const KPI_SUMMARY_FILE: &str = "kpi_summary.csv";

/// Headline numbers aggregated from the summary blocks of both reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSummary {
    pub total_raw_rows: u64,
    pub duplicate_rows: u64,
    pub pairs_compared: u64,
    pub anomalies_over_threshold: u64,
    /// `100 × anomalies / max(pairs, 1)`, rounded to two decimals.
    pub anomaly_rate_pct: f64,
}

impl KpiSummary {
    pub fn from_blocks(quality: &MetricBlock, reconciliation: &MetricBlock) -> Result<Self, ReportError> {
        let pairs_compared = reconciliation.count("total_pairs_compared")?;
        let anomalies_over_threshold = reconciliation.count("anomalies_over_threshold_levels")?;
        let rate = 100.0 * anomalies_over_threshold as f64 / pairs_compared.max(1) as f64;

        Ok(Self {
            total_raw_rows: quality.count("total_rows")?,
            duplicate_rows: quality.count("duplicate_rows")?,
            pairs_compared,
            anomalies_over_threshold,
            anomaly_rate_pct: (rate * 100.0).round() / 100.0,
        })
    }

    /// Reads both reports from `output_dir`. A missing report contributes
    /// zeros.
    pub fn from_output_dir(output_dir: &Path) -> Result<Self, ReportError> {
        let quality = read_metrics_file(&output_dir.join(QUALITY_REPORT_FILE))?;
        let reconciliation = read_metrics_file(&output_dir.join(RECONCILIATION_REPORT_FILE))?;
        Self::from_blocks(&quality, &reconciliation)
    }

    pub fn rows(&self) -> [(&'static str, String); 5] {
        [
            ("total_raw_rows", self.total_raw_rows.to_string()),
            ("duplicate_rows", self.duplicate_rows.to_string()),
            ("pairs_compared", self.pairs_compared.to_string()),
            ("anomalies_over_threshold", self.anomalies_over_threshold.to_string()),
            ("anomaly_rate_pct", fmt_fixed(self.anomaly_rate_pct, 2)),
        ]
    }
}

pub fn write_kpi_csv<W: Write>(summary: &KpiSummary, out: W) -> Result<W, ReportError> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(["metric", "value"])?;
    for (metric, value) in summary.rows() {
        wtr.write_record([metric, value.as_str()])?;
    }
    wtr.flush()?;
    wtr.into_inner().map_err(|e| ReportError::Write(e.into_error()))
}

/// Writes `kpi_summary.csv` into `output_dir`.
pub fn write_kpi_summary(summary: &KpiSummary, output_dir: &Path) -> Result<PathBuf, ReportError> {
    let (path, file) = create_report_file(output_dir, KPI_SUMMARY_FILE)?;
    write_kpi_csv(summary, file)?;
    tracing::info!(path = %path.display(), "Wrote KPI summary.");
    Ok(path)
}
