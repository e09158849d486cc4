//! # Report Writers
//!
//! Serializes quality and reconciliation reports to CSV, reads back their
//! leading summary blocks, aggregates the KPI summary, and renders terminal
//! tables. No algorithmic content lives here.
//!
//! Every report file starts with a `metric,value,notes` block followed by a
//! blank line. Consumers read only that block.

pub mod error;
pub mod kpi;
pub mod metrics;
pub mod quality;
pub mod reconciliation;
pub mod sections;
pub mod table;

pub use error::ReportError;
pub use kpi::{KPI_SUMMARY_FILE, KpiSummary, write_kpi_summary};
pub use metrics::{MetricBlock, read_metrics_block, read_metrics_file};
pub use quality::{QUALITY_REPORT_FILE, write_quality_report};
pub use reconciliation::{RECONCILIATION_REPORT_FILE, write_reconciliation_report};
pub use table::{bias_table, kpi_table, quality_table, reconciliation_table};
