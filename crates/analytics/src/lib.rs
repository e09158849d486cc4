//! # Quality Diagnostics and Reconciliation Engine
//!
//! This crate audits a snapshot of the canonical price ledger and measures
//! how well independent sources agree on the same instruments.
//!
//! ## Architectural Principles
//!
//! - **Pure logic:** no I/O and no knowledge of the database. It depends
//!   only on `core-types`.
//! - **Stateless calculation:** the engines take a `LedgerSnapshot` and
//!   return a report. Degenerate statistics come back as `NaN`, never as
//!   an error.
//!
//! ## Public API
//!
//! - `LedgerSnapshot`: parsed, ordered observations plus every skipped row.
//! - `QualityEngine` / `QualityReport`: duplicates, calendar gaps, latency.
//! - `ReconciliationEngine` / `ReconciliationReport`: level and return
//!   agreement across sources, plus `BiasDiagnosis` for one source pair.

pub mod accessor;
pub mod bias;
pub mod duplicates;
pub mod engine;
pub mod error;
pub mod gaps;
pub mod latency;
pub mod levels;
pub mod report;
pub mod returns;
pub mod stats;

pub use accessor::{LedgerSnapshot, RowOutcome, SkipScope, SkippedRow};
pub use bias::BiasDiagnosis;
pub use duplicates::{DuplicateAudit, DuplicateGroup};
pub use engine::{QualityEngine, QualityParams, ReconciliationEngine, ReconciliationParams};
pub use error::AnalyticsError;
pub use gaps::{GapDetection, GapRange};
pub use latency::LatencyStats;
pub use levels::LevelPair;
pub use report::{QualityReport, ReconciliationReport};
pub use returns::ReturnPair;
pub use stats::Distribution;
