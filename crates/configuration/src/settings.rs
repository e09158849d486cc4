use crate::error::ConfigError;
use core_types::Frequency;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The root configuration structure for the entire application.
///
/// Every section has defaults, so an empty or missing `config.toml` is valid.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseSettings,
    pub quality: QualitySettings,
    pub reconciliation: ReconciliationSettings,
    pub report: ReportSettings,
    /// The source pair examined by the bias diagnostic, if one is designated.
    pub diagnostics: Option<DiagnosticsPair>,
    pub logging: LoggingSettings,
}

/// Where the canonical ledger lives.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// SQLite connection URL. `DATABASE_URL` takes precedence when set.
    pub url: String,
    pub max_connections: u32,
}

/// Thresholds for the quality audit.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QualitySettings {
    /// Only `daily` is supported; anything else disables gap detection.
    pub expected_frequency: Frequency,
    /// Ingestion delay above which an observation counts as a violation (strict).
    pub max_latency_hours: f64,
    /// Informational: gap ranges longer than this are flagged, never filtered.
    pub max_gap_days: u32,
}

/// Thresholds for cross-source reconciliation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconciliationSettings {
    /// Symmetric percentage difference above which a level pair is an anomaly.
    pub price_delta_pct_threshold: f64,
    /// Absolute return difference, in percentage points, above which a return pair is an anomaly.
    pub return_delta_pct_threshold: f64,
}

/// Output settings for the CSV writers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportSettings {
    pub output_dir: PathBuf,
    /// Detail sections are cut at this many rows; summary counts never are.
    pub max_detail_rows: usize,
}

/// A designated (source_a, source_b) pair for the bias diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DiagnosticsPair {
    pub source_a: String,
    pub source_b: String,
    #[serde(default)]
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive; `RUST_LOG` wins when set.
    pub level: String,
    /// When set, a daily rolling log file is written here as well.
    pub directory: Option<PathBuf>,
}

// --- Default Implementations ---

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://data/db/ledger.db".to_string(),
            max_connections: 4,
        }
    }
}

impl Default for QualitySettings {
    fn default() -> Self {
        Self {
            expected_frequency: Frequency::Daily,
            max_latency_hours: 48.0,
            max_gap_days: 3,
        }
    }
}

impl Default for ReconciliationSettings {
    fn default() -> Self {
        Self {
            price_delta_pct_threshold: 0.5,
            return_delta_pct_threshold: 0.2,
        }
    }
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("data/output"),
            max_detail_rows: 5000,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

/// Command-line overrides for individual settings.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "clap", derive(clap::Args))]
pub struct Overrides {
    /// Override `quality.expected_frequency`.
    #[cfg_attr(feature = "clap", arg(long, global = true))]
    pub expected_frequency: Option<String>,
    /// Override `quality.max_latency_hours`.
    #[cfg_attr(feature = "clap", arg(long, global = true))]
    pub max_latency_hours: Option<f64>,
    /// Override `quality.max_gap_days`.
    #[cfg_attr(feature = "clap", arg(long, global = true))]
    pub max_gap_days: Option<u32>,
    /// Override `reconciliation.price_delta_pct_threshold`.
    #[cfg_attr(feature = "clap", arg(long, global = true))]
    pub price_delta_pct_threshold: Option<f64>,
    /// Override `reconciliation.return_delta_pct_threshold`.
    #[cfg_attr(feature = "clap", arg(long, global = true))]
    pub return_delta_pct_threshold: Option<f64>,
    /// Override `report.output_dir`.
    #[cfg_attr(feature = "clap", arg(long, global = true))]
    pub output_dir: Option<PathBuf>,
}

impl Config {
    /// Applies command-line overrides and re-validates the result.
    pub fn apply_overrides(&mut self, overrides: &Overrides) -> Result<(), ConfigError> {
        if let Some(freq) = &overrides.expected_frequency {
            self.quality.expected_frequency = Frequency::from(freq.clone());
        }
        if let Some(v) = overrides.max_latency_hours {
            self.quality.max_latency_hours = v;
        }
        if let Some(v) = overrides.max_gap_days {
            self.quality.max_gap_days = v;
        }
        if let Some(v) = overrides.price_delta_pct_threshold {
            self.reconciliation.price_delta_pct_threshold = v;
        }
        if let Some(v) = overrides.return_delta_pct_threshold {
            self.reconciliation.return_delta_pct_threshold = v;
        }
        if let Some(dir) = &overrides.output_dir {
            self.report.output_dir = dir.clone();
        }
        self.validate()
    }

    /// Rejects settings no computation could honour.
    ///
    /// An unsupported frequency is NOT an error here: it only disables gap
    /// detection, and the quality report says so.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_threshold("quality.max_latency_hours", self.quality.max_latency_hours)?;
        check_threshold(
            "reconciliation.price_delta_pct_threshold",
            self.reconciliation.price_delta_pct_threshold,
        )?;
        check_threshold(
            "reconciliation.return_delta_pct_threshold",
            self.reconciliation.return_delta_pct_threshold,
        )?;

        if self.report.max_detail_rows == 0 {
            return Err(ConfigError::ValidationError(
                "report.max_detail_rows must be at least 1".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "database.max_connections must be at least 1".to_string(),
            ));
        }
        if let Some(pair) = &self.diagnostics {
            if pair.source_a == pair.source_b {
                return Err(ConfigError::ValidationError(format!(
                    "diagnostics pair must name two different sources, got '{}' twice",
                    pair.source_a
                )));
            }
        }
        Ok(())
    }
}

fn check_threshold(name: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::ValidationError(format!(
            "{name} must be a finite, non-negative number (got {value})"
        )));
    }
    Ok(())
}
