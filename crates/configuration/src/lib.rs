use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{
    Config, DatabaseSettings, DiagnosticsPair, LoggingSettings, Overrides, QualitySettings,
    ReconciliationSettings, ReportSettings,
};

/// Environment variables with this prefix override file values, using `__`
/// between sections: `PRICERECON__QUALITY__MAX_LATENCY_HOURS=24`.
pub const ENV_PREFIX: &str = "PRICERECON";

/// Loads the application configuration.
///
/// Reads `path` when given (it must exist), otherwise an optional
/// `config.toml` in the working directory, then overlays environment
/// variables. The result is deserialized into our strongly-typed `Config`
/// and validated.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let file = match path {
        Some(path) => config::File::from(path).required(true),
        None => config::File::with_name("config").required(false),
    };

    let builder = config::Config::builder()
        .add_source(file)
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    tracing::debug!(?config, "Configuration loaded.");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::Frequency;
    use std::io::Write;

    #[test]
    fn loads_sections_from_a_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[quality]
expected_frequency = "weekly"
max_latency_hours = 12.5

[reconciliation]
price_delta_pct_threshold = 1.0

[diagnostics]
source_a = "INVESTING"
source_b = "STOOQ"
symbol = "AAPL"
"#
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(
            config.quality.expected_frequency,
            Frequency::Unsupported("weekly".to_string())
        );
        assert_eq!(config.quality.max_latency_hours, 12.5);
        assert_eq!(config.quality.max_gap_days, 3);
        assert_eq!(config.reconciliation.price_delta_pct_threshold, 1.0);
        assert_eq!(config.reconciliation.return_delta_pct_threshold, 0.2);
        let pair = config.diagnostics.unwrap();
        assert_eq!(pair.source_a, "INVESTING");
        assert_eq!(pair.symbol.as_deref(), Some("AAPL"));
    }

    #[test]
    fn invalid_values_fail_validation() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[report]\nmax_detail_rows = 0").unwrap();
        assert!(matches!(
            load_config(Some(file.path())),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let result = load_config(Some(Path::new("/definitely/not/here/config.toml")));
        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }
}
