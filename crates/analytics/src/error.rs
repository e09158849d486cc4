use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalyticsError {
    #[error("Invalid parameter '{name}': {value} (must be finite and non-negative)")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("A bias diagnosis needs two distinct sources, got '{0}' twice")]
    SameSource(String),
}
