use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Invalid timestamp in field '{field}': {value:?}")]
    InvalidTimestamp { field: &'static str, value: String },

    #[error("Non-numeric price: {0:?}")]
    InvalidPrice(String),

    #[error("Non-finite price: {0}")]
    NonFinitePrice(f64),

    #[error("Missing required field '{0}'")]
    MissingField(&'static str),
}
