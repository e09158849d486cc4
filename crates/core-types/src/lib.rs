pub mod checksum;
pub mod enums;
pub mod error;
pub mod parse;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use checksum::content_checksum;
pub use enums::Frequency;
pub use error::CoreError;
pub use parse::{parse_price, parse_timestamp};
pub use structs::{
    NewObservation, Observation, ObservationFilter, ObservationKey, RawObservation, SeriesKey,
};
