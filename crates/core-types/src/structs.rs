use crate::checksum::content_checksum;
use crate::error::CoreError;
use crate::parse::{parse_price, parse_timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A ledger row exactly as stored, before any parsing.
///
/// `event_time`, `ingest_time` and `price` are kept as text so that malformed
/// values survive the fetch and can be reported instead of vanishing inside a
/// driver-level decode error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RawObservation {
    pub id: Option<i64>,
    pub source: String,
    pub symbol: String,
    pub asset_class: String,
    pub event_time: String,
    pub price: Option<String>,
    pub currency: Option<String>,
    pub ingest_time: String,
    pub content_checksum: Option<String>,
}

/// A canonical, fully parsed price observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub source: String,
    pub symbol: String,
    pub asset_class: String,
    pub event_time: DateTime<Utc>,
    pub price: f64,
    pub currency: Option<String>,
    /// `None` when the stored ingest timestamp is malformed. Such a row still
    /// carries a usable price; only latency needs this field.
    pub ingest_time: Option<DateTime<Utc>>,
    pub content_checksum: Option<String>,
}

impl Observation {
    pub fn key(&self) -> ObservationKey {
        ObservationKey {
            source: self.source.clone(),
            symbol: self.symbol.clone(),
            event_time: self.event_time,
        }
    }

    pub fn series_key(&self) -> SeriesKey {
        SeriesKey::new(&self.source, &self.symbol)
    }
}

impl RawObservation {
    pub fn parse_event_time(&self) -> Result<DateTime<Utc>, CoreError> {
        parse_timestamp("event_time", &self.event_time)
    }

    pub fn parse_ingest_time(&self) -> Result<DateTime<Utc>, CoreError> {
        parse_timestamp("ingest_time", &self.ingest_time)
    }

    pub fn parse_price(&self) -> Result<f64, CoreError> {
        parse_price(self.price.as_deref())
    }

    /// Builds the observation once `event_time` and `price` are known.
    pub fn to_observation(
        &self,
        event_time: DateTime<Utc>,
        price: f64,
        ingest_time: Option<DateTime<Utc>>,
    ) -> Observation {
        Observation {
            source: self.source.clone(),
            symbol: self.symbol.clone(),
            asset_class: self.asset_class.clone(),
            event_time,
            price,
            currency: self.currency.clone(),
            ingest_time,
            content_checksum: self.content_checksum.clone(),
        }
    }
}

/// Fails only on `event_time` or `price`. A malformed `ingest_time` leaves
/// the field `None`.
impl TryFrom<&RawObservation> for Observation {
    type Error = CoreError;

    fn try_from(raw: &RawObservation) -> Result<Self, Self::Error> {
        let event_time = raw.parse_event_time()?;
        let price = raw.parse_price()?;
        Ok(raw.to_observation(event_time, price, raw.parse_ingest_time().ok()))
    }
}

/// A normalized record on its way into the ledger.
///
/// `event_time` is the ISO-8601 text the normalizer produced; the ledger's
/// uniqueness constraint applies to that text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewObservation {
    pub source: String,
    pub symbol: String,
    pub asset_class: String,
    pub event_time: String,
    pub price: f64,
    pub currency: Option<String>,
    pub source_file: Option<String>,
}

impl NewObservation {
    pub fn checksum(&self) -> String {
        content_checksum(
            &self.source,
            &self.symbol,
            &self.asset_class,
            &self.event_time,
            self.price,
            self.currency.as_deref(),
        )
    }
}

/// The logical identity of an observation: (source, symbol, event_time).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ObservationKey {
    pub source: String,
    pub symbol: String,
    pub event_time: DateTime<Utc>,
}

/// One feed's series for one instrument.
///
/// Serialized as `"source/symbol"` so it can key JSON maps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "String")]
pub struct SeriesKey {
    pub source: String,
    pub symbol: String,
}

impl SeriesKey {
    pub fn new(source: &str, symbol: &str) -> Self {
        Self {
            source: source.to_string(),
            symbol: symbol.to_string(),
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.source, self.symbol)
    }
}

impl From<SeriesKey> for String {
    fn from(key: SeriesKey) -> Self {
        key.to_string()
    }
}

/// Optional selection criteria for a ledger read. The time range is
/// inclusive at both ends and applies to `event_time`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationFilter {
    pub symbol: Option<String>,
    pub source: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl ObservationFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn between(mut self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    /// Whether a raw row passes the text-level criteria (symbol, source).
    pub fn matches_raw(&self, raw: &RawObservation) -> bool {
        self.symbol.as_deref().is_none_or(|s| s == raw.symbol)
            && self.source.as_deref().is_none_or(|s| s == raw.source)
    }

    pub fn contains_time(&self, event_time: DateTime<Utc>) -> bool {
        self.from.is_none_or(|from| event_time >= from) && self.to.is_none_or(|to| event_time <= to)
    }

    pub fn matches(&self, obs: &Observation) -> bool {
        self.symbol.as_deref().is_none_or(|s| s == obs.symbol)
            && self.source.as_deref().is_none_or(|s| s == obs.source)
            && self.contains_time(obs.event_time)
    }
}
