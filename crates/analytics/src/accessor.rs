//! The observation accessor: a parsed, ordered, read-only view over one
//! ledger snapshot.

use chrono::{DateTime, Utc};
use core_types::{
    CoreError, Observation, ObservationFilter, ObservationKey, RawObservation, SeriesKey,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// The result of parsing one ledger row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Parsed(Observation),
    /// Price and event time parsed but the ingest timestamp did not. The
    /// observation serves every computation except latency.
    MissingIngestTime(Observation, SkippedRow),
    Skipped(SkippedRow),
}

/// Which computations a malformed row is left out of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipScope {
    /// Bad `event_time` or `price`: out of every price computation.
    Row,
    /// Bad `ingest_time` only: out of the latency profile.
    Latency,
}

/// A row with a malformed field, with enough context to find it again.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRow {
    pub row_id: Option<i64>,
    pub source: String,
    pub symbol: String,
    /// Set whenever `event_time` itself parsed.
    pub event_time: Option<DateTime<Utc>>,
    pub scope: SkipScope,
    #[serde(serialize_with = "serialize_reason")]
    pub reason: CoreError,
}

impl SkippedRow {
    fn new(
        raw: &RawObservation,
        event_time: Option<DateTime<Utc>>,
        scope: SkipScope,
        reason: CoreError,
    ) -> Self {
        Self {
            row_id: raw.id,
            source: raw.source.clone(),
            symbol: raw.symbol.clone(),
            event_time,
            scope,
            reason,
        }
    }

    /// The logical key, when the event time is known.
    pub fn key(&self) -> Option<ObservationKey> {
        self.event_time.map(|event_time| ObservationKey {
            source: self.source.clone(),
            symbol: self.symbol.clone(),
            event_time,
        })
    }
}

fn serialize_reason<S: serde::Serializer>(reason: &CoreError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(reason)
}

/// Parses one ledger row field by field into an explicit outcome.
pub fn classify(raw: &RawObservation) -> RowOutcome {
    let event_time = match raw.parse_event_time() {
        Ok(t) => t,
        Err(reason) => {
            return RowOutcome::Skipped(SkippedRow::new(raw, None, SkipScope::Row, reason));
        }
    };
    let price = match raw.parse_price() {
        Ok(p) => p,
        Err(reason) => {
            return RowOutcome::Skipped(SkippedRow::new(
                raw,
                Some(event_time),
                SkipScope::Row,
                reason,
            ));
        }
    };
    match raw.parse_ingest_time() {
        Ok(ingest_time) => {
            RowOutcome::Parsed(raw.to_observation(event_time, price, Some(ingest_time)))
        }
        Err(reason) => RowOutcome::MissingIngestTime(
            raw.to_observation(event_time, price, None),
            SkippedRow::new(raw, Some(event_time), SkipScope::Latency, reason),
        ),
    }
}

fn warn_skipped(row: &SkippedRow) {
    tracing::warn!(
        row_id = ?row.row_id,
        source = %row.source,
        symbol = %row.symbol,
        scope = ?row.scope,
        reason = %row.reason,
        "Skipping malformed ledger field."
    );
}

/// Parsed observations of one snapshot, ordered by (symbol, source,
/// event_time), plus every row with a malformed field.
#[derive(Debug, Clone, Default)]
pub struct LedgerSnapshot {
    observations: Vec<Observation>,
    skipped: Vec<SkippedRow>,
}

impl LedgerSnapshot {
    /// Builds a snapshot from raw ledger rows.
    ///
    /// Rows failing the symbol/source criteria are left out entirely. The
    /// time range applies to every row whose event time parsed; rows with
    /// an unknown event time are kept as skipped regardless of the range.
    pub fn from_raw(rows: &[RawObservation], filter: &ObservationFilter) -> Self {
        let mut observations = Vec::with_capacity(rows.len());
        let mut skipped = Vec::new();

        for raw in rows.iter().filter(|raw| filter.matches_raw(raw)) {
            match classify(raw) {
                RowOutcome::Parsed(obs) => {
                    if filter.matches(&obs) {
                        observations.push(obs);
                    }
                }
                RowOutcome::MissingIngestTime(obs, row) => {
                    if filter.matches(&obs) {
                        warn_skipped(&row);
                        observations.push(obs);
                        skipped.push(row);
                    }
                }
                RowOutcome::Skipped(row) => {
                    if row.event_time.is_none_or(|t| filter.contains_time(t)) {
                        warn_skipped(&row);
                        skipped.push(row);
                    }
                }
            }
        }

        let snapshot = Self::from_parts(observations, skipped);
        tracing::info!(
            parsed = snapshot.observations.len(),
            unparseable = snapshot.skipped.len(),
            "Ledger snapshot ready."
        );
        snapshot
    }

    /// Builds a snapshot from already-parsed observations.
    pub fn from_observations(observations: Vec<Observation>) -> Self {
        Self::from_parts(observations, Vec::new())
    }

    fn from_parts(mut observations: Vec<Observation>, skipped: Vec<SkippedRow>) -> Self {
        // Stable: ties keep ledger order.
        observations.sort_by(|a, b| {
            (&a.symbol, &a.source, a.event_time).cmp(&(&b.symbol, &b.source, b.event_time))
        });
        Self {
            observations,
            skipped,
        }
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn skipped(&self) -> &[SkippedRow] {
        &self.skipped
    }

    /// Skipped rows that are out of every price computation.
    pub fn rejected(&self) -> impl Iterator<Item = &SkippedRow> {
        self.skipped.iter().filter(|row| row.scope == SkipScope::Row)
    }

    /// Every row in the snapshot, parsed or not.
    pub fn total_rows(&self) -> usize {
        self.observations.len() + self.rejected().count()
    }

    /// Rows with at least one malformed field.
    pub fn unparseable_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_rows() == 0
    }

    /// Chronological series per (source, symbol).
    pub fn series(&self) -> BTreeMap<SeriesKey, Vec<&Observation>> {
        let mut series: BTreeMap<SeriesKey, Vec<&Observation>> = BTreeMap::new();
        for obs in &self.observations {
            series.entry(obs.series_key()).or_default().push(obs);
        }
        series
    }

    /// Observations sharing a (symbol, event_time), in source order.
    pub fn by_symbol_time(&self) -> BTreeMap<(&str, DateTime<Utc>), Vec<&Observation>> {
        let mut groups: BTreeMap<(&str, DateTime<Utc>), Vec<&Observation>> = BTreeMap::new();
        for obs in &self.observations {
            groups
                .entry((obs.symbol.as_str(), obs.event_time))
                .or_default()
                .push(obs);
        }
        groups
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::{Duration, NaiveDate};

    /// A day-granular observation ingested 24 hours after its event time.
    pub fn obs(source: &str, symbol: &str, day: &str, price: f64) -> Observation {
        let event_time = NaiveDate::parse_from_str(day, "%Y-%m-%d")
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc();
        Observation {
            source: source.to_string(),
            symbol: symbol.to_string(),
            asset_class: "equity".to_string(),
            event_time,
            price,
            currency: Some("USD".to_string()),
            ingest_time: Some(event_time + Duration::hours(24)),
            content_checksum: None,
        }
    }

    pub fn snapshot(observations: Vec<Observation>) -> LedgerSnapshot {
        LedgerSnapshot::from_observations(observations)
    }
}
