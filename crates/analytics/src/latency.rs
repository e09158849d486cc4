use crate::accessor::LedgerSnapshot;
use core_types::{Observation, SeriesKey};
use serde::Serialize;
use std::collections::BTreeMap;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Ingestion delay of one observation in fractional hours. Negative when
/// the record was ingested before its event time; `None` without a usable
/// ingest timestamp.
pub fn latency_hours(obs: &Observation) -> Option<f64> {
    let ingest_time = obs.ingest_time?;
    Some((ingest_time - obs.event_time).num_milliseconds() as f64 / MILLIS_PER_HOUR)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencyStats {
    pub count: usize,
    pub avg_hours: f64,
    pub max_hours: f64,
    pub violation_count: usize,
}

impl LatencyStats {
    pub fn has_violations(&self) -> bool {
        self.violation_count > 0
    }
}

/// Running latency statistics for one (source, symbol) group.
#[derive(Debug, Clone)]
pub struct LatencyAccumulator {
    threshold_hours: f64,
    count: usize,
    avg: f64,
    max: Option<f64>,
    violations: usize,
}

impl LatencyAccumulator {
    pub fn new(threshold_hours: f64) -> Self {
        Self {
            threshold_hours,
            count: 0,
            avg: 0.0,
            max: None,
            violations: 0,
        }
    }

    pub fn push(&mut self, latency: f64) {
        self.count += 1;
        self.avg += (latency - self.avg) / self.count as f64;
        self.max = Some(self.max.map_or(latency, |m| m.max(latency)));
        if latency > self.threshold_hours {
            self.violations += 1;
        }
    }

    pub fn finish(&self) -> LatencyStats {
        LatencyStats {
            count: self.count,
            avg_hours: if self.count == 0 { f64::NAN } else { self.avg },
            max_hours: self.max.unwrap_or(f64::NAN),
            violation_count: self.violations,
        }
    }
}

/// Latency statistics per (source, symbol) series. Observations without an
/// ingest timestamp are left out; the snapshot lists them as skipped.
pub fn profile_latency(
    snapshot: &LedgerSnapshot,
    max_latency_hours: f64,
) -> BTreeMap<SeriesKey, LatencyStats> {
    let mut accumulators: BTreeMap<SeriesKey, LatencyAccumulator> = BTreeMap::new();
    for obs in snapshot.observations() {
        let Some(latency) = latency_hours(obs) else {
            continue;
        };
        accumulators
            .entry(obs.series_key())
            .or_insert_with(|| LatencyAccumulator::new(max_latency_hours))
            .push(latency);
    }

    accumulators
        .into_iter()
        .map(|(key, acc)| {
            let stats = acc.finish();
            if stats.has_violations() {
                tracing::debug!(
                    series = %key,
                    violations = stats.violation_count,
                    max_hours = stats.max_hours,
                    "Latency threshold exceeded."
                );
            }
            (key, stats)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::fixtures::{obs, snapshot};
    use chrono::Duration;

    fn delayed(source: &str, day: &str, delay: Duration) -> Observation {
        let mut o = obs(source, "AAPL", day, 100.0);
        o.ingest_time = Some(o.event_time + delay);
        o
    }

    #[test]
    fn threshold_is_strict() {
        let snap = snapshot(vec![
            delayed("A", "2024-01-01", Duration::hours(48)),
            delayed("B", "2024-01-01", Duration::hours(48) + Duration::seconds(36)),
        ]);
        let stats = profile_latency(&snap, 48.0);

        let a = stats[&SeriesKey::new("A", "AAPL")];
        assert_eq!(a.max_hours, 48.0);
        assert_eq!(a.violation_count, 0);

        let b = stats[&SeriesKey::new("B", "AAPL")];
        assert!((b.max_hours - 48.01).abs() < 1e-9);
        assert_eq!(b.violation_count, 1);
    }

    #[test]
    fn streaming_mean_matches_batch_mean() {
        let snap = snapshot(vec![
            delayed("A", "2024-01-01", Duration::hours(1)),
            delayed("A", "2024-01-02", Duration::hours(2)),
            delayed("A", "2024-01-03", Duration::minutes(270)),
        ]);
        let stats = profile_latency(&snap, 48.0)[&SeriesKey::new("A", "AAPL")];

        assert_eq!(stats.count, 3);
        assert!((stats.avg_hours - 2.5).abs() < 1e-9);
        assert_eq!(stats.max_hours, 4.5);
    }

    #[test]
    fn observations_without_ingest_time_are_left_out() {
        let mut unknown = obs("A", "AAPL", "2024-01-02", 100.0);
        unknown.ingest_time = None;
        let snap = snapshot(vec![delayed("A", "2024-01-01", Duration::hours(2)), unknown]);

        let stats = profile_latency(&snap, 48.0)[&SeriesKey::new("A", "AAPL")];
        assert_eq!(stats.count, 1);
        assert_eq!(stats.max_hours, 2.0);
    }

    #[test]
    fn negative_latencies_keep_a_negative_max() {
        let mut acc = LatencyAccumulator::new(48.0);
        acc.push(-3.0);
        acc.push(-1.5);
        let stats = acc.finish();

        assert_eq!(stats.max_hours, -1.5);
        assert!((stats.avg_hours + 2.25).abs() < 1e-9);
        assert!(!stats.has_violations());
    }

    #[test]
    fn empty_accumulator_is_nan() {
        let stats = LatencyAccumulator::new(48.0).finish();
        assert_eq!(stats.count, 0);
        assert!(stats.avg_hours.is_nan() && stats.max_hours.is_nan());
    }
}
