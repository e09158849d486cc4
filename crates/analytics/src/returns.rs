//! Day-over-day returns per series and their cross-source comparison.

use crate::accessor::LedgerSnapshot;
use crate::levels::LevelPair;
use crate::stats::pearson;
use chrono::{DateTime, Utc};
use core_types::{Observation, SeriesKey};
use serde::Serialize;
use std::collections::BTreeMap;

/// Returns in percent for one chronological series.
///
/// The first observation has no return, and neither does any step whose
/// prior price is zero, so the output is at most `len − 1` long.
pub fn build_returns(series: &[&Observation]) -> Vec<(DateTime<Utc>, f64)> {
    series
        .windows(2)
        .filter(|w| w[0].price != 0.0)
        .map(|w| (w[1].event_time, (w[1].price / w[0].price - 1.0) * 100.0))
        .collect()
}

/// Two sources' returns for one symbol at one timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnPair {
    pub symbol: String,
    pub ts: DateTime<Utc>,
    pub source_a: String,
    pub ret_a: f64,
    pub source_b: String,
    pub ret_b: f64,
    /// `|ret_a − ret_b|` in percentage points.
    pub abs_diff_pp: f64,
}

type ReturnIndex = BTreeMap<SeriesKey, BTreeMap<DateTime<Utc>, f64>>;

fn index_returns(snapshot: &LedgerSnapshot) -> ReturnIndex {
    snapshot
        .series()
        .into_iter()
        .map(|(key, series)| {
            // Last return at a duplicated timestamp wins.
            let by_ts: BTreeMap<_, _> = build_returns(&series).into_iter().collect();
            (key, by_ts)
        })
        .collect()
}

/// Return pairs for every level pair whose two sides both have a return at
/// that exact timestamp.
pub fn pair_returns(snapshot: &LedgerSnapshot, level_pairs: &[LevelPair]) -> Vec<ReturnPair> {
    let index = index_returns(snapshot);
    let lookup = |source: &str, symbol: &str, ts: &DateTime<Utc>| {
        index
            .get(&SeriesKey::new(source, symbol))
            .and_then(|by_ts| by_ts.get(ts))
            .copied()
    };

    level_pairs
        .iter()
        .filter_map(|lp| {
            let ret_a = lookup(&lp.source_a, &lp.symbol, &lp.ts)?;
            let ret_b = lookup(&lp.source_b, &lp.symbol, &lp.ts)?;
            Some(ReturnPair {
                symbol: lp.symbol.clone(),
                ts: lp.ts,
                source_a: lp.source_a.clone(),
                ret_a,
                source_b: lp.source_b.clone(),
                ret_b,
                abs_diff_pp: (ret_a - ret_b).abs(),
            })
        })
        .collect()
}

/// Pearson correlation of `ret_a` against `ret_b` pooled over every pair.
pub fn return_correlation(pairs: &[ReturnPair]) -> f64 {
    let (a, b): (Vec<f64>, Vec<f64>) = pairs.iter().map(|p| (p.ret_a, p.ret_b)).unzip();
    pearson(&a, &b)
}
