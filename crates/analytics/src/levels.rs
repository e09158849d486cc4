use crate::accessor::LedgerSnapshot;
use crate::stats::sym_pct_diff;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Two sources' prices for one symbol at one timestamp.
///
/// `source_a` sorts strictly before `source_b`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelPair {
    pub symbol: String,
    pub ts: DateTime<Utc>,
    pub source_a: String,
    pub price_a: f64,
    pub source_b: String,
    pub price_b: f64,
    pub pct_diff: f64,
}

impl LevelPair {
    /// The pair's prices as `(price_of(first), price_of(second))`, or `None`
    /// when the pair is not between those two sources.
    pub fn oriented(&self, first: &str, second: &str) -> Option<(f64, f64)> {
        if self.source_a == first && self.source_b == second {
            Some((self.price_a, self.price_b))
        } else if self.source_a == second && self.source_b == first {
            Some((self.price_b, self.price_a))
        } else {
            None
        }
    }
}

/// Every cross-source pair sharing a (symbol, event_time), in
/// (symbol, ts, source_a, source_b) order.
///
/// Duplicate rows within one source each take part, the way a relational
/// self-join on the key would.
pub fn pair_levels(snapshot: &LedgerSnapshot) -> Vec<LevelPair> {
    let mut pairs = Vec::new();

    for ((symbol, ts), group) in snapshot.by_symbol_time() {
        for (i, a) in group.iter().enumerate() {
            for b in &group[i + 1..] {
                if a.source == b.source {
                    continue;
                }
                pairs.push(LevelPair {
                    symbol: symbol.to_string(),
                    ts,
                    source_a: a.source.clone(),
                    price_a: a.price,
                    source_b: b.source.clone(),
                    price_b: b.price,
                    pct_diff: sym_pct_diff(a.price, b.price),
                });
            }
        }
    }
    pairs
}
