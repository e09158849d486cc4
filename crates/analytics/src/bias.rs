//! Scale-bias diagnosis for one designated source pair.
//!
//! The diagnosis separates a constant multiplicative offset from noise: if
//! dividing `price_a` by the median ratio `k` collapses the percentage
//! differences towards zero, the disagreement is systematic. It only reports
//! numbers; stored prices are never adjusted.

use crate::levels::LevelPair;
use crate::stats::{Distribution, median, pearson, sym_pct_diff};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BiasDiagnosis {
    pub source_a: String,
    pub source_b: String,
    pub symbol: Option<String>,
    pub pairs: usize,
    pub raw: Distribution,
    /// Median of `price_a / price_b` over pairs with `price_b ≠ 0`.
    pub ratio_k: f64,
    pub debiased: Distribution,
    pub return_correlation: f64,
}

/// One paired observation, oriented as (source_a, source_b).
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct OrientedPair<'a> {
    pub symbol: &'a str,
    pub price_a: f64,
    pub price_b: f64,
}

/// Orients the level pairs between `source_a` and `source_b`, keeping their
/// (symbol, ts) order.
pub(crate) fn orient<'a>(
    level_pairs: &'a [LevelPair],
    source_a: &str,
    source_b: &str,
    symbol: Option<&str>,
) -> Vec<OrientedPair<'a>> {
    level_pairs
        .iter()
        .filter(|lp| symbol.is_none_or(|s| lp.symbol == s))
        .filter_map(|lp| {
            let (price_a, price_b) = lp.oriented(source_a, source_b)?;
            Some(OrientedPair {
                symbol: &lp.symbol,
                price_a,
                price_b,
            })
        })
        .collect()
}

pub(crate) fn diagnose(
    pairs: &[OrientedPair<'_>],
    source_a: &str,
    source_b: &str,
    symbol: Option<&str>,
) -> BiasDiagnosis {
    let raw: Vec<f64> = pairs.iter().map(|p| sym_pct_diff(p.price_a, p.price_b)).collect();

    let ratios: Vec<f64> = pairs
        .iter()
        .filter(|p| p.price_b != 0.0)
        .map(|p| p.price_a / p.price_b)
        .collect();
    let ratio_k = median(&ratios);

    let debiased = if ratio_k.is_finite() && ratio_k != 0.0 {
        let adjusted: Vec<f64> = pairs
            .iter()
            .map(|p| sym_pct_diff(p.price_a / ratio_k, p.price_b))
            .collect();
        Distribution::from_values(&adjusted)
    } else {
        Distribution::empty()
    };

    BiasDiagnosis {
        source_a: source_a.to_string(),
        source_b: source_b.to_string(),
        symbol: symbol.map(str::to_string),
        pairs: pairs.len(),
        raw: Distribution::from_values(&raw),
        ratio_k,
        debiased,
        return_correlation: paired_return_correlation(pairs),
    }
}

/// Pearson correlation of the pair's step returns, taken over consecutive
/// pairs of the same symbol. A step counts only when both priors are
/// non-zero.
fn paired_return_correlation(pairs: &[OrientedPair<'_>]) -> f64 {
    let (ret_a, ret_b): (Vec<f64>, Vec<f64>) = pairs
        .windows(2)
        .filter(|w| w[0].symbol == w[1].symbol)
        .filter(|w| w[0].price_a != 0.0 && w[0].price_b != 0.0)
        .map(|w| (w[1].price_a / w[0].price_a - 1.0, w[1].price_b / w[0].price_b - 1.0))
        .unzip();
    pearson(&ret_a, &ret_b)
}
