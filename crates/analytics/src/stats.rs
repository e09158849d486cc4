//! Numeric helpers shared by the reconcilers and the bias diagnostic.
//!
//! Degenerate inputs (empty samples, zero variance) yield `f64::NAN`, never
//! a panic or an error.

use serde::Serialize;

/// Symmetric percentage difference: `200 × |a − b| / (|a| + |b|)`.
///
/// Zero when both values are exactly zero. Always within `[0, 200]` for
/// finite inputs; the operands are scaled by the larger magnitude first so
/// extreme values cannot overflow.
pub fn sym_pct_diff(a: f64, b: f64) -> f64 {
    if a == 0.0 && b == 0.0 {
        return 0.0;
    }
    let scale = a.abs().max(b.abs());
    let (a, b) = (a / scale, b / scale);
    200.0 * (a - b).abs() / (a.abs() + b.abs())
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn median(values: &[f64]) -> f64 {
    percentile(values, 0.5)
}

/// Percentile by linear interpolation between closest ranks.
///
/// `q` is a fraction in `[0, 1]`. A single sample is its own percentile.
/// The result never leaves `[min, max]` of the sample.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() || !(0.0..=1.0).contains(&q) {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = q * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let weight = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * weight
}

/// Pearson correlation of two equally long samples.
///
/// `NaN` when the lengths differ, fewer than two points exist, or either
/// side is constant.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len();
    if n != y.len() || n < 2 || is_constant(x) || is_constant(y) {
        return f64::NAN;
    }

    let mx = mean(x);
    let my = mean(y);
    let (mut num, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mx;
        let dy = yi - my;
        num += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    let den = sxx.sqrt() * syy.sqrt();
    if den == 0.0 {
        return f64::NAN;
    }
    (num / den).clamp(-1.0, 1.0)
}

// Constant means every value equal to the first, not near-zero variance.
fn is_constant(values: &[f64]) -> bool {
    values
        .first()
        .is_none_or(|first| values.iter().all(|v| v == first))
}

/// Summary of a sample of percentage differences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Distribution {
    pub count: usize,
    pub median: f64,
    pub mean: f64,
    pub p95: f64,
}

impl Distribution {
    pub fn from_values(values: &[f64]) -> Self {
        Self {
            count: values.len(),
            median: median(values),
            mean: mean(values),
            p95: percentile(values, 0.95),
        }
    }

    pub fn empty() -> Self {
        Self::from_values(&[])
    }
}
