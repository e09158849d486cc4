//! Calendar gap detection under the daily frequency policy: every calendar
//! day between the first and last observed date is expected. Weekends and
//! holidays are not excluded.

use crate::accessor::LedgerSnapshot;
use chrono::NaiveDate;
use core_types::Frequency;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// A closed run of consecutive missing dates in one source's series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GapRange {
    pub source: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub length_days: i64,
    pub exceeds_max_gap: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GapDetection {
    Enabled,
    /// The configured frequency has no calendar policy.
    Disabled { frequency: String },
}

/// Missing dates between the first and last of `dates`, collapsed into
/// `(start, end, length)` runs. Order and duplicates in the input do not
/// matter.
pub fn missing_ranges(dates: &BTreeSet<NaiveDate>) -> Vec<(NaiveDate, NaiveDate, i64)> {
    let mut ranges = Vec::new();
    let mut iter = dates.iter();
    let Some(mut prev) = iter.next().copied() else {
        return ranges;
    };

    for &date in iter {
        let missing = (date - prev).num_days() - 1;
        if missing > 0 {
            if let (Some(start), Some(end)) = (prev.succ_opt(), date.pred_opt()) {
                ranges.push((start, end, missing));
            }
        }
        prev = date;
    }
    ranges
}

/// Gap ranges grouped by symbol, sorted by (source, start) within each.
///
/// Returns `Disabled` with no ranges when the frequency is unsupported.
pub fn detect_gaps(
    snapshot: &LedgerSnapshot,
    frequency: &Frequency,
    max_gap_days: u32,
) -> (GapDetection, BTreeMap<String, Vec<GapRange>>) {
    let mut gaps: BTreeMap<String, Vec<GapRange>> = BTreeMap::new();

    if !frequency.is_supported() {
        tracing::warn!(%frequency, "Unsupported frequency; gap detection disabled.");
        return (
            GapDetection::Disabled {
                frequency: frequency.to_string(),
            },
            gaps,
        );
    }

    for (key, series) in snapshot.series() {
        let dates: BTreeSet<NaiveDate> = series.iter().map(|o| o.event_time.date_naive()).collect();
        let ranges = missing_ranges(&dates);
        if ranges.is_empty() {
            continue;
        }
        tracing::debug!(series = %key, ranges = ranges.len(), "Found calendar gaps.");

        gaps.entry(key.symbol.clone())
            .or_default()
            .extend(ranges.into_iter().map(|(start, end, length_days)| GapRange {
                source: key.source.clone(),
                start,
                end,
                length_days,
                exceeds_max_gap: length_days > i64::from(max_gap_days),
            }));
    }

    for ranges in gaps.values_mut() {
        ranges.sort_by(|a, b| (&a.source, a.start).cmp(&(&b.source, b.start)));
    }
    (GapDetection::Enabled, gaps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::fixtures::{obs, snapshot};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn single_interior_run_is_one_range() {
        let snap = snapshot(vec![
            obs("A", "AAPL", "2024-01-01", 100.0),
            obs("A", "AAPL", "2024-01-05", 101.0),
        ]);
        let (status, gaps) = detect_gaps(&snap, &Frequency::Daily, 3);

        assert_eq!(status, GapDetection::Enabled);
        assert_eq!(
            gaps["AAPL"],
            vec![GapRange {
                source: "A".to_string(),
                start: d("2024-01-02"),
                end: d("2024-01-04"),
                length_days: 3,
                exceeds_max_gap: false,
            }]
        );
    }

    #[test]
    fn single_missing_day_has_equal_bounds() {
        let dates: BTreeSet<NaiveDate> = [d("2024-01-01"), d("2024-01-03")].into();
        assert_eq!(missing_ranges(&dates), vec![(d("2024-01-02"), d("2024-01-02"), 1)]);
    }

    #[test]
    fn zero_or_one_date_has_no_gaps() {
        assert!(missing_ranges(&BTreeSet::new()).is_empty());
        assert!(missing_ranges(&[d("2024-01-01")].into()).is_empty());
    }

    #[test]
    fn ranges_and_observed_dates_rebuild_the_calendar() {
        let have: BTreeSet<NaiveDate> = ["2024-01-01", "2024-01-02", "2024-01-06", "2024-01-08", "2024-01-20"]
            .into_iter()
            .map(d)
            .collect();
        let ranges = missing_ranges(&have);

        let mut rebuilt = have.clone();
        let mut last_end: Option<NaiveDate> = None;
        for (start, end, length) in &ranges {
            assert!(start <= end);
            assert_eq!((*end - *start).num_days() + 1, *length);
            assert!(last_end.is_none_or(|prev| prev < *start), "ranges overlap or are unsorted");
            last_end = Some(*end);
            for day in start.iter_days().take_while(|day| day <= end) {
                assert!(rebuilt.insert(day), "{day} is both observed and missing");
            }
        }

        let first = d("2024-01-01");
        let expected: BTreeSet<NaiveDate> = first.iter_days().take(20).collect();
        assert_eq!(rebuilt, expected);
    }

    #[test]
    fn intraday_duplicates_collapse_to_one_date() {
        let mut late = obs("A", "AAPL", "2024-01-02", 100.0);
        late.event_time += chrono::Duration::hours(15);
        let snap = snapshot(vec![
            obs("A", "AAPL", "2024-01-01", 100.0),
            obs("A", "AAPL", "2024-01-02", 100.0),
            late,
            obs("A", "AAPL", "2024-01-03", 100.0),
        ]);
        let (_, gaps) = detect_gaps(&snap, &Frequency::Daily, 3);
        assert!(gaps.is_empty());
    }

    #[test]
    fn ranges_are_grouped_by_symbol_and_sorted_by_source() {
        let snap = snapshot(vec![
            obs("STOOQ", "AAPL", "2024-01-01", 1.0),
            obs("STOOQ", "AAPL", "2024-01-10", 1.0),
            obs("INVESTING", "AAPL", "2024-01-01", 1.0),
            obs("INVESTING", "AAPL", "2024-01-03", 1.0),
            obs("EIA", "WTI", "2024-01-01", 70.0),
            obs("EIA", "WTI", "2024-01-02", 70.0),
        ]);
        let (_, gaps) = detect_gaps(&snap, &Frequency::Daily, 3);

        assert_eq!(gaps.len(), 1);
        let aapl = &gaps["AAPL"];
        assert_eq!(aapl[0].source, "INVESTING");
        assert!(!aapl[0].exceeds_max_gap);
        assert_eq!(aapl[1].source, "STOOQ");
        assert_eq!(aapl[1].length_days, 8);
        assert!(aapl[1].exceeds_max_gap);
    }

    #[test]
    fn unsupported_frequency_disables_detection() {
        let snap = snapshot(vec![
            obs("A", "AAPL", "2024-01-01", 100.0),
            obs("A", "AAPL", "2024-01-05", 101.0),
        ]);
        let (status, gaps) = detect_gaps(&snap, &Frequency::from("weekly".to_string()), 3);

        assert_eq!(
            status,
            GapDetection::Disabled {
                frequency: "weekly".to_string()
            }
        );
        assert!(gaps.is_empty());
    }
}
