use crate::accessor::LedgerSnapshot;
use core_types::ObservationKey;
use serde::Serialize;
use std::collections::BTreeMap;

/// A logical key held by more than one ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub key: ObservationKey,
    pub size: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DuplicateAudit {
    /// Σ(size − 1) over every group of size > 1.
    pub duplicate_row_count: usize,
    pub groups: Vec<DuplicateGroup>,
}

/// Counts rows sharing a parsed (source, symbol, event_time) key. Rows
/// rejected for a bad price still count when their key parsed.
///
/// Nothing is resolved: the audit only reports what it finds.
pub fn audit_duplicates(snapshot: &LedgerSnapshot) -> DuplicateAudit {
    let keys = snapshot
        .observations()
        .iter()
        .map(|obs| obs.key())
        .chain(snapshot.rejected().filter_map(|row| row.key()));

    let mut sizes: BTreeMap<ObservationKey, usize> = BTreeMap::new();
    for key in keys {
        *sizes.entry(key).or_default() += 1;
    }

    let groups: Vec<DuplicateGroup> = sizes
        .into_iter()
        .filter(|(_, size)| *size > 1)
        .map(|(key, size)| DuplicateGroup { key, size })
        .collect();
    let duplicate_row_count = groups.iter().map(|g| g.size - 1).sum();

    if duplicate_row_count > 0 {
        tracing::warn!(
            duplicate_row_count,
            groups = groups.len(),
            "Ledger holds logically duplicated keys."
        );
    }

    DuplicateAudit {
        duplicate_row_count,
        groups,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::fixtures::{obs, snapshot};
    use core_types::{ObservationFilter, RawObservation};

    #[test]
    fn counts_every_extra_row_in_a_group() {
        let snap = snapshot(vec![
            obs("STOOQ", "AAPL", "2024-01-01", 185.5),
            obs("STOOQ", "AAPL", "2024-01-01", 185.7),
            obs("STOOQ", "AAPL", "2024-01-01", 185.9),
            obs("STOOQ", "AAPL", "2024-01-02", 186.0),
            obs("INVESTING", "AAPL", "2024-01-02", 186.0),
            obs("INVESTING", "AAPL", "2024-01-02", 186.1),
        ]);
        let audit = audit_duplicates(&snap);

        assert_eq!(audit.duplicate_row_count, 3);
        assert_eq!(audit.groups.len(), 2);
        let sum: usize = audit.groups.iter().map(|g| g.size - 1).sum();
        assert_eq!(sum, audit.duplicate_row_count);
        assert_eq!(audit.groups[0].key.source, "INVESTING");
        assert_eq!(audit.groups[1].size, 3);
    }

    #[test]
    fn rows_with_a_bad_price_still_hold_their_key() {
        let row = |id: i64, price: &str, event_time: &str| RawObservation {
            id: Some(id),
            source: "STOOQ".to_string(),
            symbol: "AAPL".to_string(),
            asset_class: "equity".to_string(),
            event_time: event_time.to_string(),
            price: Some(price.to_string()),
            currency: None,
            ingest_time: "2024-01-02T00:00:00Z".to_string(),
            content_checksum: None,
        };
        let rows = vec![
            row(1, "185.5", "2024-01-01"),
            row(2, "n/a", "2024-01-01"),
            row(3, "186.0", "not-a-date"),
        ];
        let snap = LedgerSnapshot::from_raw(&rows, &ObservationFilter::new());
        let audit = audit_duplicates(&snap);

        assert_eq!(snap.observations().len(), 1);
        assert_eq!(audit.duplicate_row_count, 1);
        assert_eq!(audit.groups[0].size, 2);
    }

    #[test]
    fn clean_ledger_has_no_duplicates() {
        let snap = snapshot(vec![
            obs("STOOQ", "AAPL", "2024-01-01", 1.0),
            obs("STOOQ", "MSFT", "2024-01-01", 1.0),
            obs("EIA", "AAPL", "2024-01-01", 1.0),
        ]);
        assert_eq!(audit_duplicates(&snap), DuplicateAudit::default());
    }
}
