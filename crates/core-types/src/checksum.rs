use sha2::{Digest, Sha256};

/// Computes the content checksum the ledger writer uses to suppress
/// byte-identical re-inserts.
///
/// The digest covers the pipe-joined canonical fields in a fixed order.
/// A missing currency hashes as an empty string.
pub fn content_checksum(
    source: &str,
    symbol: &str,
    asset_class: &str,
    event_time: &str,
    price: f64,
    currency: Option<&str>,
) -> String {
    let payload = format!(
        "{source}|{symbol}|{asset_class}|{event_time}|{price}|{}",
        currency.unwrap_or_default()
    );

    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_stable_and_hex_encoded() {
        let a = content_checksum("STOOQ", "AAPL", "equity", "2024-01-01T00:00:00Z", 185.5, Some("USD"));
        let b = content_checksum("STOOQ", "AAPL", "equity", "2024-01-01T00:00:00Z", 185.5, Some("USD"));
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn checksum_changes_with_any_field() {
        let base = content_checksum("STOOQ", "AAPL", "equity", "2024-01-01", 185.5, Some("USD"));
        assert_ne!(base, content_checksum("STOOQ", "AAPL", "equity", "2024-01-01", 185.51, Some("USD")));
        assert_ne!(base, content_checksum("STOOQ", "AAPL", "equity", "2024-01-01", 185.5, None));
        assert_ne!(base, content_checksum("INVESTING", "AAPL", "equity", "2024-01-01", 185.5, Some("USD")));
    }
}
