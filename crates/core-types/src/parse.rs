//! Strict parsers for the text columns of the canonical ledger.
//!
//! Nothing here coerces: a value that does not match one of the accepted
//! shapes is an error that names the field and carries the offending text.

use crate::error::CoreError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// Naive layouts accepted after RFC 3339 fails. Both are read as UTC.
const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses an ISO-8601 timestamp into UTC.
///
/// Accepted shapes:
/// - RFC 3339 with `Z` or a numeric offset (`2024-01-01T00:00:00Z`)
/// - naive date-time, `T` or space separated, optional fraction (UTC assumed)
/// - date only (`2024-01-01`, midnight UTC)
pub fn parse_timestamp(field: &'static str, value: &str) -> Result<DateTime<Utc>, CoreError> {
    let trimmed = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }

    Err(CoreError::InvalidTimestamp {
        field,
        value: value.to_string(),
    })
}

/// Parses a stored price. `NaN` and infinities are rejected even though
/// `f64::from_str` accepts them.
pub fn parse_price(value: Option<&str>) -> Result<f64, CoreError> {
    let text = value.ok_or(CoreError::MissingField("price"))?.trim();
    let price: f64 = text
        .parse()
        .map_err(|_| CoreError::InvalidPrice(text.to_string()))?;
    if !price.is_finite() {
        return Err(CoreError::NonFinitePrice(price));
    }
    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_rfc3339_and_offsets() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("event_time", "2024-01-01T00:00:00Z").unwrap(), expected);
        assert_eq!(
            parse_timestamp("event_time", "2024-01-01T02:00:00+02:00").unwrap(),
            expected
        );
    }

    #[test]
    fn parses_naive_and_date_only_as_utc() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("event_time", "2024-03-05").unwrap(), expected);
        assert_eq!(parse_timestamp("event_time", "2024-03-05T00:00:00").unwrap(), expected);
        assert_eq!(parse_timestamp("ingest_time", "2024-03-05 00:00:00.000").unwrap(), expected);
    }

    #[test]
    fn keeps_fractional_seconds() {
        let parsed = parse_timestamp("ingest_time", "2024-01-02T12:30:00.250Z").unwrap();
        assert_eq!(parsed.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn rejects_garbage_timestamps_with_context() {
        let err = parse_timestamp("event_time", "01/02/2024").unwrap_err();
        assert_eq!(
            err,
            CoreError::InvalidTimestamp {
                field: "event_time",
                value: "01/02/2024".to_string()
            }
        );
    }

    #[test]
    fn price_parsing_is_strict() {
        assert_eq!(parse_price(Some(" 101.25 ")).unwrap(), 101.25);
        assert_eq!(parse_price(Some("-3")).unwrap(), -3.0);
        assert!(matches!(parse_price(Some("1,25")), Err(CoreError::InvalidPrice(_))));
        assert!(matches!(parse_price(Some("NaN")), Err(CoreError::NonFinitePrice(_))));
        assert!(matches!(parse_price(Some("inf")), Err(CoreError::NonFinitePrice(_))));
        assert_eq!(parse_price(None), Err(CoreError::MissingField("price")));
    }
}
