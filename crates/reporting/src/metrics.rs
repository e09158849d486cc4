//! Reader for the leading `metric,value,notes` block of a report.
//!
//! Only that block is a consumer contract. Detail sections that follow have
//! a different column count and are never read.

use crate::error::ReportError;
use crate::sections::SUMMARY_HEADER;
use csv::StringRecord;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// The metrics of one summary block, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricBlock {
    entries: Vec<(String, String)>,
}

impl MetricBlock {
    pub fn get(&self, metric: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == metric)
            .map(|(_, value)| value.as_str())
    }

    /// A count metric. Missing metrics count as zero; a fractional value is
    /// truncated.
    pub fn count(&self, metric: &str) -> Result<u64, ReportError> {
        let Some(raw) = self.get(metric) else {
            return Ok(0);
        };
        if let Ok(n) = raw.parse::<u64>() {
            return Ok(n);
        }
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => Ok(v.trunc() as u64),
            _ => Err(ReportError::InvalidMetric {
                metric: metric.to_string(),
                value: raw.to_string(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_line(line: &str) -> Result<StringRecord, ReportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());
    Ok(reader.records().next().transpose()?.unwrap_or_default())
}

fn is_summary_header(record: &StringRecord) -> bool {
    let names: Vec<String> = record
        .iter()
        .take(SUMMARY_HEADER.len())
        .map(|c| c.trim_start_matches('\u{feff}').trim().to_ascii_lowercase())
        .collect();
    names == SUMMARY_HEADER
}

/// Reads the first summary block: skips to the `metric,value,notes` header,
/// then collects rows until the first blank line or row with fewer than
/// three columns.
pub fn read_metrics_block<R: BufRead>(reader: R) -> Result<MetricBlock, ReportError> {
    let mut lines = reader.lines();
    let mut block = MetricBlock::default();

    let mut found = false;
    for line in lines.by_ref() {
        if is_summary_header(&parse_line(&line?)?) {
            found = true;
            break;
        }
    }
    if !found {
        return Ok(block);
    }

    for line in lines {
        let line = line?;
        if line.trim().is_empty() {
            break;
        }
        let record = parse_line(&line)?;
        if record.len() < SUMMARY_HEADER.len() {
            break;
        }
        block
            .entries
            .push((record[0].trim().to_string(), record[1].trim().to_string()));
    }
    Ok(block)
}

/// Reads the summary block of the report at `path`. A missing report is an
/// empty block.
pub fn read_metrics_file(path: &Path) -> Result<MetricBlock, ReportError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "Report not found; treating its metrics as zero.");
            return Ok(MetricBlock::default());
        }
        Err(e) => return Err(ReportError::io(path, e)),
    };
    read_metrics_block(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "\
metric,value,notes
total_pairs_compared,12,\"Pairs across distinct sources, same (symbol, ts)\"
anomalies_over_threshold_levels,3,Levels threshold: 0.5%
returns_correlation,nan,Pearson
\nsymbol,ts,source_a,price_a,source_b,price_b,pct_diff
AAPL,2024-01-01T00:00:00Z,A,100,B,101,0.9950
";

    #[test]
    fn stops_at_the_first_blank_line() {
        let block = read_metrics_block(REPORT.as_bytes()).unwrap();

        assert_eq!(block.len(), 3);
        assert_eq!(block.count("total_pairs_compared").unwrap(), 12);
        assert_eq!(block.get("returns_correlation"), Some("nan"));
        assert_eq!(block.get("symbol"), None);
    }

    #[test]
    fn stops_at_a_short_row_and_skips_leading_noise() {
        let text = "# generated\n\u{feff}Metric, Value ,Notes\ntotal_rows,10,\nduplicate_rows,2.0,x\nsection\nignored,1,x\n";
        let block = read_metrics_block(text.as_bytes()).unwrap();

        assert_eq!(block.len(), 2);
        assert_eq!(block.count("total_rows").unwrap(), 10);
        assert_eq!(block.count("duplicate_rows").unwrap(), 2);
        assert_eq!(block.count("ignored").unwrap(), 0);
    }

    #[test]
    fn missing_header_or_file_is_empty() {
        assert!(read_metrics_block("a,b\n1,2\n".as_bytes()).unwrap().is_empty());

        let dir = tempfile::tempdir().unwrap();
        let block = read_metrics_file(&dir.path().join("absent.csv")).unwrap();
        assert!(block.is_empty());
    }

    #[test]
    fn non_numeric_counts_are_errors() {
        let block = read_metrics_block("metric,value,notes\ntotal_rows,lots,\n".as_bytes()).unwrap();
        assert!(matches!(
            block.count("total_rows"),
            Err(ReportError::InvalidMetric { .. })
        ));
    }
}
