//! Sectioned CSV output: a summary block, then detail sections, each
//! separated by one blank line.

use crate::error::ReportError;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const SUMMARY_HEADER: [&str; 3] = ["metric", "value", "notes"];

/// One row of the leading summary block.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRow {
    pub metric: &'static str,
    pub value: String,
    pub notes: String,
}

impl MetricRow {
    pub fn new(metric: &'static str, value: impl ToString, notes: impl Into<String>) -> Self {
        Self {
            metric,
            value: value.to_string(),
            notes: notes.into(),
        }
    }
}

/// Fixed-precision formatting; `NaN` is written as `nan`.
pub fn fmt_fixed(value: f64, decimals: usize) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else {
        format!("{value:.decimals$}")
    }
}

pub fn fmt_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub struct SectionWriter<W: Write> {
    out: W,
    sections: usize,
}

impl<W: Write> SectionWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, sections: 0 }
    }

    pub fn summary(&mut self, rows: &[MetricRow]) -> Result<(), ReportError> {
        self.section(
            &SUMMARY_HEADER,
            rows.iter()
                .map(|r| vec![r.metric.to_string(), r.value.clone(), r.notes.clone()]),
            None,
        )
        .map(|_| ())
    }

    /// Writes a header and at most `limit` rows. Returns how many rows were
    /// written.
    pub fn section<I>(
        &mut self,
        header: &[&str],
        rows: I,
        limit: Option<usize>,
    ) -> Result<usize, ReportError>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        if self.sections > 0 {
            self.out.write_all(b"\n")?;
        }
        self.sections += 1;

        let mut wtr = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(&mut self.out);
        wtr.write_record(header)?;

        let mut written = 0;
        for row in rows.into_iter().take(limit.unwrap_or(usize::MAX)) {
            wtr.write_record(&row)?;
            written += 1;
        }
        wtr.flush()?;
        Ok(written)
    }

    pub fn finish(mut self) -> Result<W, ReportError> {
        self.out.flush()?;
        Ok(self.out)
    }
}

/// Creates `dir` if needed and opens `dir/file_name` for writing.
pub fn create_report_file(
    dir: &Path,
    file_name: &str,
) -> Result<(PathBuf, BufWriter<File>), ReportError> {
    fs::create_dir_all(dir).map_err(|e| ReportError::io(dir, e))?;
    let path = dir.join(file_name);
    let file = File::create(&path).map_err(|e| ReportError::io(&path, e))?;
    Ok((path, BufWriter::new(file)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_are_separated_by_one_blank_line() {
        let mut writer = SectionWriter::new(Vec::new());
        writer
            .summary(&[MetricRow::new("total_rows", 3, "All rows")])
            .unwrap();
        let written = writer
            .section(
                &["a", "b"],
                vec![
                    vec!["1".to_string(), "x,y".to_string()],
                    vec!["2".to_string(), "z".to_string()],
                ],
                Some(1),
            )
            .unwrap();
        let text = String::from_utf8(writer.finish().unwrap()).unwrap();

        assert_eq!(written, 1);
        assert_eq!(text, "metric,value,notes\ntotal_rows,3,All rows\n\na,b\n1,\"x,y\"\n");
    }

    #[test]
    fn nan_is_written_lowercase() {
        assert_eq!(fmt_fixed(f64::NAN, 4), "nan");
        assert_eq!(fmt_fixed(0.99999, 4), "1.0000");
        assert_eq!(fmt_fixed(-2.25, 2), "-2.25");
    }
}
