//! Memory trend across an ordered series of profile snapshots
//!
//! Entries are expected in capture order, which callers get by sorting
//! snapshot filenames that embed a sortable timestamp.

use std::{fmt, io::Write};

/// Only deltas larger than this, in megabytes, are shown.
const DELTA_THRESHOLD_MB: f64 = 0.5;
/// A snapshot above this multiple of the first one is `HIGH`.
const HIGH_FACTOR: f64 = 1.5;
/// A snapshot below this multiple of its predecessor is a `DROP`.
const DROP_FACTOR: f64 = 0.8;

const RULE_WIDTH: usize = 60;

/// Output layout of a trend report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Annotated table with a footer
    #[default]
    Table,
    /// One `name: X.XXMB` line per snapshot
    Plain,
}

/// A snapshot whose total was resolved
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Snapshot filename
    pub name: String,
    /// Total in-use memory in megabytes
    pub mb: f64,
}

/// Annotation of a single row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The largest snapshot of the series
    Peak,
    /// Well above the first snapshot
    High,
    /// Sharply below the previous snapshot
    Drop,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Peak => "PEAK",
            Status::High => "HIGH",
            Status::Drop => "DROP",
        })
    }
}

/// One row of the trend table
#[derive(Debug, Clone, PartialEq)]
pub struct Row<'a> {
    /// The snapshot
    pub entry: &'a Entry,
    /// Change from the previous row, when large enough to show
    pub delta: Option<f64>,
    /// Annotation, if any
    pub status: Option<Status>,
}

/// The analyzed trend of a non-empty series
#[derive(Debug, Clone, PartialEq)]
pub struct Trend<'a> {
    /// Rows in input order
    pub rows: Vec<Row<'a>>,
    /// First snapshot total
    pub first: f64,
    /// Last snapshot total
    pub last: f64,
    /// Smallest total
    pub min: f64,
    /// The first snapshot holding the largest total
    pub peak: &'a Entry,
}

impl<'a> Trend<'a> {
    /// Analyze `entries`, or `None` when there are none
    #[must_use]
    pub fn analyze(entries: &'a [Entry]) -> Option<Self> {
        let first = entries.first()?;
        let last = entries.last()?;

        let mut peak = first;
        let mut min = first.mb;
        for entry in entries {
            // Strict comparison keeps the earliest of equal maxima.
            if entry.mb > peak.mb {
                peak = entry;
            }
            min = min.min(entry.mb);
        }

        let mut rows = Vec::with_capacity(entries.len());
        let mut prev: Option<f64> = None;
        for entry in entries {
            let delta = prev
                .map(|p| entry.mb - p)
                .filter(|d| d.abs() > DELTA_THRESHOLD_MB);
            let status = if std::ptr::eq(entry, peak) {
                Some(Status::Peak)
            } else if entry.mb > first.mb * HIGH_FACTOR {
                Some(Status::High)
            } else if prev.is_some_and(|p| entry.mb < p * DROP_FACTOR) {
                Some(Status::Drop)
            } else {
                None
            };
            rows.push(Row {
                entry,
                delta,
                status,
            });
            prev = Some(entry.mb);
        }

        Some(Self {
            rows,
            first: first.mb,
            last: last.mb,
            min,
            peak,
        })
    }

    /// Peak minus first, in megabytes.
    #[must_use]
    pub fn growth_mb(&self) -> f64 {
        self.peak.mb - self.first
    }

    /// Growth relative to the first snapshot in percent, `None` when the
    /// first snapshot is not positive.
    #[must_use]
    pub fn growth_pct(&self) -> Option<f64> {
        (self.first > 0.0).then(|| (self.peak.mb / self.first - 1.0) * 100.0)
    }
}

/// Write the annotated trend table for `entries`
///
/// Nothing is written for an empty series.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn render_table<O: Write>(entries: &[Entry], out: &mut O) -> std::io::Result<()> {
    let Some(trend) = Trend::analyze(entries) else {
        return Ok(());
    };
    let rule = "-".repeat(RULE_WIDTH);

    writeln!(out, "{:<25} {:>10}  {:>10}  Status", "File", "Memory", "Change")?;
    writeln!(out, "{rule}")?;
    for row in &trend.rows {
        let change = row.delta.map(|d| format!("{d:+.1}MB")).unwrap_or_default();
        let status = row.status.map(|s| s.to_string()).unwrap_or_default();
        writeln!(
            out,
            "{:<25} {:>8.2}MB  {change:>10}  {status}",
            row.entry.name, row.entry.mb
        )?;
    }
    writeln!(out, "{rule}")?;
    writeln!(
        out,
        "Start: {:.2}MB -> Peak: {:.2}MB -> End: {:.2}MB",
        trend.first, trend.peak.mb, trend.last
    )?;
    match trend.growth_pct() {
        Some(pct) => writeln!(out, "Growth: {:+.2}MB ({pct:+.1}%)", trend.growth_mb())?,
        None => writeln!(out, "Growth: {:+.2}MB", trend.growth_mb())?,
    }
    writeln!(out, "Peak file: {}", trend.peak.name)?;
    writeln!(out, "Range: {:.2}MB - {:.2}MB", trend.min, trend.peak.mb)?;
    Ok(())
}

/// Write one `name: X.XXMB` line per entry
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn render_plain<O: Write>(entries: &[Entry], out: &mut O) -> std::io::Result<()> {
    for entry in entries {
        writeln!(out, "{}: {:.2}MB", entry.name, entry.mb)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(values: &[(&str, f64)]) -> Vec<Entry> {
        values
            .iter()
            .map(|(name, mb)| Entry {
                name: (*name).to_string(),
                mb: *mb,
            })
            .collect()
    }

    fn statuses(trend: &Trend<'_>) -> Vec<Option<Status>> {
        trend.rows.iter().map(|r| r.status).collect()
    }

    #[test]
    fn peak_takes_priority_over_high() {
        let e = entries(&[("a", 100.0), ("b", 160.0), ("c", 80.0)]);
        let trend = Trend::analyze(&e).expect("non-empty");

        assert_eq!(statuses(&trend), vec![None, Some(Status::Peak), Some(Status::Drop)]);
        assert_eq!(trend.peak.name, "b");
        assert!((trend.growth_mb() - 60.0).abs() < 1e-9);
        assert!((trend.growth_pct().expect("positive first") - 60.0).abs() < 1e-9);
    }

    #[test]
    fn high_and_drop_without_peak() {
        let e = entries(&[("a", 100.0), ("b", 200.0), ("c", 155.0), ("d", 120.0), ("e", 90.0)]);
        let trend = Trend::analyze(&e).expect("non-empty");
        assert_eq!(
            statuses(&trend),
            vec![
                None,
                Some(Status::Peak),
                Some(Status::High),
                Some(Status::Drop),
                Some(Status::Drop)
            ]
        );
    }

    #[test]
    fn first_of_equal_maxima_is_peak() {
        let e = entries(&[("a", 50.0), ("b", 50.0)]);
        let trend = Trend::analyze(&e).expect("non-empty");
        assert_eq!(statuses(&trend), vec![Some(Status::Peak), None]);
        assert_eq!(trend.peak.name, "a");
    }

    #[test]
    fn small_deltas_are_hidden() {
        let e = entries(&[("a", 10.0), ("b", 10.4), ("c", 9.0)]);
        let trend = Trend::analyze(&e).expect("non-empty");
        let deltas: Vec<Option<f64>> = trend.rows.iter().map(|r| r.delta).collect();
        assert_eq!(deltas[0], None);
        assert_eq!(deltas[1], None);
        assert!((deltas[2].expect("shown") + 1.4).abs() < 1e-9);
    }

    #[test]
    fn empty_series_has_no_trend() {
        assert!(Trend::analyze(&[]).is_none());
        let mut out = Vec::new();
        render_table(&[], &mut out).expect("write");
        assert!(out.is_empty());
    }

    #[test]
    fn table_layout() {
        let e = entries(&[("a.pprof", 100.0), ("b.pprof", 160.0), ("c.pprof", 80.0)]);
        let mut out = Vec::new();
        render_table(&e, &mut out).expect("write");
        let out = String::from_utf8(out).expect("utf8");
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(
            lines[0],
            format!("{:<25} {:>10}  {:>10}  Status", "File", "Memory", "Change")
        );
        assert_eq!(lines[1], "-".repeat(60));
        assert_eq!(lines[2], format!("{:<25} {:>8}MB  {:>10}  ", "a.pprof", "100.00", ""));
        assert_eq!(
            lines[3],
            format!("{:<25} {:>8}MB  {:>10}  PEAK", "b.pprof", "160.00", "+60.0MB")
        );
        assert_eq!(
            lines[4],
            format!("{:<25} {:>8}MB  {:>10}  DROP", "c.pprof", "80.00", "-80.0MB")
        );
        assert_eq!(lines[5], "-".repeat(60));
        assert_eq!(lines[6], "Start: 100.00MB -> Peak: 160.00MB -> End: 80.00MB");
        assert_eq!(lines[7], "Growth: +60.00MB (+60.0%)");
        assert_eq!(lines[8], "Peak file: b.pprof");
        assert_eq!(lines[9], "Range: 80.00MB - 160.00MB");
        assert_eq!(lines.len(), 10);
    }

    #[test]
    fn growth_percentage_omitted_for_zero_start() {
        let e = entries(&[("a", 0.0), ("b", 4.0)]);
        let mut out = Vec::new();
        render_table(&e, &mut out).expect("write");
        let out = String::from_utf8(out).expect("utf8");
        assert!(out.contains("Growth: +4.00MB\n"));
        assert!(!out.contains('%'));
    }

    #[test]
    fn plain_has_no_annotations() {
        let e = entries(&[("a", 100.0), ("b", 160.0), ("c", 80.0)]);
        let mut out = Vec::new();
        render_plain(&e, &mut out).expect("write");
        let out = String::from_utf8(out).expect("utf8");
        assert_eq!(out, "a: 100.00MB\nb: 160.00MB\nc: 80.00MB\n");
        for tag in ["PEAK", "HIGH", "DROP", "Growth"] {
            assert!(!out.contains(tag));
        }
    }
}
