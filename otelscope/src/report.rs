//! Plain-text rendering of exported series
//!
//! Reports are meant to be read by humans or pasted into an LLM prompt, so the
//! layout is deliberately simple: a small header block followed by one
//! comma-separated row per sample.

use std::{collections::BTreeMap, fmt::Write as _};

use chrono::{DateTime, Local, TimeZone};

use crate::{
    catalog::MetricDefinition,
    format::format_value,
    prometheus::{Sample, Series},
};

/// Labels whose values name a report file when a query returns several
/// series, in priority order.
pub const SUFFIX_LABELS: [&str; 4] = ["receiver", "processor", "exporter", "data_type"];

/// Name of the per-run summary document.
pub const SUMMARY_FILENAME: &str = "_SUMMARY.md";

const RULE_WIDTH: usize = 60;

/// Filename of the report for `series`, the `index`-th of `total` series
/// returned for `definition`
///
/// A lone series is named after the metric. When there are several, the
/// values of [`SUFFIX_LABELS`] are appended, or the index if the series
/// carries none of them.
#[must_use]
pub fn report_filename(
    definition: &MetricDefinition,
    series: &Series,
    index: usize,
    total: usize,
) -> String {
    let mut name = definition.name.to_string();
    if total > 1 {
        let parts: Vec<&str> = SUFFIX_LABELS
            .iter()
            .filter_map(|key| series.metric.get(*key).map(String::as_str))
            .collect();
        name.push('_');
        if parts.is_empty() {
            name.push_str(&index.to_string());
        } else {
            name.push_str(&sanitize(&parts.join("_")));
        }
    }
    name.push_str(".txt");
    name
}

// Component names such as `otlp/2` must not escape the output directory.
fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect()
}

/// `key=value` pairs of every user-visible label, or `None` if there are none
///
/// Labels starting with `__`, such as `__name__`, are internal to the backend
/// and skipped.
#[must_use]
pub fn label_line(labels: &BTreeMap<String, String>) -> Option<String> {
    let visible: Vec<String> = labels
        .iter()
        .filter(|(k, _)| !k.starts_with("__"))
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    if visible.is_empty() {
        None
    } else {
        Some(visible.join(", "))
    }
}

/// Local wall-clock rendering of a unix timestamp, `YYYY-MM-DD HH:MM:SS`
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn render_timestamp(timestamp: f64) -> String {
    let secs = timestamp.floor() as i64;
    match Local.timestamp_opt(secs, 0).earliest() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => timestamp.to_string(),
    }
}

/// Render the report for one series of `definition`
///
/// When `raw` is set the formatted column is omitted.
#[must_use]
pub fn render(definition: &MetricDefinition, series: &Series, raw: bool) -> String {
    let mut lines = vec![format!("## {}", definition.name)];
    if let Some(labels) = label_line(&series.metric) {
        lines.push(format!("Labels: {labels}"));
    }
    lines.push(format!("Description: {}", definition.description));
    lines.push(format!("Unit: {}", definition.unit));
    lines.push(String::new());
    lines.push(if raw {
        "Time, Value".to_string()
    } else {
        "Time, Value, Formatted".to_string()
    });
    lines.push("-".repeat(RULE_WIDTH));
    lines.extend(
        series
            .values
            .iter()
            .map(|sample| render_row(definition, sample, raw)),
    );

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn render_row(definition: &MetricDefinition, sample: &Sample, raw: bool) -> String {
    let time = render_timestamp(sample.timestamp);
    if raw {
        format!("{time}, {}", sample.value)
    } else {
        format!(
            "{time}, {}, {}",
            sample.value,
            format_value(&sample.value, definition.unit)
        )
    }
}

/// Render the run summary listing every metric in `catalog`
#[must_use]
pub fn render_summary(
    catalog: &[MetricDefinition],
    exported_at: DateTime<Local>,
    duration_minutes: u64,
    step_seconds: u64,
) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "# OpenTelemetry Collector Metrics Export Summary");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Exported at: {}",
        exported_at.format("%Y-%m-%d %H:%M:%S")
    );
    let _ = writeln!(out, "Duration: last {duration_minutes} minutes");
    let _ = writeln!(out, "Step: {step_seconds} seconds");
    let _ = writeln!(out);
    let _ = writeln!(out, "## Exported metrics");
    let _ = writeln!(out);
    for definition in catalog {
        let _ = writeln!(out, "- **{}**: {}", definition.name, definition.description);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CATALOG, Unit};

    const HEAP: MetricDefinition = MetricDefinition {
        name: "Heap_Alloc_bytes",
        query: "heap",
        description: "Collector heap",
        unit: Unit::Bytes,
    };

    fn series(labels: &[(&str, &str)], values: &[(f64, &str)]) -> Series {
        Series {
            metric: labels
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            values: values
                .iter()
                .map(|(ts, v)| Sample {
                    timestamp: *ts,
                    value: (*v).to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn single_series_has_no_suffix() {
        let s = series(&[("receiver", "otlp")], &[]);
        assert_eq!(report_filename(&HEAP, &s, 0, 1), "Heap_Alloc_bytes.txt");
    }

    #[test]
    fn suffix_follows_label_priority() {
        let s = series(
            &[("data_type", "traces"), ("job", "x"), ("exporter", "otlp")],
            &[],
        );
        assert_eq!(
            report_filename(&HEAP, &s, 3, 2),
            "Heap_Alloc_bytes_otlp_traces.txt"
        );
    }

    #[test]
    fn suffix_falls_back_to_index() {
        let s = series(&[("job", "x")], &[]);
        assert_eq!(report_filename(&HEAP, &s, 1, 2), "Heap_Alloc_bytes_1.txt");
    }

    #[test]
    fn suffix_never_contains_path_separators() {
        let s = series(&[("exporter", "otlp/backup")], &[]);
        assert_eq!(
            report_filename(&HEAP, &s, 0, 2),
            "Heap_Alloc_bytes_otlp_backup.txt"
        );
    }

    #[test]
    fn reserved_labels_are_hidden() {
        let s = series(&[("__name__", "heap"), ("job", "self"), ("instance", "a:1")], &[]);
        assert_eq!(
            label_line(&s.metric).as_deref(),
            Some("instance=a:1, job=self")
        );
        let only_reserved = series(&[("__name__", "heap")], &[]);
        assert_eq!(label_line(&only_reserved.metric), None);
    }

    #[test]
    fn timestamp_is_wall_clock() {
        let rendered = render_timestamp(1_700_000_000.75);
        let expected = Local
            .timestamp_opt(1_700_000_000, 0)
            .earliest()
            .expect("valid timestamp")
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        assert_eq!(rendered, expected);
        assert_eq!(rendered.len(), 19);
    }

    #[test]
    fn report_layout_with_formatted_column() {
        let s = series(
            &[("__name__", "heap"), ("job", "self")],
            &[(1_700_000_000.0, "1073741824"), (1_700_000_060.0, "2048")],
        );
        let out = render(&HEAP, &s, false);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], "## Heap_Alloc_bytes");
        assert_eq!(lines[1], "Labels: job=self");
        assert_eq!(lines[2], "Description: Collector heap");
        assert_eq!(lines[3], "Unit: bytes");
        assert_eq!(lines[4], "");
        assert_eq!(lines[5], "Time, Value, Formatted");
        assert_eq!(lines[6], "-".repeat(60));
        assert_eq!(
            lines[7],
            format!("{}, 1073741824, 1.00 GB", render_timestamp(1_700_000_000.0))
        );
        assert!(lines[8].ends_with(", 2048, 2.00 KB"));
        assert_eq!(lines.len(), 9);
    }

    #[test]
    fn raw_report_omits_formatted_column() {
        let s = series(&[], &[(1_700_000_000.0, "1024")]);
        let out = render(&HEAP, &s, true);
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[1], "Description: Collector heap");
        assert_eq!(lines[4], "Time, Value");
        assert!(lines[6].ends_with(", 1024"));
        assert!(!out.contains("KB"));
    }

    #[test]
    fn summary_lists_every_metric() {
        let out = render_summary(CATALOG, Local::now(), 15, 60);
        assert!(out.starts_with("# OpenTelemetry Collector Metrics Export Summary\n"));
        assert!(out.contains("Duration: last 15 minutes"));
        assert!(out.contains("Step: 60 seconds"));
        for definition in CATALOG {
            assert!(out.contains(&format!("- **{}**: ", definition.name)));
        }
    }
}
