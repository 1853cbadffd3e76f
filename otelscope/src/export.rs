//! Export every catalog metric to report files
//!
//! The exporter walks the catalog in order, one query at a time. A metric that
//! cannot be queried, or that returns no series, is reported and counted but
//! never stops the run. Only I/O errors on the output directory are fatal.

use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::Local;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::{
    catalog::MetricDefinition,
    prometheus::{self, Client, Range},
    report,
};

const BANNER_WIDTH: usize = 60;

/// Errors produced by [`Exporter`]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Failed to create the output directory or write a report into it.
    #[error("Failed to write {path:?}: {source}")]
    Write {
        /// Path being written
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },
    /// Failed to write to the console.
    #[error(transparent)]
    Console(#[from] io::Error),
}

/// Options for a single export run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// How far back from now to query
    pub duration: Duration,
    /// Resolution of the range query
    pub step: Duration,
    /// Directory receiving the reports, created if absent
    pub output_dir: PathBuf,
    /// Omit the formatted value column
    pub raw: bool,
}

/// What happened to a single metric
#[derive(Debug)]
pub enum Outcome {
    /// At least one series came back; one report was written per non-empty
    /// series, as `(filename, data points)`.
    Exported(Vec<(String, usize)>),
    /// The query succeeded but returned no series.
    NoData,
    /// The query itself failed.
    Failed(prometheus::Error),
}

impl Outcome {
    /// Whether this outcome counts towards the success total.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Exported(_))
    }
}

/// Totals for a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary {
    /// Metrics with at least one returned series
    pub succeeded: usize,
    /// Metrics that failed or returned nothing
    pub failed: usize,
}

/// The metrics exporter
#[derive(Debug)]
pub struct Exporter {
    client: Client,
    options: Options,
}

impl Exporter {
    /// Create a new [`Exporter`]
    #[must_use]
    pub fn new(client: Client, options: Options) -> Self {
        Self { client, options }
    }

    /// Query one metric and write its reports
    ///
    /// # Errors
    ///
    /// Returns an error only if a report cannot be written. Query failures are
    /// folded into the returned [`Outcome`].
    pub async fn export_metric(
        &self,
        definition: &MetricDefinition,
        range: Range,
    ) -> Result<Outcome, Error> {
        let series = match self.client.query_range(definition.query, range).await {
            Ok(series) => series,
            Err(err) => {
                warn!("{} query failed: {err}", definition.name);
                return Ok(Outcome::Failed(err));
            }
        };
        if series.is_empty() {
            debug!("{} returned no series", definition.name);
            return Ok(Outcome::NoData);
        }

        let total = series.len();
        let mut written = Vec::with_capacity(total);
        for (index, s) in series.iter().enumerate() {
            if s.values.is_empty() {
                continue;
            }
            let filename = report::report_filename(definition, s, index, total);
            let path = self.options.output_dir.join(&filename);
            let contents = report::render(definition, s, self.options.raw);
            write_file(&path, contents.as_bytes()).await?;
            written.push((filename, s.values.len()));
        }
        Ok(Outcome::Exported(written))
    }

    /// Export every metric in `catalog`
    ///
    /// Progress goes to `out`, query failures to `err`. The summary document
    /// is written last and lists the whole catalog regardless of outcomes.
    ///
    /// # Errors
    ///
    /// Returns an error if the output directory or a report cannot be written,
    /// or if the console sinks fail.
    pub async fn run<O, E>(
        &self,
        catalog: &[MetricDefinition],
        out: &mut O,
        err: &mut E,
    ) -> Result<Summary, Error>
    where
        O: Write,
        E: Write,
    {
        let output_dir = &self.options.output_dir;
        fs::create_dir_all(output_dir)
            .await
            .map_err(|source| Error::Write {
                path: output_dir.clone(),
                source,
            })?;
        let display_dir = absolute(output_dir);

        let duration_minutes = self.options.duration.as_secs() / 60;
        let step_seconds = self.options.step.as_secs();
        let range = Range::ending_at(
            Local::now().timestamp(),
            self.options.duration,
            self.options.step,
        );
        info!(
            "exporting {} metrics over [{}, {}] to {}",
            catalog.len(),
            range.start,
            range.end,
            display_dir.display()
        );

        let rule = "=".repeat(BANNER_WIDTH);
        writeln!(out, "{rule}")?;
        writeln!(out, "OpenTelemetry Collector Metrics Export")?;
        writeln!(out, "{rule}")?;
        writeln!(out, "Duration: last {duration_minutes} minutes")?;
        writeln!(out, "Step: {step_seconds} seconds")?;
        writeln!(out, "Output: {}", display_dir.display())?;
        writeln!(out, "Queries: {}", catalog.len())?;
        writeln!(out, "{rule}")?;
        writeln!(out)?;

        let mut summary = Summary::default();
        for definition in catalog {
            let outcome = self.export_metric(definition, range).await?;
            match &outcome {
                Outcome::Exported(files) => {
                    for (filename, points) in files {
                        writeln!(out, "  ok    {filename} ({points} data points)")?;
                    }
                }
                Outcome::NoData => {
                    writeln!(out, "  skip  {}: no data", definition.name)?;
                }
                Outcome::Failed(e) => {
                    writeln!(err, "  fail  {}: query failed - {e}", definition.name)?;
                }
            }
            if outcome.is_success() {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
        }

        writeln!(out)?;
        writeln!(out, "{rule}")?;
        writeln!(
            out,
            "Done: {} succeeded, {} failed/no data",
            summary.succeeded, summary.failed
        )?;
        writeln!(out, "Output directory: {}", display_dir.display())?;
        writeln!(out, "{rule}")?;

        let summary_doc =
            report::render_summary(catalog, Local::now(), duration_minutes, step_seconds);
        write_file(
            &output_dir.join(report::SUMMARY_FILENAME),
            summary_doc.as_bytes(),
        )
        .await?;

        Ok(summary)
    }
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<(), Error> {
    fs::write(path, contents)
        .await
        .map_err(|source| Error::Write {
            path: path.to_path_buf(),
            source,
        })
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use warp::Filter;

    use super::*;
    use crate::catalog::Unit;

    const TWO_RECEIVERS: &str = r#"{"status":"success","data":{"resultType":"matrix","result":[
        {"metric":{"receiver":"otlp","transport":"grpc"},"values":[[1700000000,"10"],[1700000060,"12.5"]]},
        {"metric":{"receiver":"prometheus"},"values":[[1700000000,"1"]]}
    ]}}"#;

    const ONE_SERIES: &str = r#"{"status":"success","data":{"resultType":"matrix","result":[
        {"metric":{"__name__":"heap","job":"otel-collector-self"},"values":[[1700000000,"1073741824"]]}
    ]}}"#;

    const EMPTY: &str = r#"{"status":"success","data":{"resultType":"matrix","result":[]}}"#;

    const CATALOG: &[MetricDefinition] = &[
        MetricDefinition {
            name: "Heap",
            query: "heap",
            description: "heap bytes",
            unit: Unit::Bytes,
        },
        MetricDefinition {
            name: "Accepted",
            query: "accepted",
            description: "accepted spans",
            unit: Unit::Ops,
        },
        MetricDefinition {
            name: "Missing",
            query: "missing",
            description: "nothing here",
            unit: Unit::Ops,
        },
        MetricDefinition {
            name: "Broken",
            query: "broken",
            description: "server error",
            unit: Unit::Ratio,
        },
    ];

    fn backend() -> String {
        let route = warp::path!("api" / "v1" / "query_range")
            .and(warp::query::<HashMap<String, String>>())
            .map(|params: HashMap<String, String>| {
                match params.get("query").map(String::as_str) {
                    Some("heap") => warp::reply::with_status(ONE_SERIES, warp::http::StatusCode::OK),
                    Some("accepted") => {
                        warp::reply::with_status(TWO_RECEIVERS, warp::http::StatusCode::OK)
                    }
                    Some("missing") => warp::reply::with_status(EMPTY, warp::http::StatusCode::OK),
                    _ => warp::reply::with_status(
                        "upstream unavailable",
                        warp::http::StatusCode::SERVICE_UNAVAILABLE,
                    ),
                }
            });
        let (addr, serve_fut) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(serve_fut);
        format!("http://{addr}")
    }

    fn exporter(base: &str, output_dir: PathBuf, raw: bool) -> Exporter {
        let client = Client::new(base, Duration::from_secs(5)).expect("client");
        Exporter::new(
            client,
            Options {
                duration: Duration::from_secs(15 * 60),
                step: Duration::from_secs(60),
                output_dir,
                raw,
            },
        )
    }

    #[tokio::test]
    async fn run_writes_reports_and_counts_outcomes() {
        let base = backend();
        let tmp = tempfile::tempdir().expect("temp dir");
        let output_dir = tmp.path().join("nested").join("metrics_export");
        let exporter = exporter(&base, output_dir.clone(), false);

        let mut out = Vec::new();
        let mut err = Vec::new();
        let summary = exporter
            .run(CATALOG, &mut out, &mut err)
            .await
            .expect("run completes");

        assert_eq!(
            summary,
            Summary {
                succeeded: 2,
                failed: 2
            }
        );

        let heap = std::fs::read_to_string(output_dir.join("Heap.txt")).expect("heap report");
        assert!(heap.starts_with("## Heap\nLabels: job=otel-collector-self\n"));
        assert!(heap.contains(", 1073741824, 1.00 GB"));

        let otlp = std::fs::read_to_string(output_dir.join("Accepted_otlp.txt"))
            .expect("otlp receiver report");
        assert!(otlp.contains("Labels: receiver=otlp, transport=grpc"));
        assert!(otlp.contains(", 12.5, 12.50/s"));
        assert!(output_dir.join("Accepted_prometheus.txt").exists());

        assert!(!output_dir.join("Missing.txt").exists());
        assert!(!output_dir.join("Broken.txt").exists());

        let summary_doc = std::fs::read_to_string(output_dir.join(report::SUMMARY_FILENAME))
            .expect("summary document");
        for definition in CATALOG {
            assert!(summary_doc.contains(&format!("- **{}**: {}", definition.name, definition.description)));
        }

        let out = String::from_utf8(out).expect("utf8");
        let err = String::from_utf8(err).expect("utf8");
        assert!(out.contains("Queries: 4"));
        assert!(out.contains("  ok    Heap.txt (1 data points)"));
        assert!(out.contains("  ok    Accepted_otlp.txt (2 data points)"));
        assert!(out.contains("  skip  Missing: no data"));
        assert!(out.contains("Done: 2 succeeded, 2 failed/no data"));
        assert!(err.contains("  fail  Broken: query failed - HTTP Error: 503"));
        assert!(!out.contains("Broken"));
    }

    #[tokio::test]
    async fn raw_mode_omits_formatted_values() {
        let base = backend();
        let tmp = tempfile::tempdir().expect("temp dir");
        let exporter = exporter(&base, tmp.path().to_path_buf(), true);

        let outcome = exporter
            .export_metric(&CATALOG[0], Range::ending_at(1_700_000_900, Duration::from_secs(900), Duration::from_secs(60)))
            .await
            .expect("export");
        assert!(outcome.is_success());

        let heap = std::fs::read_to_string(tmp.path().join("Heap.txt")).expect("heap report");
        assert!(heap.contains("Time, Value\n"));
        assert!(!heap.contains("GB"));
    }

    #[tokio::test]
    async fn unreachable_backend_fails_every_metric_but_writes_summary() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let tmp = tempfile::tempdir().expect("temp dir");
        let exporter = exporter(&format!("http://{addr}"), tmp.path().to_path_buf(), false);

        let mut out = Vec::new();
        let mut err = Vec::new();
        let summary = exporter
            .run(CATALOG, &mut out, &mut err)
            .await
            .expect("run completes");

        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.failed, CATALOG.len());
        assert!(tmp.path().join(report::SUMMARY_FILENAME).exists());
        let err = String::from_utf8(err).expect("utf8");
        assert_eq!(err.lines().count(), CATALOG.len());
    }
}
