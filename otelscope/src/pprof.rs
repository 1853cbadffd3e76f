//! Memory totals from heap profile snapshots
//!
//! The total in-use memory of a `.pprof` snapshot is read by running
//! `go tool pprof -top` and scraping the summary line of its output. Scraping
//! free-form tool output is brittle, so callers only ever see the
//! [`TotalExtractor`] capability: a path goes in, an optional megabyte figure
//! comes out.

use std::{
    future::Future,
    io::{self, Write},
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::process::Command;
use tracing::{debug, info};

use crate::trend::{self, Entry, Format};

const MIB: f64 = 1024.0 * 1024.0;

/// File extension of profile snapshots.
pub const PROFILE_EXTENSION: &str = "pprof";

/// Errors produced while building a trend report
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The snapshot directory holds no `.pprof` files.
    #[error("No .pprof files found in {0}")]
    NoProfiles(PathBuf),
    /// Not a single snapshot yielded a total.
    #[error("Failed to parse any pprof files")]
    NoneParsed,
    /// Writing the report failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Something that can tell the total memory recorded in a profile
pub trait TotalExtractor {
    /// Total in-use memory of the profile at `path`, in megabytes, or `None`
    /// if it cannot be determined. Never fails otherwise.
    fn total_mb(&self, path: &Path) -> impl Future<Output = Option<f64>>;
}

/// [`TotalExtractor`] backed by `<tool> tool pprof -top`
#[derive(Debug, Clone)]
pub struct GoPprof {
    tool: String,
    timeout: Duration,
}

impl GoPprof {
    /// Create a new [`GoPprof`] running `tool`, bounded by `timeout`.
    #[must_use]
    pub fn new(tool: impl Into<String>, timeout: Duration) -> Self {
        Self {
            tool: tool.into(),
            timeout,
        }
    }

    async fn top(&self, path: &Path) -> Option<String> {
        let mut cmd = Command::new(&self.tool);
        cmd.args(["tool", "pprof", "-top"])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => Some(String::from_utf8_lossy(&output.stdout).into_owned()),
            Ok(Err(err)) => {
                debug!("failed to run {} on {}: {err}", self.tool, path.display());
                None
            }
            Err(_) => {
                debug!(
                    "{} did not finish on {} within {:?}",
                    self.tool,
                    path.display(),
                    self.timeout
                );
                None
            }
        }
    }
}

impl TotalExtractor for GoPprof {
    async fn total_mb(&self, path: &Path) -> Option<f64> {
        let out = self.top(path).await?;
        let total = parse_total(&out);
        if total.is_none() {
            debug!("no total found in pprof output for {}", path.display());
        }
        total
    }
}

/// Extract the total from `pprof -top` output, in megabytes
///
/// Two phrasings are recognized, in order: `of 12.5MB total` as printed in the
/// `Showing nodes accounting for ...` header, and `total: 12.5MB`.
#[must_use]
pub fn parse_total(output: &str) -> Option<f64> {
    static OF_TOTAL: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"of\s+([0-9.]+)\s*([kKMGTP]?B)\s+total").expect("Invalid regex pattern provided")
    });
    static TOTAL_COLON: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"total:\s*([0-9.]+)\s*([kKMGTP]?B)").expect("Invalid regex pattern provided")
    });

    let caps = OF_TOTAL
        .captures(output)
        .or_else(|| TOTAL_COLON.captures(output))?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2)?.as_str();
    Some(value * unit_scale(unit) / MIB)
}

/// Bytes per `unit`. Unrecognized units count as bytes.
fn unit_scale(unit: &str) -> f64 {
    match unit {
        "kB" | "KB" => 1024.0,
        "MB" => MIB,
        "GB" => MIB * 1024.0,
        "TB" => MIB * 1024.0 * 1024.0,
        "PB" => MIB * 1024.0 * 1024.0 * 1024.0,
        _ => 1.0,
    }
}

/// All `.pprof` files directly inside `dir`, in filename order
///
/// A directory that is missing or cannot be listed has no profiles.
#[must_use]
pub fn find_profiles(dir: &Path) -> Vec<PathBuf> {
    let read_dir = match std::fs::read_dir(dir) {
        Ok(read_dir) => read_dir,
        Err(err) => {
            debug!("could not list {}: {err}", dir.display());
            return Vec::new();
        }
    };
    let mut profiles: Vec<PathBuf> = read_dir
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.path()),
            Err(err) => {
                debug!("skipping unreadable entry in {}: {err}", dir.display());
                None
            }
        })
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == PROFILE_EXTENSION))
        .collect();
    profiles.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    profiles
}

/// Extract the total of every file in `profiles`, in order
///
/// Files whose total cannot be determined are dropped.
pub async fn collect_entries<X>(extractor: &X, profiles: &[PathBuf]) -> Vec<Entry>
where
    X: TotalExtractor,
{
    let mut entries = Vec::with_capacity(profiles.len());
    for profile in profiles {
        let name = profile
            .file_name()
            .map_or_else(|| profile.display().to_string(), |n| n.to_string_lossy().into_owned());
        if let Some(mb) = extractor.total_mb(profile).await {
            entries.push(Entry { name, mb });
        }
    }
    entries
}

/// Summarize the snapshots in `dir` to `out`
///
/// # Errors
///
/// Returns [`Error::NoProfiles`] when `dir` has no `.pprof` files and
/// [`Error::NoneParsed`] when none of them yields a total. Both are fatal to
/// the caller.
pub async fn report<X, O>(dir: &Path, format: Format, extractor: &X, out: &mut O) -> Result<(), Error>
where
    X: TotalExtractor,
    O: Write,
{
    let profiles = find_profiles(dir);
    if profiles.is_empty() {
        return Err(Error::NoProfiles(dir.to_path_buf()));
    }
    info!("found {} profiles in {}", profiles.len(), dir.display());

    let entries = collect_entries(extractor, &profiles).await;
    if entries.is_empty() {
        return Err(Error::NoneParsed);
    }
    debug!("parsed {} of {} profiles", entries.len(), profiles.len());

    match format {
        Format::Table => trend::render_table(&entries, out)?,
        Format::Plain => trend::render_plain(&entries, out)?,
    }
    Ok(())
}

/// The total of a single snapshot as `X.XXMB`, or `N/A`
pub async fn total_line<X>(extractor: &X, profile: &Path) -> String
where
    X: TotalExtractor,
{
    match extractor.total_mb(profile).await {
        Some(mb) => format!("{mb:.2}MB"),
        None => "N/A".to_string(),
    }
}
