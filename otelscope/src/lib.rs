//! Operator tooling for OpenTelemetry Collector investigations.
//!
//! This library supports the `metricstool` and `pproftool` binaries found
//! elsewhere in this project. `metricstool` pulls the collector's
//! self-telemetry out of a Prometheus-compatible backend and writes plain-text
//! reports, `pproftool` summarizes a directory of heap profiles as a memory
//! trend. The two share nothing but configuration plumbing.

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]
#![deny(missing_copy_implementations)]
#![deny(missing_debug_implementations)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::multiple_crate_versions)]

pub mod catalog;
pub mod config;
pub mod export;
pub mod format;
pub mod pprof;
pub mod prometheus;
pub mod report;
pub mod trend;
