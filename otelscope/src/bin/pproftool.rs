//! Memory trend report over a directory of heap profile snapshots.

#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]

use std::{io, path::PathBuf, process::ExitCode, time::Duration};

use clap::{Parser, ValueEnum};
use otelscope::{
    config::Config,
    pprof::{self, GoPprof},
    trend::Format,
};
use tracing::debug;
use tracing_subscriber::{EnvFilter, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Option<Command>,

    /// output format
    #[clap(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// program providing `tool pprof`, overrides the configuration file
    #[clap(long)]
    tool: Option<String>,

    /// seconds to wait for each pprof invocation, overrides the configuration
    /// file
    #[clap(long)]
    timeout_seconds: Option<u64>,

    /// path on disk to an optional YAML configuration file
    #[clap(long)]
    config_path: Option<PathBuf>,

    /// directory containing .pprof files (not used with subcommands)
    directory: Option<PathBuf>,
}

#[derive(Parser, Debug)]
enum Command {
    /// Print the total memory of a single profile, or N/A
    Total {
        /// Path to a .pprof file
        profile: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Plain,
}

impl From<OutputFormat> for Format {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Table => Format::Table,
            OutputFormat::Plain => Format::Plain,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(false)
        .with_writer(io::stderr)
        .finish()
        .init();

    let args = Args::parse();
    let config = match Config::load(args.config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let timeout = args
        .timeout_seconds
        .map_or_else(|| config.pprof.timeout(), Duration::from_secs);
    let tool = args.tool.unwrap_or(config.pprof.tool);
    debug!("Using `{tool} tool pprof` with a {timeout:?} timeout");
    let extractor = GoPprof::new(tool, timeout);

    if let Some(Command::Total { profile }) = args.command {
        let line = match profile {
            Some(profile) => pprof::total_line(&extractor, &profile).await,
            None => "N/A".to_string(),
        };
        println!("{line}");
        return ExitCode::SUCCESS;
    }

    let Some(directory) = args.directory else {
        eprintln!("directory is required (or use the 'total' subcommand)");
        return ExitCode::FAILURE;
    };

    match pprof::report(&directory, args.format.into(), &extractor, &mut io::stdout()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
