//! Export OpenTelemetry Collector self-telemetry from a Prometheus-compatible
//! backend as plain-text reports.

use std::{io, path::PathBuf, time::Duration};

use clap::Parser;
use otelscope::{
    catalog::CATALOG,
    config::{self, Config},
    export::{self, Exporter, Options},
    prometheus::{self, Client},
};
use tracing::info;
use tracing_subscriber::{EnvFilter, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// minutes of history to export
    #[clap(short, long, default_value_t = 15)]
    duration: u64,

    /// seconds between data points
    #[clap(short, long, default_value_t = 60)]
    step: u64,

    /// directory to write reports into, created if absent
    #[clap(short, long, default_value = "metrics_export")]
    output: PathBuf,

    /// write raw values only, omitting the formatted column
    #[clap(long)]
    raw: bool,

    /// base URL of the backend, overrides the configuration file
    #[clap(long)]
    prometheus_url: Option<String>,

    /// path on disk to an optional YAML configuration file
    #[clap(long)]
    config_path: Option<PathBuf>,
}

impl Args {
    /// Layer command line overrides on top of the loaded configuration.
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(url) = &self.prometheus_url {
            config.prometheus.url.clone_from(url);
        }
    }

    fn export_options(&self) -> Options {
        Options {
            duration: Duration::from_secs(self.duration.saturating_mul(60)),
            step: Duration::from_secs(self.step),
            output_dir: self.output.clone(),
            raw: self.raw,
        }
    }
}

#[derive(thiserror::Error, Debug)]
enum Error {
    #[error(transparent)]
    Config(#[from] config::Error),
    #[error("Could not build the backend client: {0}")]
    Client(#[from] prometheus::Error),
    #[error(transparent)]
    Export(#[from] export::Error),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(false)
        .with_writer(io::stderr)
        .finish()
        .init();

    let args = Args::parse();
    let mut config = Config::load(args.config_path.as_deref())?;
    args.apply_overrides(&mut config);
    info!("Using backend at {}", config.prometheus.url);

    let client = Client::new(&config.prometheus.url, config.prometheus.timeout())?;
    let exporter = Exporter::new(client, args.export_options());

    let summary = exporter
        .run(CATALOG, &mut io::stdout(), &mut io::stderr())
        .await?;
    info!(
        "{} metrics exported, {} failed or empty",
        summary.succeeded, summary.failed
    );
    Ok(())
}
