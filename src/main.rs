use anyhow::{Context, Result};
use casefeed::{pipeline, write::WriteOutcome, Config, ConfigOverrides};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// Load one region's cumulative case counts from the DPC feed into InfluxDB.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// YAML config file; missing keys fall back to defaults
    #[arg(short, long, env = "CASEFEED_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging for this crate (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,

    #[command(flatten)]
    overrides: ConfigOverrides,
}

fn main() {
    let args = Args::parse();

    // ─── 1) init logging ─────────────────────────────────────────────
    let default_filter = if args.verbose {
        "info,casefeed=debug"
    } else {
        "info"
    };
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_target(false)
        .init();
    info!("startup");

    if let Err(err) = run(args) {
        error!("{:#}", err);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    // ─── 2) load config ──────────────────────────────────────────────
    let mut config = Config::load(args.config.as_deref()).context("loading configuration")?;
    config
        .apply(args.overrides)
        .context("applying command-line overrides")?;
    config.validate()?;
    info!(
        feed = %config.feed_url,
        region = %config.region,
        influx = %config.influx.url,
        database = %config.influx.database,
        "configuration"
    );

    // ─── 3) fetch → filter → write ───────────────────────────────────
    let summary = pipeline::run(&config).context("pipeline run failed")?;
    match &summary.outcome {
        WriteOutcome::Written { points, ack } => info!(
            fetched = summary.fetched,
            retained = summary.retained,
            points,
            "done: {}",
            ack
        ),
        WriteOutcome::Skipped => info!(
            fetched = summary.fetched,
            retained = summary.retained,
            "done: nothing written"
        ),
    }
    Ok(())
}
