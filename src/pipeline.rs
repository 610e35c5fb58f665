use reqwest::blocking::Client;
use tracing::{info, instrument};

use crate::config::Config;
use crate::error::PipelineError;
use crate::fetch::fetch_case_records;
use crate::filter::filter_region;
use crate::influx::InfluxClient;
use crate::write::{save_region_cases, WriteOutcome};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug)]
pub struct RunSummary {
    pub fetched: usize,
    pub retained: usize,
    pub outcome: WriteOutcome,
}

/// fetch → filter → write, once. The first error ends the run.
#[instrument(level = "info", skip_all, fields(region = %config.region))]
pub fn run(config: &Config) -> Result<RunSummary, PipelineError> {
    let http = Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| PipelineError::Connectivity(format!("building http client: {}", e)))?;
    // a malformed database url fails here, before the feed is downloaded
    let influx = InfluxClient::new(http.clone(), &config.influx)?;

    let records = fetch_case_records(&http, &config.feed_url)?;
    let cases = filter_region(
        &records,
        &config.region,
        &config.date_format,
        config.timezone,
    )?;
    let outcome = save_region_cases(&influx, config, &cases)?;

    info!(
        fetched = records.len(),
        retained = cases.len(),
        "run complete"
    );
    Ok(RunSummary {
        fetched: records.len(),
        retained: cases.len(),
        outcome,
    })
}
