use chrono::Utc;
use tracing::{info, instrument};

use crate::config::Config;
use crate::error::PipelineError;
use crate::influx::{query_at, InfluxClient, WriteAck, WriteQuery};
use crate::record::DatedCase;

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    Written { points: usize, ack: WriteAck },
    /// Nothing matched and `skip_empty_batch` was set.
    Skipped,
}

/// One point per case: fixed measurement, no tags, `<province>=<total cases>`.
pub fn build_points(cases: &[DatedCase], config: &Config) -> Result<Vec<WriteQuery>, PipelineError> {
    cases
        .iter()
        .map(|c| {
            let timestamp = c.timestamp.with_timezone(&Utc);
            query_at(&config.measurement, timestamp)
                .map(|q| q.add_field(c.province(), c.total_cases()))
                .ok_or_else(|| {
                    PipelineError::write(
                        &config.influx.database,
                        format!("{} for {} is outside the nanosecond range", timestamp, c.province()),
                    )
                })
        })
        .collect()
}

/// Ping the database, then write all `cases` as a single batch.
///
/// Nothing is sent if the ping fails. With no cases the batch is still written
/// (zero points) unless `skip_empty_batch` is set.
#[instrument(level = "info", skip_all, fields(database = %config.influx.database, cases = cases.len()))]
pub fn save_region_cases(
    client: &InfluxClient,
    config: &Config,
    cases: &[DatedCase],
) -> Result<WriteOutcome, PipelineError> {
    let ping = client.ping()?;
    info!(
        url = %client.base_url(),
        version = ping.version.as_deref().unwrap_or("unknown"),
        elapsed = ?ping.elapsed,
        "database reachable"
    );

    if cases.is_empty() && config.skip_empty_batch {
        info!("no records for {}, skipping write", config.region);
        return Ok(WriteOutcome::Skipped);
    }

    for c in cases {
        info!(
            province = c.province(),
            abbrev = %c.record.province_abbrev,
            cases = c.total_cases(),
            timestamp = %c.timestamp,
            "case"
        );
    }

    let points = build_points(cases, config)?;
    let ack = client.write(&config.influx.database, &points)?;
    info!(points = points.len(), %ack, "write acknowledged");

    Ok(WriteOutcome::Written {
        points: points.len(),
        ack,
    })
}
