// src/filter.rs

use chrono::{DateTime, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use tracing::{debug, info};

use crate::error::PipelineError;
use crate::record::{CaseRecord, DatedCase};

/// Layout of the feed's `data` column (`YYYY-MM-DD hh:mm:ss`).
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a wall-clock timestamp and pin it to `tz`.
///
/// Times inside a DST fold resolve to the earlier instant; times inside a DST
/// gap do not exist and are rejected.
pub fn parse_timestamp(value: &str, format: &str, tz: Tz) -> Result<DateTime<Tz>, PipelineError> {
    let parse_err = |reason: String| PipelineError::Parse {
        value: value.to_string(),
        format: format.to_string(),
        reason,
    };

    let naive = NaiveDateTime::parse_from_str(value, format).map_err(|e| parse_err(e.to_string()))?;
    tz.from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| parse_err(format!("{} does not exist in {}", naive, tz)))
}

/// Keep the records of `region` with a positive case count, in feed order,
/// and resolve their dates. The first unparseable date fails the whole call.
pub fn filter_region(
    records: &[CaseRecord],
    region: &str,
    format: &str,
    tz: Tz,
) -> Result<Vec<DatedCase>, PipelineError> {
    let cases = records
        .iter()
        .filter(|r| r.region_name == region && r.total_cases > 0)
        .map(|r| {
            let timestamp = parse_timestamp(&r.date, format, tz)?;
            debug!(province = %r.province_name, cases = r.total_cases, %timestamp, "retained");
            Ok(DatedCase {
                record: r.clone(),
                timestamp,
            })
        })
        .collect::<Result<Vec<_>, PipelineError>>()?;

    info!(region, retained = cases.len(), of = records.len(), "filtered records");
    Ok(cases)
}
