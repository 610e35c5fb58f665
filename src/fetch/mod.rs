// src/fetch/mod.rs

use reqwest::blocking::Client;
use std::io::{BufReader, Read};
use tracing::{debug, info, instrument};

use crate::error::PipelineError;
use crate::record::CaseRecord;

/// Province-level feed published by the Italian Civil Protection department.
pub const PROVINCE_FEED_URL: &str =
    "https://raw.githubusercontent.com/pcm-dpc/COVID-19/master/dati-json/dpc-covid19-ita-province.json";

/// GET `url` once and decode the body as a JSON array of case records, in document order.
///
/// The response is moved into the decoder and dropped before returning, on the
/// success and the error path alike.
#[instrument(level = "info", skip(client))]
pub fn fetch_case_records(client: &Client, url: &str) -> Result<Vec<CaseRecord>, PipelineError> {
    debug!("GET {}", url);
    let resp = client
        .get(url)
        .send()
        .and_then(|resp| resp.error_for_status())
        .map_err(|e| PipelineError::network(url, e))?;

    let records = decode_case_records(resp).map_err(|e| {
        if e.is_io() {
            PipelineError::network(url, e)
        } else {
            PipelineError::Decode {
                url: url.to_string(),
                source: e,
            }
        }
    })?;

    info!("retrieved {} records", records.len());
    Ok(records)
}

/// Decode a feed document from any reader (live response, saved snapshot, fixture).
pub fn decode_case_records<R: Read>(reader: R) -> serde_json::Result<Vec<CaseRecord>> {
    serde_json::from_reader(BufReader::new(reader))
}
