// src/influx/mod.rs

//! Minimal blocking client for the InfluxDB 1.x HTTP API: `/ping` and `/write`.
//! Points are encoded by `influxdb::WriteQuery`; only the transport lives here.

use chrono::{DateTime, Utc};
use influxdb::Query;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::{
    fmt,
    time::{Duration, Instant},
};
use tracing::{debug, instrument};
use url::Url;

use crate::config::InfluxConfig;
use crate::error::PipelineError;
pub use influxdb::{Timestamp, WriteQuery};

const VERSION_HEADER: &str = "x-influxdb-version";

pub struct InfluxClient {
    http: Client,
    base: Url,
    credentials: Option<(String, Option<String>)>,
}

#[derive(Debug, Clone)]
pub struct PingInfo {
    pub version: Option<String>,
    pub elapsed: Duration,
}

/// What the server answered to a successful write. Not inspected further.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteAck {
    pub status: u16,
    pub version: Option<String>,
    pub body: String,
}

impl fmt::Display for WriteAck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "status={} version={} body={:?}",
            self.status,
            self.version.as_deref().unwrap_or("-"),
            self.body
        )
    }
}

/// A write query stamped at nanosecond precision, or `None` for instants
/// before the epoch or past 2262.
pub fn query_at(measurement: &str, timestamp: DateTime<Utc>) -> Option<WriteQuery> {
    let nanos = u128::try_from(timestamp.timestamp_nanos_opt()?).ok()?;
    Some(WriteQuery::new(Timestamp::Nanoseconds(nanos), measurement))
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl InfluxClient {
    pub fn new(http: Client, config: &InfluxConfig) -> Result<Self, PipelineError> {
        let base = Url::parse(&config.url).map_err(|e| {
            PipelineError::Connectivity(format!("invalid database url {:?}: {}", config.url, e))
        })?;
        if !matches!(base.scheme(), "http" | "https")
            || base.host_str().is_none()
            || base.cannot_be_a_base()
        {
            return Err(PipelineError::Connectivity(format!(
                "database url {:?} is not an http(s) endpoint",
                config.url
            )));
        }

        let credentials = config
            .username
            .clone()
            .map(|user| (user, config.password.clone()));
        Ok(Self {
            http,
            base,
            credentials,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Liveness check. Any transport error or non-2xx answer means unreachable.
    #[instrument(level = "debug", skip(self), fields(url = %self.base))]
    pub fn ping(&self) -> Result<PingInfo, PipelineError> {
        let start = Instant::now();
        let resp = self
            .authorize(self.http.get(self.endpoint("ping")))
            .send()
            .map_err(|e| PipelineError::Connectivity(format!("ping {} failed: {}", self.base, e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PipelineError::Connectivity(format!(
                "ping {} returned {}",
                self.base, status
            )));
        }
        Ok(PingInfo {
            version: server_version(&resp),
            elapsed: start.elapsed(),
        })
    }

    /// Submit every point in one request. An empty slice sends an empty body.
    #[instrument(level = "debug", skip(self, points), fields(points = points.len()))]
    pub fn write(&self, database: &str, points: &[WriteQuery]) -> Result<WriteAck, PipelineError> {
        let body = points
            .iter()
            .map(|q| {
                q.build()
                    .map(|line| line.get())
                    .map_err(|e| PipelineError::write(database, format!("encoding point: {}", e)))
            })
            .collect::<Result<Vec<_>, _>>()?
            .join("\n");

        let mut url = self.endpoint("write");
        url.query_pairs_mut()
            .append_pair("db", database)
            .append_pair("precision", "ns");
        debug!(%url, bytes = body.len(), "posting batch");

        let resp = self
            .authorize(self.http.post(url))
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body)
            .send()
            .map_err(|e| PipelineError::write(database, e))?;

        let status = resp.status();
        let version = server_version(&resp);
        let text = resp.text().map_err(|e| PipelineError::write(database, e))?;
        if !status.is_success() {
            let reason = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.error)
                .unwrap_or(text);
            return Err(PipelineError::write(database, format!("{}: {}", status, reason)));
        }

        Ok(WriteAck {
            status: status.as_u16(),
            version,
            body: text,
        })
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(path);
        }
        url
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Some((user, password)) => req.basic_auth(user, password.as_deref()),
            None => req,
        }
    }
}

fn server_version(resp: &Response) -> Option<String> {
    resp.headers()
        .get(VERSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
