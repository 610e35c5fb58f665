use thiserror::Error;

/// Every way a pipeline run can fail. All variants are fatal for the run.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Database endpoint is malformed, or it did not answer the ping.
    #[error("database connectivity: {0}")]
    Connectivity(String),

    /// The feed request did not complete, or its body could not be read.
    #[error("feed request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The feed body does not match the case record schema.
    #[error("feed body from {url} does not match the record schema: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// A retained record's date string could not be turned into a timestamp.
    #[error("cannot parse date {value:?} with format {format:?}: {reason}")]
    Parse {
        value: String,
        format: String,
        reason: String,
    },

    /// The batch write was rejected by the database or never reached it.
    #[error("batch write to database {database:?} failed: {reason}")]
    Write { database: String, reason: String },
}

impl PipelineError {
    pub fn network(
        url: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Network {
            url: url.into(),
            source: source.into(),
        }
    }

    pub fn write(database: impl Into<String>, reason: impl ToString) -> Self {
        Self::Write {
            database: database.into(),
            reason: reason.to_string(),
        }
    }
}
