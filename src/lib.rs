pub mod config;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod influx;
pub mod pipeline;
pub mod record;
pub mod write;

pub use config::{Config, ConfigError, ConfigOverrides};
pub use error::PipelineError;
pub use record::{CaseRecord, DatedCase};
