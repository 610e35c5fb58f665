use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// One observation for a province on a given date, as published by the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    #[serde(rename = "data")]
    pub date: String,
    #[serde(rename = "stato")]
    pub country: String,
    #[serde(rename = "codice_regione")]
    pub region_code: u32,
    #[serde(rename = "denominazione_regione")]
    pub region_name: String,
    #[serde(rename = "codice_provincia")]
    pub province_code: u32,
    #[serde(rename = "denominazione_provincia")]
    pub province_name: String,
    #[serde(rename = "sigla_provincia")]
    pub province_abbrev: String,
    // placeholder provinces ("In fase di definizione") publish null coordinates
    #[serde(rename = "lat", default)]
    pub latitude: Option<f64>,
    #[serde(rename = "long", default)]
    pub longitude: Option<f64>,
    #[serde(rename = "totale_casi")]
    pub total_cases: i64,
}

/// A record that survived region filtering, with its date resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct DatedCase {
    pub record: CaseRecord,
    pub timestamp: DateTime<Tz>,
}

impl DatedCase {
    pub fn province(&self) -> &str {
        &self.record.province_name
    }

    pub fn total_cases(&self) -> i64 {
        self.record.total_cases
    }
}
