//! Official registry snapshot fetcher.
//!
//! API: GET <base>?date=DD-MM-YYYY, CSV body. The registry is versioned by
//! date, so the same call on another day targets another snapshot.

use std::time::Duration;

use chrono::NaiveDate;
use communecheck_recon::{filter_level, parse_registry_csv, AdminLevel, RegistryRecord};

use crate::client::{FetchClient, FetchError};

/// Anything that can produce the registry records valid on a given date.
pub trait RegistrySource {
    fn fetch(&self, date: NaiveDate, level: AdminLevel) -> Result<Vec<RegistryRecord>, FetchError>;
}

pub struct RegistryFetcher {
    client: FetchClient,
    base_url: String,
}

impl RegistryFetcher {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        Ok(Self {
            client: FetchClient::new("BFS registry", timeout)?,
            base_url: base_url.to_string(),
        })
    }

    /// Query parameter value for `date` (`DD-MM-YYYY`).
    pub fn date_param(date: NaiveDate) -> String {
        date.format("%d-%m-%Y").to_string()
    }
}

impl RegistrySource for RegistryFetcher {
    fn fetch(&self, date: NaiveDate, level: AdminLevel) -> Result<Vec<RegistryRecord>, FetchError> {
        let date_param = Self::date_param(date);
        log::info!("fetching registry snapshot for {date_param}");

        let body = self
            .client
            .send_text(|http| http.get(&self.base_url).query(&[("date", date_param.as_str())]))?;

        let records = parse_registry_csv(&body)
            .map_err(|e| FetchError::Parse(format!("{}: {}", self.client.source_name(), e)))?;
        let total = records.len();
        let records = filter_level(records, level);

        log::info!(
            "registry returned {total} records, {} at {level} level",
            records.len()
        );
        Ok(records)
    }
}
