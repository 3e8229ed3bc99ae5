use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use sdr_funnel::config::AppConfig;
use sdr_funnel::workflows::funnel::domain::{Deal, RepDirectory};
use sdr_funnel::workflows::hubspot::{CrmError, DealScope, DealSource, FileDealSource, HubSpotClient};
use sdr_funnel::workflows::publish::ReportStore;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) store: Arc<ReportStore>,
}

/// Live HubSpot access, or a saved export passed with `--deals-file`.
pub(crate) enum ConfiguredSource {
    HubSpot(HubSpotClient),
    File(FileDealSource),
}

impl ConfiguredSource {
    pub(crate) fn from_config(
        config: &AppConfig,
        deals_file: Option<PathBuf>,
    ) -> Result<Self, CrmError> {
        match deals_file {
            Some(path) => Ok(Self::File(FileDealSource::new(
                path,
                config.pipeline.stages.clone(),
            ))),
            None => HubSpotClient::new(&config.hubspot, &config.pipeline).map(Self::HubSpot),
        }
    }
}

impl DealSource for ConfiguredSource {
    async fn owners(&self) -> Result<RepDirectory, CrmError> {
        match self {
            Self::HubSpot(client) => client.owners().await,
            Self::File(file) => file.owners().await,
        }
    }

    async fn deals(&self, scope: DealScope) -> Result<Vec<Deal>, CrmError> {
        match self {
            Self::HubSpot(client) => client.deals(scope).await,
            Self::File(file) => file.deals(scope).await,
        }
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).map_err(serde::de::Error::custom)
}
