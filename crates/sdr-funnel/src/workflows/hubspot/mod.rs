//! CRM retrieval: the HubSpot search and owners APIs, or a saved export of them.
//!
//! Both sources hand the funnel plain [`Deal`] values and a [`RepDirectory`];
//! nothing downstream sees HubSpot's JSON shapes.

mod client;
mod file;
pub mod records;
pub mod retry;

pub use client::HubSpotClient;
pub use file::{DealExport, FileDealSource};
pub use records::{owner_directory, DealRecord, OwnerRecord};
pub use retry::{FailureClass, RetryPolicy};

use crate::workflows::funnel::domain::{Deal, RepDirectory};
use chrono::NaiveDate;
use std::future::Future;
use thiserror::Error;

/// Which deals of the pipeline to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DealScope {
    /// Deals whose last modification falls on the given UTC day.
    ModifiedOn(NaiveDate),
    /// Every deal in the pipeline, regardless of activity.
    EntirePipeline,
}

impl DealScope {
    /// Local filter applied by sources that cannot query by modification date.
    pub(crate) fn admits(&self, deal: &Deal) -> bool {
        match self {
            Self::EntirePipeline => true,
            Self::ModifiedOn(day) => deal
                .entered
                .values()
                .any(|timestamp| crate::workflows::funnel::dates::matches(Some(timestamp), *day)),
        }
    }
}

#[derive(Debug, Error)]
pub enum CrmError {
    #[error("HubSpot API token is not configured (set HUBSPOT_API_TOKEN)")]
    MissingToken,

    #[error("invalid HubSpot client configuration: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HubSpot API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("HubSpot rejected the API token")]
    Unauthorized,

    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    #[error("failed to read deal export: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse CRM payload: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Where pipeline deals and the owner directory come from.
pub trait DealSource {
    fn owners(&self) -> impl Future<Output = Result<RepDirectory, CrmError>> + Send;

    fn deals(&self, scope: DealScope) -> impl Future<Output = Result<Vec<Deal>, CrmError>> + Send;
}
