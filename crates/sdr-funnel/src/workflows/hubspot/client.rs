use super::records::{owner_directory, search_properties, DealRecord, OwnerRecord, Page, SearchRequest};
use super::retry::{FailureClass, RetryPolicy};
use super::{CrmError, DealScope, DealSource};
use crate::config::{HubSpotConfig, PipelineConfig};
use crate::workflows::funnel::domain::{Deal, RepDirectory, StageTable};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const OWNERS_PAGE_SIZE: u32 = 200;

/// HubSpot CRM client for the SDR pipeline.
#[derive(Clone)]
pub struct HubSpotClient {
    inner: Arc<HubSpotClientInner>,
    retry: RetryPolicy,
}

struct HubSpotClientInner {
    http: reqwest::Client,
    base_url: String,
    pipeline_id: String,
    stages: StageTable,
    properties: Vec<String>,
}

impl HubSpotClient {
    /// Builds a client from configuration.
    ///
    /// # Errors
    ///
    /// Fails when no API token is configured or the HTTP client cannot be built.
    pub fn new(config: &HubSpotConfig, pipeline: &PipelineConfig) -> Result<Self, CrmError> {
        let token = config.api_token.as_ref().ok_or(CrmError::MissingToken)?;

        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|err| CrmError::Config(format!("invalid API token format: {err}")))?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(HubSpotClientInner {
                http,
                base_url: config.base_url.trim_end_matches('/').to_string(),
                pipeline_id: pipeline.pipeline_id.clone(),
                properties: search_properties(&pipeline.stages),
                stages: pipeline.stages.clone(),
            }),
            retry: RetryPolicy::default().with_max_attempts(config.max_attempts),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    async fn fetch_owners(&self) -> Result<Vec<OwnerRecord>, CrmError> {
        let mut owners = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let page: Page<OwnerRecord> = self
                .send_with_retry(|| self.owners_request(after.as_deref()))
                .await?;
            after = page.next_cursor();
            owners.extend(page.results);

            if after.is_none() {
                break;
            }
        }

        Ok(owners)
    }

    fn owners_request(&self, after: Option<&str>) -> reqwest::RequestBuilder {
        let request = self
            .inner
            .http
            .get(format!("{}/crm/v3/owners", self.inner.base_url))
            .query(&[("limit", OWNERS_PAGE_SIZE)]);
        match after {
            Some(cursor) => request.query(&[("after", cursor)]),
            None => request,
        }
    }

    async fn search_deals(&self, scope: DealScope) -> Result<Vec<DealRecord>, CrmError> {
        let url = format!("{}/crm/v3/objects/deals/search", self.inner.base_url);
        let mut records = Vec::new();
        let mut after: Option<String> = None;
        let mut page_number = 0_u32;

        loop {
            let request = SearchRequest::new(
                &self.inner.pipeline_id,
                scope,
                &self.inner.properties,
                after.as_deref(),
            );
            let page: Page<DealRecord> = self
                .send_with_retry(|| self.inner.http.post(&url).json(&request))
                .await?;

            page_number += 1;
            debug!(
                page = page_number,
                fetched = page.results.len(),
                total = records.len() + page.results.len(),
                "fetched deal search page"
            );

            let next = page.next_cursor();
            records.extend(page.results);
            if next.is_none() {
                break;
            }
            after = next;
            tokio::time::sleep(self.retry.page_pause).await;
        }

        Ok(records)
    }

    async fn send_with_retry<T, F>(&self, build: F) -> Result<T, CrmError>
    where
        T: DeserializeOwned,
        F: Fn() -> reqwest::RequestBuilder,
    {
        let policy = &self.retry;
        let mut attempt = 0_u32;

        loop {
            attempt += 1;
            let failure = match build().send().await {
                Ok(response) if response.status() == StatusCode::TOO_MANY_REQUESTS => {
                    FailureClass::rate_limited(
                        response
                            .headers()
                            .get(RETRY_AFTER)
                            .and_then(|value| value.to_str().ok()),
                    )
                }
                Ok(response) => return handle_response(response).await,
                Err(error) => match FailureClass::from_transport(&error) {
                    Some(failure) => failure,
                    None => return Err(error.into()),
                },
            };

            if !policy.allows_retry(attempt) {
                return Err(CrmError::RetriesExhausted {
                    attempts: attempt,
                    last: failure.to_string(),
                });
            }

            let wait = policy.wait_for(failure);
            warn!(
                %failure,
                attempt,
                max_attempts = policy.max_attempts,
                wait_secs = wait.as_secs(),
                "HubSpot request failed, retrying"
            );
            tokio::time::sleep(wait).await;
        }
    }
}

async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, CrmError> {
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(CrmError::Unauthorized);
    }

    let body = response.text().await?;
    if !status.is_success() {
        return Err(CrmError::Api {
            status: status.as_u16(),
            message: body,
        });
    }

    Ok(serde_json::from_str(&body)?)
}

impl DealSource for HubSpotClient {
    async fn owners(&self) -> Result<RepDirectory, CrmError> {
        let owners = self.fetch_owners().await?;
        info!(owners = owners.len(), "loaded HubSpot owners");
        Ok(owner_directory(&owners))
    }

    async fn deals(&self, scope: DealScope) -> Result<Vec<Deal>, CrmError> {
        let records = self.search_deals(scope).await?;
        info!(deals = records.len(), ?scope, "loaded HubSpot deals");
        Ok(records
            .into_iter()
            .map(|record| record.into_deal(&self.inner.stages))
            .collect())
    }
}
