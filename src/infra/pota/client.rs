use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::aggregator::ActivationSummary;
use crate::config::{DEFAULT_API_ROOT, Settings};
use crate::fetch::{BasicClient, HttpClient, RetryPolicy, fetch_json_with};
use crate::model::{ActivationEvent, ContactRecord, decode_contacts, decode_listing, decode_records};
use crate::services::pota_api::PotaApi;

pub struct PotaClient<C: HttpClient = BasicClient> {
    base_url: String,
    http: C,
    id_token: Option<String>,
    retry: RetryPolicy,
}

impl PotaClient<BasicClient> {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let http = BasicClient::with_timeouts(Duration::from_secs(30), Duration::from_secs(10))?;
        Ok(Self::new(http, settings.api_root.clone(), settings.id_token.clone()))
    }
}

impl<C: HttpClient> PotaClient<C> {
    pub fn new(http: C, base_url: impl Into<String>, id_token: Option<String>) -> Self {
        let base_url = base_url.into();
        let base_url = if base_url.is_empty() {
            DEFAULT_API_ROOT.to_string()
        } else {
            base_url.trim_end_matches('/').to_string()
        };

        Self {
            base_url,
            http,
            id_token,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn get(&self, path: &str, bearer: Option<&str>) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        fetch_json_with(&self.http, &url, bearer, &self.retry).await
    }
}

#[async_trait]
impl<C: HttpClient> PotaApi for PotaClient<C> {
    #[instrument(skip(self))]
    async fn list_spots(&self) -> Result<Vec<ActivationEvent>> {
        let spots: Vec<ActivationEvent> = decode_records(self.get("/v1/spots", None).await?);
        debug!(count = spots.len(), "Fetched live spots");
        Ok(spots)
    }

    #[instrument(skip(self))]
    async fn park_activations(&self, reference: &str) -> Result<Vec<ActivationSummary>> {
        let reference = reference.trim();
        if reference.is_empty() {
            bail!("park reference is empty");
        }

        let value = self
            .get(&format!("/park/activations/{reference}?count=all"), None)
            .await
            .with_context(|| format!("failed to fetch activation history for {reference}"))?;
        let history: Vec<ActivationSummary> = decode_listing(value, "activations");
        debug!(count = history.len(), "Fetched activation history");
        Ok(history)
    }

    #[instrument(skip(self))]
    async fn user_activations(&self) -> Result<Vec<ContactRecord>> {
        let Some(token) = self.id_token.as_deref() else {
            bail!("POTA_ID_TOKEN is not set; user activations need a signed-in token");
        };

        let value = self.get("/user/activations?all=1", Some(token)).await?;
        let records = decode_contacts(value);
        debug!(count = records.len(), "Fetched user activations");
        Ok(records)
    }
}
