//! Backend API client — one struct implementing every collaborator trait.
//!
//! All endpoints live under the same base URL and share the bearer token,
//! so a single client with per-operation paths is enough.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;

use brandpulse_core::config::ServicesConfig;
use brandpulse_core::error::{BrandPulseError, Result};
use brandpulse_core::traits::{
    AlertEvaluator, Collaborators, GeoScorer, MentionCollector, Notifier, ReportSender,
    SeoAnalyzer,
};
use brandpulse_core::types::{AlertCandidate, GeoScore, MentionBatch, ReportReceipt};

/// HTTP client for the BrandPulse backend services.
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl BackendClient {
    pub fn new(config: &ServicesConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BrandPulseError::Service(format!("HTTP client init: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// POST a JSON body and return the response once the status checks out.
    async fn post(&self, path: &str, body: serde_json::Value) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| BrandPulseError::Service(format!("POST {path} failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(BrandPulseError::Service(format!(
                "POST {path}: {status}: {text}"
            )));
        }
        tracing::debug!("📤 POST {path}: {status}");
        Ok(resp)
    }

    /// POST and decode a JSON response.
    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<T> {
        self.post(path, body)
            .await?
            .json::<T>()
            .await
            .map_err(|e| BrandPulseError::Service(format!("POST {path}: bad response: {e}")))
    }

    /// POST where only the acknowledgement matters.
    async fn post_ack(&self, path: &str, body: serde_json::Value) -> Result<()> {
        self.post(path, body).await.map(|_| ())
    }
}

#[async_trait]
impl MentionCollector for BackendClient {
    async fn collect(&self, brand_id: &str) -> Result<MentionBatch> {
        self.post_json("/v1/mentions/collect", json!({ "brand_id": brand_id }))
            .await
    }
}

#[async_trait]
impl SeoAnalyzer for BackendClient {
    async fn refresh(&self, brand_id: &str) -> Result<()> {
        self.post_ack("/v1/seo/refresh", json!({ "brand_id": brand_id }))
            .await
    }
}

#[async_trait]
impl GeoScorer for BackendClient {
    async fn compute(&self, brand_id: &str, user_id: &str) -> Result<GeoScore> {
        self.post_json(
            "/v1/geo/score",
            json!({ "brand_id": brand_id, "user_id": user_id }),
        )
        .await
    }
}

#[async_trait]
impl ReportSender for BackendClient {
    async fn deliver(&self, user_id: &str) -> Result<ReportReceipt> {
        self.post_json("/v1/reports/weekly", json!({ "user_id": user_id }))
            .await
    }
}

#[async_trait]
impl AlertEvaluator for BackendClient {
    async fn evaluate(&self, user_id: &str) -> Result<Vec<AlertCandidate>> {
        #[derive(serde::Deserialize)]
        struct Candidates {
            candidates: Vec<AlertCandidate>,
        }
        let resp: Candidates = self
            .post_json("/v1/alerts/evaluate", json!({ "user_id": user_id }))
            .await?;
        Ok(resp.candidates)
    }
}

#[async_trait]
impl Notifier for BackendClient {
    async fn notify(&self, user_id: &str, subject: &str, body: &str) -> Result<()> {
        self.post_ack(
            "/v1/notifications",
            json!({ "user_id": user_id, "subject": subject, "body": body }),
        )
        .await
    }
}

/// Build the full collaborator set from service config.
pub fn collaborators(config: &ServicesConfig) -> Result<Collaborators> {
    let client = Arc::new(BackendClient::new(config)?);
    Ok(Collaborators {
        mentions: client.clone(),
        seo: client.clone(),
        geo: client.clone(),
        reports: client.clone(),
        alerts: client.clone(),
        notifier: client,
    })
}
