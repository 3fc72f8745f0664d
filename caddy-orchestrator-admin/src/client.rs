//! reqwest-backed [`AdminApi`] implementation.

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AdminError, Result};
use crate::http_client::{HttpUtils, create_http_client, is_success};
use crate::traits::AdminApi;
use crate::types::{CaddyConfig, ClientOptions};
use crate::utils::log_sanitizer::summarize_body;

/// Full configuration read.
pub(crate) const CONFIG_PATH: &str = "/config/";
/// Whole-document replace.
pub(crate) const LOAD_PATH: &str = "/load";
/// Cheap read used as a liveness probe.
pub(crate) const HEALTH_PATH: &str = "/config/admin";

/// Admin API client for one Caddy instance.
pub struct CaddyAdminClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
}

impl CaddyAdminClient {
    /// Create a client for `base_url` (already validated by the factory).
    pub(crate) fn new(base_url: String, options: &ClientOptions) -> Result<Self> {
        let client = create_http_client(&base_url, options)?;
        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn serialization_error(&self, detail: impl ToString) -> AdminError {
        AdminError::SerializationError {
            instance: self.base_url.clone(),
            detail: detail.to_string(),
        }
    }
}

#[async_trait]
impl AdminApi for CaddyAdminClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_config(&self) -> Result<serde_json::Value> {
        let request = self.client.get(self.url(CONFIG_PATH));
        let (status, body) =
            HttpUtils::execute_request(request, &self.base_url, "GET", CONFIG_PATH).await?;

        if !is_success(status) {
            return Err(AdminError::Upstream {
                instance: self.base_url.clone(),
                status,
                body: summarize_body(&body),
            });
        }

        HttpUtils::parse_json(&body, &self.base_url)
    }

    async fn apply_config(&self, config: &CaddyConfig) -> Result<()> {
        // Serialize up front so the exact bytes sent are the canonical form.
        let payload = config
            .to_canonical_json()
            .map_err(|e| self.serialization_error(e))?;

        let request = self
            .client
            .post(self.url(LOAD_PATH))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload);
        let (status, body) =
            HttpUtils::execute_request(request, &self.base_url, "POST", LOAD_PATH).await?;

        if !is_success(status) {
            log::warn!("[{}] Config load rejected with HTTP {status}", self.base_url);
            return Err(AdminError::ApplyRejected {
                instance: self.base_url.clone(),
                status,
                body: summarize_body(&body),
            });
        }

        log::info!("[{}] Config loaded", self.base_url);
        Ok(())
    }

    async fn health(&self) -> Result<()> {
        let request = self.client.get(self.url(HEALTH_PATH));
        let (status, body) =
            HttpUtils::execute_request(request, &self.base_url, "GET", HEALTH_PATH).await?;

        if is_success(status) {
            Ok(())
        } else {
            Err(AdminError::Upstream {
                instance: self.base_url.clone(),
                status,
                body: summarize_body(&body),
            })
        }
    }
}
