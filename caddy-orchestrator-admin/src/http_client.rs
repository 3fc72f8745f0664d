//! Shared request plumbing for the admin client.
//!
//! Sends one request, logs it, and maps transport failures. Status handling
//! is left to the caller because reads and loads classify failures differently.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::error::AdminError;
use crate::types::ClientOptions;
use crate::utils::log_sanitizer::summarize_body;

/// HTTP helpers for admin API calls
pub struct HttpUtils;

impl HttpUtils {
    /// Performs an HTTP request and returns status code and body text.
    ///
    /// # Arguments
    /// * `request_builder` - fully configured request
    /// * `instance` - admin base URL (for logs and errors)
    /// * `method_name` - "GET", "POST", ... (for logs)
    /// * `path` - request path (for logs)
    ///
    /// # Returns
    /// * `Ok((status_code, response_text))` for any HTTP response, success or not
    /// * `Err(AdminError::Timeout | AdminError::Transport)` when no response arrived
    pub async fn execute_request(
        request_builder: RequestBuilder,
        instance: &str,
        method_name: &str,
        path: &str,
    ) -> Result<(u16, String), AdminError> {
        log::debug!("[{instance}] {method_name} {path}");

        let response = request_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                AdminError::Timeout {
                    instance: instance.to_string(),
                    detail: e.to_string(),
                }
            } else {
                AdminError::Transport {
                    instance: instance.to_string(),
                    detail: e.to_string(),
                }
            }
        })?;

        let status_code = response.status().as_u16();
        log::debug!("[{instance}] Response Status: {status_code}");

        let response_text = response.text().await.map_err(|e| AdminError::Transport {
            instance: instance.to_string(),
            detail: format!("Failed to read response body: {e}"),
        })?;

        log::debug!("[{instance}] Response Body: {}", summarize_body(&response_text));

        Ok((status_code, response_text))
    }

    /// Parse a JSON response body.
    ///
    /// An empty body parses as `null`, which is what Caddy returns for an
    /// unset config path.
    pub fn parse_json<T>(response_text: &str, instance: &str) -> Result<T, AdminError>
    where
        T: DeserializeOwned,
    {
        let text = if response_text.trim().is_empty() {
            "null"
        } else {
            response_text
        };
        serde_json::from_str(text).map_err(|e| {
            log::error!("[{instance}] JSON parse failed: {e}");
            log::error!("[{instance}] Raw response: {}", summarize_body(response_text));
            AdminError::ParseError {
                instance: instance.to_string(),
                detail: e.to_string(),
            }
        })
    }
}

/// 2xx check used by every call.
pub(crate) fn is_success(status_code: u16) -> bool {
    (200..300).contains(&status_code)
}

/// Build a reqwest client with the configured timeouts.
pub(crate) fn create_http_client(
    instance: &str,
    options: &ClientOptions,
) -> Result<Client, AdminError> {
    Client::builder()
        .connect_timeout(options.connect_timeout)
        .timeout(options.request_timeout.max(Duration::from_millis(1)))
        .build()
        .map_err(|e| AdminError::Transport {
            instance: instance.to_string(),
            detail: format!("Failed to create HTTP client: {e}"),
        })
}
