//! Admin client factory.

use std::sync::Arc;

use url::Url;

use crate::client::CaddyAdminClient;
use crate::error::{AdminError, Result};
use crate::traits::AdminApi;
use crate::types::ClientOptions;

/// Validate and normalize an admin base URL.
///
/// Accepts absolute `http`/`https` URLs with a host and no query or fragment.
/// The returned form has no trailing slash, so paths can be appended directly.
///
/// ```rust
/// use caddy_orchestrator_admin::normalize_admin_url;
///
/// assert_eq!(
///     normalize_admin_url(" http://10.0.0.5:2019/ ").unwrap(),
///     "http://10.0.0.5:2019"
/// );
/// assert!(normalize_admin_url("10.0.0.5:2019").is_err());
/// ```
pub fn normalize_admin_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let invalid = |detail: &str| AdminError::InvalidUrl {
        url: trimmed.to_string(),
        detail: detail.to_string(),
    };

    let parsed = Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host"));
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(invalid("query and fragment are not allowed"));
    }

    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

/// Creates an [`AdminApi`] client for the instance at `base_url`.
///
/// The returned client is wrapped in `Arc<dyn AdminApi>` so it can be shared
/// between the sync path and the health monitor.
///
/// # Examples
///
/// ```rust,no_run
/// use caddy_orchestrator_admin::{create_admin_client, AdminApi, ClientOptions};
///
/// let client = create_admin_client("http://localhost:2019", &ClientOptions::default()).unwrap();
/// assert_eq!(client.base_url(), "http://localhost:2019");
/// ```
pub fn create_admin_client(base_url: &str, options: &ClientOptions) -> Result<Arc<dyn AdminApi>> {
    let base_url = normalize_admin_url(base_url)?;
    Ok(Arc::new(CaddyAdminClient::new(base_url, options)?))
}
