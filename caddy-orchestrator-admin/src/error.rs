use serde::{Deserialize, Serialize};

/// Unified error type for all admin API operations.
///
/// Every variant carries the `instance` base URL the call was made against,
/// so errors from different managed servers stay distinguishable in logs and
/// in warnings attached to mutation results.
///
/// # Transient Errors
///
/// The following variants represent conditions that may clear on their own:
/// - [`Transport`](Self::Transport): connection refused or reset
/// - [`Timeout`](Self::Timeout): the request did not complete in time
/// - [`Upstream`](Self::Upstream) with a 5xx status
///
/// The client itself never retries; see [`is_transient`](Self::is_transient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code")]
pub enum AdminError {
    /// The instance could not be reached at the network level.
    Transport {
        /// Admin API base URL.
        instance: String,
        /// Error details.
        detail: String,
    },

    /// The request timed out.
    Timeout {
        /// Admin API base URL.
        instance: String,
        /// Error details.
        detail: String,
    },

    /// A read answered with a non-success status.
    Upstream {
        /// Admin API base URL.
        instance: String,
        /// HTTP status returned by the instance.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// The instance refused a configuration load.
    ApplyRejected {
        /// Admin API base URL.
        instance: String,
        /// HTTP status returned by the instance.
        status: u16,
        /// Response body, usually Caddy's explanation of the rejection.
        body: String,
    },

    /// The admin base URL is not a usable absolute http(s) URL.
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        detail: String,
    },

    /// Failed to parse the instance's response body.
    ParseError {
        /// Admin API base URL.
        instance: String,
        /// Details about the parse failure.
        detail: String,
    },

    /// Failed to serialize a request body.
    SerializationError {
        /// Admin API base URL.
        instance: String,
        /// Details about the serialization failure.
        detail: String,
    },
}

impl AdminError {
    /// Whether the failure may succeed if the same call is repeated later.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::Timeout { .. } => true,
            Self::Upstream { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Whether the failure is an operational condition (instance down, config
    /// refused, bad URL) rather than a defect, used to pick the log level.
    ///
    /// `true` logs at `warn`, `false` at `error`.
    /// **Keep in sync when adding variants.**
    #[must_use]
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. }
                | Self::Timeout { .. }
                | Self::ApplyRejected { .. }
                | Self::InvalidUrl { .. }
        )
    }

    /// The admin base URL (or rejected URL) this error refers to.
    #[must_use]
    pub fn instance(&self) -> &str {
        match self {
            Self::Transport { instance, .. }
            | Self::Timeout { instance, .. }
            | Self::Upstream { instance, .. }
            | Self::ApplyRejected { instance, .. }
            | Self::ParseError { instance, .. }
            | Self::SerializationError { instance, .. } => instance,
            Self::InvalidUrl { url, .. } => url,
        }
    }
}

impl std::fmt::Display for AdminError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport { instance, detail } => {
                write!(f, "[{instance}] Admin API unreachable: {detail}")
            }
            Self::Timeout { instance, detail } => {
                write!(f, "[{instance}] Admin API timed out: {detail}")
            }
            Self::Upstream {
                instance,
                status,
                body,
            } => {
                if body.is_empty() {
                    write!(f, "[{instance}] Admin API returned HTTP {status}")
                } else {
                    write!(f, "[{instance}] Admin API returned HTTP {status}: {body}")
                }
            }
            Self::ApplyRejected {
                instance,
                status,
                body,
            } => {
                if body.is_empty() {
                    write!(f, "[{instance}] Config rejected (HTTP {status})")
                } else {
                    write!(f, "[{instance}] Config rejected (HTTP {status}): {body}")
                }
            }
            Self::InvalidUrl { url, detail } => {
                write!(f, "Invalid admin URL '{url}': {detail}")
            }
            Self::ParseError { instance, detail } => {
                write!(f, "[{instance}] Parse error: {detail}")
            }
            Self::SerializationError { instance, detail } => {
                write!(f, "[{instance}] Serialization error: {detail}")
            }
        }
    }
}

impl std::error::Error for AdminError {}

/// Convenience type alias for `Result<T, AdminError>`.
pub type Result<T> = std::result::Result<T, AdminError>;
