//! Input validation for mutations.

use crate::error::{CoreError, CoreResult};
use crate::types::{HeaderConfig, RouteHandler};

fn invalid(msg: impl Into<String>) -> CoreError {
    CoreError::ValidationError(msg.into())
}

/// Route fields shared by create and update requests.
pub(crate) struct RouteFields<'a> {
    pub domain: &'a str,
    pub path: Option<&'a str>,
    pub strip_prefix: Option<&'a str>,
    pub handler: &'a RouteHandler,
    pub headers: Option<&'a HeaderConfig>,
}

pub(crate) fn validate_route(fields: &RouteFields<'_>) -> CoreResult<()> {
    validate_domain(fields.domain)?;
    if let Some(path) = fields.path {
        validate_path("path", path)?;
    }
    if let Some(prefix) = fields.strip_prefix {
        validate_path("strip_prefix", prefix)?;
    }
    validate_handler(fields.handler)?;
    if let Some(headers) = fields.headers {
        validate_headers(headers)?;
    }
    Ok(())
}

/// Host match: bare host name, optionally with a leading `*.` wildcard label.
pub(crate) fn validate_domain(domain: &str) -> CoreResult<()> {
    let domain = domain.trim();
    if domain.is_empty() {
        return Err(invalid("domain is required"));
    }
    if domain.contains("://") {
        return Err(invalid(format!(
            "domain '{domain}' must not include a scheme"
        )));
    }
    if domain.contains('/') || domain.chars().any(char::is_whitespace) {
        return Err(invalid(format!(
            "domain '{domain}' must be a bare host name"
        )));
    }
    Ok(())
}

fn validate_path(field: &str, value: &str) -> CoreResult<()> {
    if !value.starts_with('/') {
        return Err(invalid(format!("{field} '{value}' must start with '/'")));
    }
    Ok(())
}

fn validate_handler(handler: &RouteHandler) -> CoreResult<()> {
    match handler {
        RouteHandler::Unsupported { handler_type, .. } => Err(invalid(format!(
            "unsupported handler type '{handler_type}' (expected one of: {}, {}, {})",
            RouteHandler::REVERSE_PROXY,
            RouteHandler::FILE_SERVER,
            RouteHandler::REDIRECT
        ))),
        RouteHandler::Redirect(cfg) => match cfg.status_code {
            Some(code) if !(300..=399).contains(&code) => Err(invalid(format!(
                "redirect status code {code} is not a 3xx status"
            ))),
            _ => Ok(()),
        },
        RouteHandler::ReverseProxy(_) | RouteHandler::FileServer(_) => Ok(()),
    }
}

fn validate_headers(headers: &HeaderConfig) -> CoreResult<()> {
    let names = headers
        .set
        .keys()
        .chain(headers.add.keys())
        .chain(headers.delete.iter());
    for name in names {
        if name.trim().is_empty() {
            return Err(invalid("header names must not be empty"));
        }
    }
    Ok(())
}

/// Instance and route IDs end up in URLs and log lines.
pub(crate) fn validate_id(kind: &str, id: &str) -> CoreResult<()> {
    if id.is_empty() || id.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(invalid(format!("{kind} id '{id}' is not valid")));
    }
    Ok(())
}

pub(crate) fn validate_name(name: &str) -> CoreResult<()> {
    if name.trim().is_empty() {
        return Err(invalid("name is required"));
    }
    Ok(())
}
