//! Error types for connectors, requests and configuration.

use crate::request::RequestSpec;

/// A failed HTTP exchange, as seen by a classifier.
///
/// `status` is `None` when no response arrived (connect error, timeout).
#[derive(thiserror::Error, Debug, Clone)]
#[error("{method} {url} failed: {message}")]
pub struct HttpError {
    pub status: Option<u16>,
    pub method: &'static str,
    pub url: String,
    pub message: String,
    /// The request that failed, including its auth and passthrough.
    pub request: RequestSpec,
}

impl HttpError {
    pub fn from_status(request: &RequestSpec, url: String, status: u16) -> Self {
        Self {
            status: Some(status),
            method: request.method.as_str(),
            url,
            message: format!("HTTP status {status}"),
            request: request.clone(),
        }
    }

    pub fn network(request: &RequestSpec, message: impl Into<String>) -> Self {
        Self {
            status: None,
            method: request.method.as_str(),
            url: request.url.clone(),
            message: message.into(),
            request: request.clone(),
        }
    }
}

/// Why a single input row could not be reconciled.
#[derive(thiserror::Error, Debug, Clone)]
pub enum RowError {
    /// The identifying field is absent or empty. Raised before any request.
    #[error("No {what} found")]
    MissingField { what: &'static str, field: String },

    /// A classifier message scoped to this row.
    #[error("{0}")]
    Recoverable(String),

    /// The whole run is invalid; the abort signal has been triggered.
    #[error("{0}")]
    Fatal(String),

    /// A successful response did not have the expected structure.
    #[error("{0}")]
    Parse(String),

    /// An unclassified failure that outlived its retry budget.
    #[error(transparent)]
    Http(#[from] HttpError),
}

impl RowError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, RowError::Fatal(_))
    }
}

/// Invalid connector configuration, reported by `initialise`.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Unknown connector: {0}")]
    UnknownConnector(String),

    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Invalid endpoint URL {url}: {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("HTTP client error: {0}")]
    Client(String),
}

pub type RowResult<T> = Result<T, RowError>;
