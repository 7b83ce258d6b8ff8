//! Pieces shared by the Companies House connectors.

use url::Url;

use crate::error::{ConfigError, HttpError};
use crate::requestor::Classification;
use crate::types::Passthrough;

/// Upstream page size. Always the maximum the API allows.
pub const PAGE_SIZE: u64 = 100;

/// Classify a Companies House failure for the company identified by
/// `passthrough[key]`.
///
/// Rate limiting and bad credentials affect every row, so they abort the run.
/// Network failures are retried.
pub fn classify(err: &HttpError, passthrough: &Passthrough, key: &str) -> Classification {
    let company = passthrough.get(key).unwrap_or_default();
    match err.status {
        Some(404) => Classification::Recoverable(format!("Could not find company {company}")),
        Some(429) => Classification::Fatal("The rate limit has been reached".to_string()),
        Some(401) => {
            let api_key = err
                .request
                .auth
                .as_ref()
                .map(|a| a.username.as_str())
                .unwrap_or_default();
            Classification::Fatal(format!("API key {api_key} is invalid"))
        }
        Some(status) if status >= 400 => {
            Classification::Recoverable(format!("Received code {status} for company {company}"))
        }
        _ => Classification::Retry,
    }
}

/// Parse and validate an API root.
pub fn api_root(base: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(base).map_err(|e| ConfigError::InvalidEndpoint {
        url: base.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEndpoint {
            url: base.to_string(),
            reason: "not a base URL".to_string(),
        });
    }
    Ok(url)
}

/// `root` with `segments` appended, each percent-encoded.
pub fn endpoint(root: &Url, segments: &[&str]) -> String {
    let mut url = root.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url.into()
}
