//! Client settings, endpoint resolution and connector parameter parsing.

use std::time::Duration;

use serde_json::Value;

use crate::error::ConfigError;
use crate::types::Parameters;

pub const DEFAULT_LAND_REGISTRY_URL: &str =
    "https://eservices.landregistry.gov.uk/wps/portal/Property_Search";
pub const DEFAULT_COMPANIES_HOUSE_URL: &str = "https://api.companieshouse.gov.uk";
pub const DEFAULT_COMPANY_SEARCH_URL: &str = "https://api.company-information.service.gov.uk";

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_USER_AGENT: &str = concat!("registry-recon/", env!("CARGO_PKG_VERSION"));

/// Environment variable holding a Companies House API key.
pub const API_KEY_ENV: &str = "COMPANIES_HOUSE_API_KEY";

/// Base URLs of the remote registries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Land Registry portal landing page (the first GET).
    pub land_registry: String,
    /// Companies House API root for officer listings.
    pub companies_house: String,
    /// Companies House API root for company search.
    pub company_search: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            land_registry: DEFAULT_LAND_REGISTRY_URL.to_string(),
            companies_house: DEFAULT_COMPANIES_HOUSE_URL.to_string(),
            company_search: DEFAULT_COMPANY_SEARCH_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Defaults, overridden by `REGISTRY_RECON_*_URL` variables when set.
    pub fn from_env() -> Self {
        Self {
            land_registry: env_or_default(
                "REGISTRY_RECON_LAND_REGISTRY_URL",
                DEFAULT_LAND_REGISTRY_URL,
            ),
            companies_house: env_or_default(
                "REGISTRY_RECON_COMPANIES_HOUSE_URL",
                DEFAULT_COMPANIES_HOUSE_URL,
            ),
            company_search: env_or_default(
                "REGISTRY_RECON_COMPANY_SEARCH_URL",
                DEFAULT_COMPANY_SEARCH_URL,
            ),
        }
    }

    /// Point every endpoint at one server, keeping the default paths.
    pub fn rooted_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            land_registry: format!("{base}/wps/portal/Property_Search"),
            companies_house: base.to_string(),
            company_search: base.to_string(),
        }
    }
}

/// Exponential backoff between request attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            max: Duration::from_secs(30),
        }
    }
}

impl Backoff {
    /// No delay between attempts.
    pub fn none() -> Self {
        Self {
            base: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base.saturating_mul(factor).min(self.max)
    }
}

/// Settings for the HTTP client shared by every connector.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub timeout_ms: u64,
    pub user_agent: String,
    pub endpoints: Endpoints,
    pub backoff: Backoff,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            endpoints: Endpoints::default(),
            backoff: Backoff::default(),
        }
    }
}

impl ClientSettings {
    /// Resolve settings: explicit value > environment > default.
    pub fn resolve(explicit_timeout_ms: Option<u64>) -> Self {
        let timeout_ms = explicit_timeout_ms
            .or_else(|| {
                std::env::var("REGISTRY_RECON_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
            })
            .unwrap_or(DEFAULT_TIMEOUT_MS);

        Self {
            timeout_ms,
            endpoints: Endpoints::from_env(),
            ..Self::default()
        }
    }
}

/// `env_var` when set and non-blank, otherwise `default`.
fn env_or_default(env_var: &str, default: &str) -> String {
    if let Ok(value) = std::env::var(env_var) {
        if !value.trim().is_empty() {
            return value;
        }
    }
    default.to_string()
}

// ── connector parameters ──

/// An optional string parameter. Empty strings count as absent.
pub fn optional_str(params: &Parameters, name: &'static str) -> Result<Option<String>, ConfigError> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(other) => Err(ConfigError::InvalidParameter {
            name,
            reason: format!("expected a string, got {other}"),
        }),
    }
}

pub fn required_str(params: &Parameters, name: &'static str) -> Result<String, ConfigError> {
    optional_str(params, name)?.ok_or(ConfigError::MissingParameter(name))
}

/// An optional integer parameter within `min..=max`. Accepts numbers and
/// numeric strings, since CLI parameters arrive as text.
pub fn optional_bounded(
    params: &Parameters,
    name: &'static str,
    min: u64,
    max: u64,
) -> Result<Option<u64>, ConfigError> {
    let value = match params.get(name) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(None),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        Some(Value::Number(n)) => n.as_u64(),
        Some(_) => None,
    };
    match value {
        Some(v) if (min..=max).contains(&v) => Ok(Some(v)),
        _ => Err(ConfigError::InvalidParameter {
            name,
            reason: format!("expected an integer between {min} and {max}"),
        }),
    }
}
