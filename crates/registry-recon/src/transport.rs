//! HTTP transport abstraction and its reqwest implementation.
//!
//! A transport performs exactly one exchange per call. Retries and error
//! classification live in [`crate::requestor`].

use std::time::Duration;

use async_trait::async_trait;

use crate::config::ClientSettings;
use crate::error::{ConfigError, HttpError};
use crate::request::{Method, RequestSpec, Response};

/// Something that can perform a single HTTP exchange.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `spec` once. Status >= 400 and network failures are `Err`.
    async fn send(&self, spec: &RequestSpec) -> Result<Response, HttpError>;
}

/// Transport backed by a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(settings: &ClientSettings) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(settings.user_agent.as_str())
            .cookie_store(true)
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, spec: &RequestSpec) -> Result<Response, HttpError> {
        let mut builder = match spec.method {
            Method::Get => self.client.get(&spec.url),
            Method::Post => self.client.post(&spec.url),
        };

        if let Some(auth) = &spec.auth {
            builder = builder.basic_auth(&auth.username, Some(&auth.password));
        }
        if !spec.query.is_empty() {
            builder = builder.query(&spec.query);
        }
        if let Some(form) = &spec.form {
            builder = builder.form(form);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| HttpError::network(spec, e.to_string()))?;

        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();

        if status >= 400 {
            return Err(HttpError::from_status(spec, final_url, status));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| HttpError::network(spec, format!("reading body: {e}")))?;

        Ok(Response {
            url: final_url,
            status,
            body,
            request: spec.clone(),
        })
    }
}
