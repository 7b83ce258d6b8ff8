//! Request and response envelopes passed between connectors and the transport.

use serde::de::DeserializeOwned;

use crate::error::RowError;
use crate::types::Passthrough;

/// HTTP method for a [`RequestSpec`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Method {
    #[default]
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// HTTP Basic credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    /// Companies House style: the API key is the username, password empty.
    pub fn api_key(key: &str) -> Self {
        Self {
            username: key.to_string(),
            password: String::new(),
        }
    }
}

/// Everything needed to issue one HTTP request, plus identifying context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    pub method: Method,
    pub url: String,
    pub auth: Option<BasicAuth>,
    pub query: Vec<(String, String)>,
    /// URL-encoded form body, sent when present.
    pub form: Option<Vec<(String, String)>>,
    pub passthrough: Passthrough,
}

impl RequestSpec {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            auth: None,
            query: Vec::new(),
            form: None,
            passthrough: Passthrough::new(),
        }
    }

    pub fn post_form(url: impl Into<String>, fields: &[(&str, &str)]) -> Self {
        Self {
            method: Method::Post,
            form: Some(
                fields
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            ..Self::get(url)
        }
    }

    pub fn with_auth(mut self, auth: BasicAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_passthrough(mut self, passthrough: Passthrough) -> Self {
        self.passthrough = passthrough;
        self
    }

    /// Value of a query parameter, if set.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A successful (status < 400) response.
#[derive(Debug, Clone)]
pub struct Response {
    /// Final URL after redirects.
    pub url: String,
    pub status: u16,
    pub body: String,
    /// The request that produced this response.
    pub request: RequestSpec,
}

impl Response {
    pub fn passthrough(&self) -> &Passthrough {
        &self.request.passthrough
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, RowError> {
        serde_json::from_str(&self.body)
            .map_err(|e| RowError::Parse(format!("Invalid JSON from {}: {e}", self.url)))
    }
}
