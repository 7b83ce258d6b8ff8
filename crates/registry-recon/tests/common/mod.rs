//! Shared helpers for connector integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use registry_recon::{
    Backoff, Endpoints, HttpContext, HttpError, InputRow, Parameters, RequestSpec, Response,
    Transport,
};

type Handler = dyn Fn(&RequestSpec) -> (u16, String) + Send + Sync;

/// In-memory transport: answers every request through `handler` and keeps
/// a log of what was sent.
pub struct ScriptedTransport {
    handler: Box<Handler>,
    log: Mutex<Vec<RequestSpec>>,
}

impl ScriptedTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&RequestSpec) -> (u16, String) + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            log: Mutex::new(Vec::new()),
        })
    }

    /// Requests sent so far, in send order.
    pub fn sent(&self) -> Vec<RequestSpec> {
        self.log.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.log.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, spec: &RequestSpec) -> Result<Response, HttpError> {
        self.log.lock().unwrap().push(spec.clone());
        let (status, body) = (self.handler)(spec);
        if status >= 400 {
            return Err(HttpError::from_status(spec, spec.url.clone(), status));
        }
        Ok(Response {
            url: spec.url.clone(),
            status,
            body,
            request: spec.clone(),
        })
    }
}

pub fn context(transport: Arc<ScriptedTransport>) -> HttpContext {
    HttpContext::with_transport(transport, Endpoints::default(), Backoff::none())
}

/// Turn a JSON object literal into a row or parameter map.
pub fn object(value: Value) -> InputRow {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

pub fn params(value: Value) -> Parameters {
    object(value)
}

/// An officers page with `count` officers named `{prefix}-{i}`.
pub fn officers_page(total_results: u64, prefix: &str, count: usize) -> String {
    let items: Vec<Value> = (0..count)
        .map(|i| json!({"name": format!("{prefix}-{i}"), "officer_role": "director"}))
        .collect();
    json!({"total_results": total_results, "items": items}).to_string()
}
