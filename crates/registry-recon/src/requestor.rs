//! Request executor with bounded retries and pluggable error classification.
//!
//! Each connector builds one [`Requestor`] from the caller's [`HttpContext`],
//! supplying an attempt budget and a classifier. The classifier decides, per
//! failure, whether the row is lost, the whole run is lost, or the request
//! should be tried again.

use std::sync::{Arc, OnceLock};

use tracing::{debug, error, warn};

use crate::config::{Backoff, ClientSettings, Endpoints};
use crate::error::{ConfigError, HttpError, RowError, RowResult};
use crate::request::{RequestSpec, Response};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::Passthrough;

/// What to do about a failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Fail this row with the given message. Sibling rows are unaffected.
    Recoverable(String),
    /// Abort the whole run with the given message.
    Fatal(String),
    /// Try again if the attempt budget allows.
    Retry,
}

/// Maps a failure and its passthrough to a [`Classification`].
pub type Classifier = Arc<dyn Fn(&HttpError, &Passthrough) -> Classification + Send + Sync>;

/// Attempt budget for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempts {
    Limited(u32),
    Unlimited,
}

impl Attempts {
    /// At least one attempt is always made.
    pub fn limited(n: u32) -> Self {
        Attempts::Limited(n.max(1))
    }

    /// Whether attempt number `n` (1-based) may be made.
    pub fn allows(&self, n: u32) -> bool {
        match self {
            Attempts::Limited(max) => n <= *max,
            Attempts::Unlimited => true,
        }
    }
}

/// Batch-wide termination channel.
///
/// Cloned into every requestor of a run. The first fatal message wins;
/// once triggered, no further request is sent through any holder.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    message: Arc<OnceLock<String>>,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fatal message. Later calls keep the first message.
    pub fn trigger(&self, message: &str) {
        if self.message.set(message.to_string()).is_ok() {
            error!("run aborted: {message}");
        }
    }

    pub fn is_triggered(&self) -> bool {
        self.message.get().is_some()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.get().map(String::as_str)
    }
}

/// Everything a connector needs from its caller: a transport, endpoint
/// locations, retry pacing and the shared abort signal.
#[derive(Clone)]
pub struct HttpContext {
    transport: Arc<dyn Transport>,
    endpoints: Endpoints,
    backoff: Backoff,
    abort: AbortSignal,
}

impl HttpContext {
    /// Build a context backed by reqwest.
    pub fn new(settings: &ClientSettings) -> Result<Self, ConfigError> {
        let transport = ReqwestTransport::new(settings)?;
        Ok(Self::with_transport(
            Arc::new(transport),
            settings.endpoints.clone(),
            settings.backoff,
        ))
    }

    pub fn with_transport(
        transport: Arc<dyn Transport>,
        endpoints: Endpoints,
        backoff: Backoff,
    ) -> Self {
        Self {
            transport,
            endpoints,
            backoff,
            abort: AbortSignal::new(),
        }
    }

    /// Share an existing abort signal instead of the context's own.
    pub fn with_abort(mut self, abort: AbortSignal) -> Self {
        self.abort = abort;
        self
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn abort(&self) -> &AbortSignal {
        &self.abort
    }

    /// Create a requestor with the given attempt budget and classifier.
    pub fn requestor<F>(&self, attempts: Attempts, classify: F) -> Requestor
    where
        F: Fn(&HttpError, &Passthrough) -> Classification + Send + Sync + 'static,
    {
        Requestor {
            transport: self.transport.clone(),
            attempts,
            classify: Arc::new(classify),
            backoff: self.backoff,
            abort: self.abort.clone(),
        }
    }
}

/// Executes requests for one connector instance.
#[derive(Clone)]
pub struct Requestor {
    transport: Arc<dyn Transport>,
    attempts: Attempts,
    classify: Classifier,
    backoff: Backoff,
    abort: AbortSignal,
}

impl Requestor {
    pub fn attempts(&self) -> Attempts {
        self.attempts
    }

    /// Send `spec`, retrying unclassified failures within the budget.
    pub async fn request(&self, spec: RequestSpec) -> RowResult<Response> {
        let mut attempt = 0u32;
        loop {
            if let Some(message) = self.abort.message() {
                return Err(RowError::Fatal(message.to_string()));
            }

            attempt += 1;
            debug!(
                method = spec.method.as_str(),
                url = %spec.url,
                attempt,
                "sending request"
            );

            let err = match self.transport.send(&spec).await {
                Ok(resp) => return Ok(resp),
                Err(err) => err,
            };

            match (self.classify)(&err, &spec.passthrough) {
                Classification::Recoverable(message) => {
                    debug!(url = %spec.url, status = ?err.status, "row failed: {message}");
                    return Err(RowError::Recoverable(message));
                }
                Classification::Fatal(message) => {
                    self.abort.trigger(&message);
                    return Err(RowError::Fatal(message));
                }
                Classification::Retry => {
                    if !self.attempts.allows(attempt + 1) {
                        warn!(url = %spec.url, attempt, "giving up: {err}");
                        return Err(RowError::Http(err));
                    }
                    let delay = self.backoff.delay(attempt);
                    warn!(
                        url = %spec.url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "retrying after error: {err}"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays a fixed list of outcomes and counts calls.
    struct Replay {
        outcomes: Mutex<Vec<Result<u16, Option<u16>>>>,
        calls: AtomicUsize,
    }

    impl Replay {
        fn new(mut outcomes: Vec<Result<u16, Option<u16>>>) -> Arc<Self> {
            outcomes.reverse();
            Arc::new(Self {
                outcomes: Mutex::new(outcomes),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for Replay {
        async fn send(&self, spec: &RequestSpec) -> Result<Response, HttpError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.outcomes.lock().unwrap().pop().unwrap_or(Ok(200));
            match next {
                Ok(status) => Ok(Response {
                    url: spec.url.clone(),
                    status,
                    body: String::new(),
                    request: spec.clone(),
                }),
                Err(Some(status)) => Err(HttpError::from_status(spec, spec.url.clone(), status)),
                Err(None) => Err(HttpError::network(spec, "connection reset")),
            }
        }
    }

    fn context(transport: Arc<Replay>) -> HttpContext {
        HttpContext::with_transport(transport, Endpoints::default(), Backoff::none())
    }

    fn spec() -> RequestSpec {
        RequestSpec::get("https://example.com/x")
            .with_passthrough(Passthrough::new().with("id", "42"))
    }

    fn always_retry(_: &HttpError, _: &Passthrough) -> Classification {
        Classification::Retry
    }

    #[test]
    fn test_attempts() {
        assert_eq!(Attempts::limited(0), Attempts::Limited(1));
        assert!(Attempts::Limited(2).allows(2));
        assert!(!Attempts::Limited(2).allows(3));
        assert!(Attempts::Unlimited.allows(u32::MAX));
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let replay = Replay::new(vec![Err(None), Err(Some(503)), Ok(200)]);
        let req = context(replay.clone()).requestor(Attempts::limited(3), always_retry);
        let resp = req.request(spec()).await.unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(replay.calls(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_budget_returns_http_error() {
        let replay = Replay::new(vec![Err(Some(500)), Err(Some(502)), Ok(200)]);
        let req = context(replay.clone()).requestor(Attempts::limited(2), always_retry);
        let err = req.request(spec()).await.unwrap_err();
        assert!(matches!(err, RowError::Http(HttpError { status: Some(502), .. })));
        assert_eq!(replay.calls(), 2);
    }

    #[tokio::test]
    async fn test_unlimited_attempts_keep_going() {
        let replay = Replay::new(vec![Err(None); 25]);
        let req = context(replay.clone()).requestor(Attempts::Unlimited, always_retry);
        assert!(req.request(spec()).await.is_ok());
        assert_eq!(replay.calls(), 26);
    }

    #[tokio::test]
    async fn test_recoverable_classification_sees_passthrough() {
        let replay = Replay::new(vec![Err(Some(404))]);
        let req = context(replay.clone()).requestor(Attempts::limited(5), |e, p| {
            Classification::Recoverable(format!(
                "code {} for {}",
                e.status.unwrap_or(0),
                p.get("id").unwrap_or("?")
            ))
        });
        let err = req.request(spec()).await.unwrap_err();
        assert_eq!(err.to_string(), "code 404 for 42");
        assert_eq!(replay.calls(), 1);
    }

    #[tokio::test]
    async fn test_fatal_triggers_abort_and_blocks_later_requests() {
        let replay = Replay::new(vec![Err(Some(429))]);
        let ctx = context(replay.clone());
        let req = ctx.requestor(Attempts::limited(2), |_, _| {
            Classification::Fatal("stop".into())
        });

        let err = req.request(spec()).await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(ctx.abort().message(), Some("stop"));

        let other = ctx.requestor(Attempts::limited(2), always_retry);
        let err = other.request(spec()).await.unwrap_err();
        assert_eq!(err.to_string(), "stop");
        assert_eq!(replay.calls(), 1);
    }

    #[test]
    fn test_abort_keeps_first_message() {
        let abort = AbortSignal::new();
        assert!(!abort.is_triggered());
        abort.trigger("first");
        abort.trigger("second");
        assert_eq!(abort.message(), Some("first"));
        assert!(abort.clone().is_triggered());
    }
}
