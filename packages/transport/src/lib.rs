#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Ordered multi-endpoint HTTP transport.
//!
//! Every logical request is sent to a list of candidate endpoints (see
//! [`registry`]). Endpoints are attempted strictly in order and the first
//! 2xx response wins. A failing endpoint is logged and skipped, never
//! retried; only when every endpoint has failed does the request fail with
//! [`TransportError::AllEndpointsUnavailable`].
//!
//! The [`Transport`] remembers which endpoint served each logical request
//! so the dashboard can surface degraded-mode notices.

pub mod backend;
pub mod registry;

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use registry::Endpoint;
use residue_map_report_models::ServedBy;

/// Errors that can occur while talking to the report services.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The HTTP client failed before a response arrived.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Every candidate endpoint failed.
    #[error("All endpoints unavailable for '{request}': {}", format_failures(.failures))]
    AllEndpointsUnavailable {
        /// Logical request label.
        request: String,
        /// Per-endpoint failure reasons, in attempt order.
        failures: Vec<EndpointFailure>,
    },

    /// The request had no enabled endpoints to try.
    #[error("No endpoints configured for '{request}'")]
    NoEndpoints {
        /// Logical request label.
        request: String,
    },

    /// The caller-supplied deadline elapsed before any endpoint answered.
    #[error("Request '{request}' exceeded its {deadline:?} deadline")]
    Deadline {
        /// Logical request label.
        request: String,
        /// The deadline that elapsed.
        deadline: Duration,
    },

    /// The request could not be built.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of what went wrong.
        message: String,
    },
}

fn format_failures(failures: &[EndpointFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Why one endpoint failed to serve a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The endpoint answered with a non-2xx status.
    Status(u16),
    /// The request never produced a response (connect, timeout, body).
    Network(String),
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status(status) => write!(f, "HTTP {status}"),
            Self::Network(message) => write!(f, "network error: {message}"),
        }
    }
}

/// A failed attempt against one endpoint.
///
/// This is the non-fatal "endpoint unavailable" condition: it is logged and
/// the next endpoint is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointFailure {
    /// Endpoint identifier from the registry.
    pub endpoint_id: String,
    /// URL that was attempted.
    pub url: String,
    /// What went wrong.
    pub reason: FailureReason,
}

impl std::fmt::Display for EndpointFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.endpoint_id, self.url, self.reason)
    }
}

/// One field of a `multipart/form-data` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormField {
    /// A plain text field.
    Text {
        /// Field name.
        name: String,
        /// Field value.
        value: String,
    },
    /// A file upload.
    File {
        /// Field name.
        name: String,
        /// File name reported to the server.
        file_name: String,
        /// MIME type (e.g., `"image/jpeg"`).
        mime: String,
        /// File contents.
        bytes: Vec<u8>,
    },
}

/// Request body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestBody {
    /// No body.
    #[default]
    Empty,
    /// A `multipart/form-data` body.
    Multipart(Vec<FormField>),
}

/// Everything needed to send one logical request to any endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    /// Logical request label, used for logging and the served-by record.
    pub label: String,
    /// HTTP method.
    pub method: registry::Method,
    /// Request body.
    pub body: RequestBody,
}

impl RequestSpec {
    /// A body-less `GET` request.
    #[must_use]
    pub fn get(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            method: registry::Method::Get,
            body: RequestBody::Empty,
        }
    }

    /// A multipart `POST` request.
    #[must_use]
    pub fn multipart(label: impl Into<String>, fields: Vec<FormField>) -> Self {
        Self {
            label: label.into(),
            method: registry::Method::Post,
            body: RequestBody::Multipart(fields),
        }
    }
}

/// A response as returned by an [`HttpBackend`], before status checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendResponse {
    /// HTTP status code.
    pub status: u16,
    /// `Content-Type` header, if present.
    pub content_type: Option<String>,
    /// Response body as text.
    pub body: String,
}

impl BackendResponse {
    /// Returns `true` for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// A successful response together with the endpoint that served it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// `Content-Type` header, if present.
    pub content_type: Option<String>,
    /// Response body as text.
    pub body: String,
    /// Which endpoint answered.
    pub served_by: ServedBy,
}

/// Sends a single request to a single URL.
///
/// Implementations must not retry; the [`Transport`] decides what happens
/// after a failure.
#[async_trait]
pub trait HttpBackend: Send + Sync {
    /// Sends `request` to `url`.
    ///
    /// Non-2xx statuses are returned as `Ok`; only failures that produced
    /// no response at all are errors.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if no response could be obtained.
    async fn send(&self, url: &str, request: &RequestSpec)
    -> Result<BackendResponse, TransportError>;
}

/// Multi-endpoint transport with fallback and a served-by ledger.
pub struct Transport {
    backend: Box<dyn HttpBackend>,
    served: Mutex<BTreeMap<String, ServedBy>>,
}

impl Transport {
    /// Creates a transport over the given backend.
    #[must_use]
    pub fn new(backend: Box<dyn HttpBackend>) -> Self {
        Self {
            backend,
            served: Mutex::new(BTreeMap::new()),
        }
    }

    /// Creates a transport backed by a default `reqwest` client.
    #[must_use]
    pub fn with_reqwest() -> Self {
        Self::new(Box::new(backend::ReqwestBackend::default()))
    }

    /// Sends `request` to each endpoint in order and returns the first 2xx
    /// response.
    ///
    /// A non-2xx status or network failure on one endpoint is logged and
    /// the next endpoint is attempted. No endpoint is retried.
    ///
    /// # Errors
    ///
    /// * [`TransportError::NoEndpoints`] if `endpoints` is empty.
    /// * [`TransportError::AllEndpointsUnavailable`] if every endpoint
    ///   failed, carrying the failures in attempt order.
    pub async fn fetch_with_fallback(
        &self,
        request: &RequestSpec,
        endpoints: &[Endpoint],
    ) -> Result<RawResponse, TransportError> {
        if endpoints.is_empty() {
            return Err(TransportError::NoEndpoints {
                request: request.label.clone(),
            });
        }

        let mut failures = Vec::new();

        for (position, endpoint) in endpoints.iter().enumerate() {
            match self.attempt(request, endpoint).await {
                Ok(response) => {
                    let served_by = ServedBy {
                        endpoint_id: endpoint.id.clone(),
                        url: endpoint.url(),
                        role: endpoint.role,
                        position,
                    };
                    if served_by.is_degraded() {
                        log::info!(
                            "'{}' served by fallback endpoint {} after {} failure(s)",
                            request.label,
                            endpoint.id,
                            failures.len()
                        );
                    }
                    self.record(&request.label, served_by.clone());
                    return Ok(RawResponse {
                        content_type: response.content_type,
                        body: response.body,
                        served_by,
                    });
                }
                Err(failure) => {
                    log::warn!("'{}' endpoint failed: {failure}", request.label);
                    failures.push(failure);
                }
            }
        }

        log::error!(
            "'{}' failed on all {} endpoint(s)",
            request.label,
            failures.len()
        );
        Err(TransportError::AllEndpointsUnavailable {
            request: request.label.clone(),
            failures,
        })
    }

    /// Same as [`Self::fetch_with_fallback`], bounded by `deadline`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Deadline`] if the deadline elapses first,
    /// otherwise whatever [`Self::fetch_with_fallback`] returns.
    pub async fn fetch_with_deadline(
        &self,
        request: &RequestSpec,
        endpoints: &[Endpoint],
        deadline: Duration,
    ) -> Result<RawResponse, TransportError> {
        tokio::time::timeout(deadline, self.fetch_with_fallback(request, endpoints))
            .await
            .map_err(|_| TransportError::Deadline {
                request: request.label.clone(),
                deadline,
            })?
    }

    /// Returns which endpoint last served the logical request `label`.
    #[must_use]
    pub fn last_served(&self, label: &str) -> Option<ServedBy> {
        self.served
            .lock()
            .ok()
            .and_then(|served| served.get(label).cloned())
    }

    /// One attempt against one endpoint, folded into a uniform result.
    async fn attempt(
        &self,
        request: &RequestSpec,
        endpoint: &Endpoint,
    ) -> Result<BackendResponse, EndpointFailure> {
        let url = endpoint.url();
        log::debug!("{} {url} ('{}')", request.method, request.label);

        let failure = |reason| EndpointFailure {
            endpoint_id: endpoint.id.clone(),
            url: url.clone(),
            reason,
        };

        match self.backend.send(&url, request).await {
            Ok(response) if response.is_success() => Ok(response),
            Ok(response) => Err(failure(FailureReason::Status(response.status))),
            Err(e) => Err(failure(FailureReason::Network(e.to_string()))),
        }
    }

    fn record(&self, label: &str, served_by: ServedBy) {
        if let Ok(mut served) = self.served.lock() {
            served.insert(label.to_string(), served_by);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry::Method;
    use residue_map_report_models::EndpointRole;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    /// Answers from a fixed table keyed by URL; unknown URLs fail to connect.
    struct FakeBackend {
        responses: BTreeMap<String, BackendResponse>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl FakeBackend {
        fn new(responses: &[(&str, u16, &str)]) -> Self {
            Self {
                responses: responses
                    .iter()
                    .map(|(url, status, body)| {
                        (
                            (*url).to_string(),
                            BackendResponse {
                                status: *status,
                                content_type: Some("application/json".to_string()),
                                body: (*body).to_string(),
                            },
                        )
                    })
                    .collect(),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl HttpBackend for FakeBackend {
        async fn send(
            &self,
            url: &str,
            _request: &RequestSpec,
        ) -> Result<BackendResponse, TransportError> {
            self.calls.lock().unwrap().push(url.to_string());
            self.responses
                .get(url)
                .cloned()
                .ok_or_else(|| TransportError::InvalidRequest {
                    message: "connection refused".to_string(),
                })
        }
    }

    /// Waits `delay` before every answer.
    struct SlowBackend {
        delay: Duration,
        inner: FakeBackend,
    }

    #[async_trait]
    impl HttpBackend for SlowBackend {
        async fn send(
            &self,
            url: &str,
            request: &RequestSpec,
        ) -> Result<BackendResponse, TransportError> {
            tokio::time::sleep(self.delay).await;
            self.inner.send(url, request).await
        }
    }

    fn endpoint(id: &str, url: &str, priority: u32, role: EndpointRole) -> Endpoint {
        Endpoint {
            id: id.to_string(),
            base_url: url.to_string(),
            path: String::new(),
            priority,
            enabled: true,
            role,
        }
    }

    fn primary_and_fallback() -> Vec<Endpoint> {
        vec![
            endpoint("primary", "http://primary/predict", 1, EndpointRole::Primary),
            endpoint("fallback", "http://fallback/predict", 2, EndpointRole::Fallback),
        ]
    }

    fn classify_request() -> RequestSpec {
        RequestSpec::multipart(
            "classify",
            vec![FormField::Text {
                name: "location".to_string(),
                value: "Santos".to_string(),
            }],
        )
    }

    #[tokio::test]
    async fn primary_success_stops_iteration() {
        let backend = FakeBackend::new(&[
            ("http://primary/predict", 200, "{\"ok\":1}"),
            ("http://fallback/predict", 200, "{\"ok\":2}"),
        ]);
        let transport = Transport::new(Box::new(backend));

        let response = transport
            .fetch_with_fallback(&classify_request(), &primary_and_fallback())
            .await
            .unwrap();

        assert_eq!(response.body, "{\"ok\":1}");
        assert_eq!(response.served_by.role, EndpointRole::Primary);
        assert!(!response.served_by.is_degraded());
    }

    #[tokio::test]
    async fn failing_primary_falls_back() {
        let backend = FakeBackend::new(&[
            ("http://primary/predict", 503, "unavailable"),
            ("http://fallback/predict", 200, "Prediction: SEM lixo"),
        ]);
        let transport = Transport::new(Box::new(backend));

        let response = transport
            .fetch_with_fallback(&classify_request(), &primary_and_fallback())
            .await
            .unwrap();

        assert_eq!(response.body, "Prediction: SEM lixo");
        assert_eq!(response.served_by.endpoint_id, "fallback");
        assert_eq!(response.served_by.position, 1);

        let recorded = transport.last_served("classify").unwrap();
        assert_eq!(recorded.endpoint_id, "fallback");
        assert_eq!(recorded.role, EndpointRole::Fallback);
    }

    #[tokio::test]
    async fn all_failing_enumerates_failures_in_order() {
        let backend = FakeBackend::new(&[("http://primary/predict", 500, "boom")]);
        let transport = Transport::new(Box::new(backend));

        let err = transport
            .fetch_with_fallback(&classify_request(), &primary_and_fallback())
            .await
            .unwrap_err();

        match err {
            TransportError::AllEndpointsUnavailable { request, failures } => {
                assert_eq!(request, "classify");
                assert_eq!(failures.len(), 2);
                assert_eq!(failures[0].endpoint_id, "primary");
                assert_eq!(failures[0].reason, FailureReason::Status(500));
                assert_eq!(failures[1].endpoint_id, "fallback");
                assert!(matches!(failures[1].reason, FailureReason::Network(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(transport.last_served("classify").is_none());
    }

    #[tokio::test]
    async fn each_endpoint_is_attempted_once() {
        let backend = FakeBackend::new(&[("http://primary/predict", 502, "")]);
        let calls = Arc::clone(&backend.calls);
        let transport = Transport::new(Box::new(backend));

        let _ = transport
            .fetch_with_fallback(&classify_request(), &primary_and_fallback())
            .await;

        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                "http://primary/predict".to_string(),
                "http://fallback/predict".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn no_endpoints_is_an_error() {
        let transport = Transport::new(Box::new(FakeBackend::new(&[])));
        let err = transport
            .fetch_with_fallback(&RequestSpec::get("summary"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::NoEndpoints { .. }));
    }

    #[test]
    fn request_constructors_pick_method() {
        assert_eq!(RequestSpec::get("locations").method, Method::Get);
        assert_eq!(classify_request().method, Method::Post);
    }

    #[test]
    fn all_unavailable_message_lists_every_failure() {
        let err = TransportError::AllEndpointsUnavailable {
            request: "classify".to_string(),
            failures: vec![
                EndpointFailure {
                    endpoint_id: "primary".to_string(),
                    url: "http://primary".to_string(),
                    reason: FailureReason::Status(503),
                },
                EndpointFailure {
                    endpoint_id: "fallback".to_string(),
                    url: "http://fallback".to_string(),
                    reason: FailureReason::Network("timed out".to_string()),
                },
            ],
        };
        let message = err.to_string();
        assert!(message.contains("primary (http://primary): HTTP 503"));
        assert!(message.contains("fallback (http://fallback): network error: timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_cuts_off_slow_fallback() {
        let inner = FakeBackend::new(&[("http://fallback/predict", 200, "{}")]);
        let calls = inner.calls.clone();
        let transport = Transport::new(Box::new(SlowBackend {
            delay: Duration::from_secs(2),
            inner,
        }));

        let err = transport
            .fetch_with_deadline(
                &classify_request(),
                &primary_and_fallback(),
                Duration::from_secs(3),
            )
            .await
            .unwrap_err();

        match err {
            TransportError::Deadline { request, deadline } => {
                assert_eq!(request, "classify");
                assert_eq!(deadline, Duration::from_secs(3));
            }
            other => panic!("expected deadline error, got {other:?}"),
        }
        // The primary failed; the fallback was still in flight when cut off.
        assert_eq!(*calls.lock().unwrap(), vec!["http://primary/predict".to_string()]);
        assert!(transport.last_served("classify").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_allows_timely_fallback() {
        let transport = Transport::new(Box::new(SlowBackend {
            delay: Duration::from_secs(1),
            inner: FakeBackend::new(&[("http://fallback/predict", 200, "{}")]),
        }));

        let response = transport
            .fetch_with_deadline(
                &classify_request(),
                &primary_and_fallback(),
                Duration::from_secs(3),
            )
            .await
            .unwrap();
        assert!(response.served_by.is_degraded());
        assert_eq!(
            transport.last_served("classify").map(|s| s.endpoint_id),
            Some("fallback".to_string())
        );
    }
}
