//! HTTP transport for the booking API.
//!
//! [`HttpTransport::call`] is the single request wrapper every endpoint goes
//! through. It keeps a counted [`LoadingIndicator`] raised while any request
//! is in flight.

use crate::error::ApiError;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Loading indicator shared by every request of a transport
///
/// Visible while at least one request is in flight, so overlapping calls
/// never hide it early.
#[derive(Debug, Default)]
pub struct LoadingIndicator {
    in_flight: AtomicUsize,
}

impl LoadingIndicator {
    /// Create a hidden indicator
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Raise the indicator until the returned guard is dropped
    #[must_use]
    pub fn begin(self: &Arc<Self>) -> LoadingGuard {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        #[allow(clippy::cast_precision_loss)] // request counts are small
        metrics::gauge!("transport.loading.in_flight").set(now as f64);
        LoadingGuard(Arc::clone(self))
    }

    /// Whether any request is in flight
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.in_flight() > 0
    }

    /// Number of requests in flight
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// Lowers the loading indicator on drop, on every exit path
#[derive(Debug)]
pub struct LoadingGuard(Arc<LoadingIndicator>);

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        let now = self.0.in_flight.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        #[allow(clippy::cast_precision_loss)] // request counts are small
        metrics::gauge!("transport.loading.in_flight").set(now as f64);
    }
}

/// JSON-over-HTTP transport
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    loading: Arc<LoadingIndicator>,
}

impl HttpTransport {
    /// Create a transport for the API at `base_url`
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            loading: LoadingIndicator::new(),
        }
    }

    /// Base URL requests are sent to
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The shared loading indicator
    #[must_use]
    pub fn loading(&self) -> Arc<LoadingIndicator> {
        Arc::clone(&self.loading)
    }

    /// Perform one request
    ///
    /// Always sends `Content-Type: application/json`; `body` is serialized
    /// as JSON when present. No retry and no timeout.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Network`]: the request could not be sent
    /// - [`ApiError::Http`]: non-2xx status; the message is the body's
    ///   `message` field, else `HTTP <status>: <reason>`
    /// - [`ApiError::Decode`]: a 2xx body that is not JSON
    #[tracing::instrument(skip(self, method, body), fields(method = %method))]
    pub async fn call(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let _loading = self.loading.begin();
        metrics::counter!("transport.requests.total", "method" => method.as_str().to_owned())
            .increment(1);

        let url = format!("{}{endpoint}", self.base_url);
        let mut request = self
            .client
            .request(method, &url)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!(error = %e, "Request failed to send");
            metrics::counter!("transport.requests.failed").increment(1);
            ApiError::Network(e.to_string())
        })?;

        let status = response.status();
        tracing::debug!(status = status.as_u16(), "Response received");

        if !status.is_success() {
            metrics::counter!("transport.requests.failed").increment(1);
            let body = response.json::<Value>().await.ok();
            let error = match body.as_ref().and_then(extract_message) {
                Some(message) => ApiError::Http {
                    status: status.as_u16(),
                    message,
                },
                None => ApiError::from_status(
                    status.as_u16(),
                    status.canonical_reason().unwrap_or_default(),
                ),
            };
            tracing::warn!(status = status.as_u16(), error = %error, "Request rejected");
            return Err(error);
        }

        response.json::<Value>().await.map_err(|e| {
            tracing::warn!(error = %e, "Response body is not JSON");
            ApiError::Decode(e.to_string())
        })
    }
}

/// The non-empty `message` field of an error body
fn extract_message(body: &Value) -> Option<String> {
    body.get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn overlapping_requests_keep_indicator_visible() {
        let loading = LoadingIndicator::new();
        assert!(!loading.is_visible());

        let first = loading.begin();
        let second = loading.begin();
        drop(first);
        assert!(loading.is_visible());
        assert_eq!(loading.in_flight(), 1);

        drop(second);
        assert!(!loading.is_visible());
    }

    #[test]
    fn message_field_is_extracted_when_present() {
        assert_eq!(
            extract_message(&json!({ "message": "Event not found" })),
            Some("Event not found".to_string())
        );
        assert_eq!(extract_message(&json!({ "message": "" })), None);
        assert_eq!(extract_message(&json!({ "error": "x" })), None);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let transport = HttpTransport::new("http://localhost:8080/");
        assert_eq!(transport.base_url(), "http://localhost:8080");
    }
}
