//! Wire client for the metering service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::http::{HttpTimeouts, build_http_client};
use crate::session::Identity;

use super::{QuotaCategory, QuotaError, QuotaSnapshot};

/// Statuses on consume that mean "not eligible" rather than "service broken".
const INELIGIBLE_STATUSES: [u16; 3] = [402, 403, 429];

/// Answer to an eligibility check.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CheckResponse {
    /// Whether the identity may spend the requested units.
    #[serde(default)]
    pub allowed: bool,
    /// Usage snapshot, when the service includes one.
    #[serde(default)]
    pub usage: Option<QuotaSnapshot>,
}

/// Answer to a consume call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConsumeResponse {
    /// Explicit success flag; absent means success when `usage` is present.
    #[serde(default)]
    pub success: Option<bool>,
    /// Usage snapshot after the consume.
    #[serde(default)]
    pub usage: Option<QuotaSnapshot>,
    /// Optional human-readable reason on refusal.
    #[serde(default)]
    pub message: Option<String>,
}

impl ConsumeResponse {
    /// Whether the service accepted the consume.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.success.unwrap_or(self.usage.is_some())
    }

    fn ineligible(status: u16) -> Self {
        Self {
            success: Some(false),
            usage: None,
            message: Some(format!("quota service refused consume with HTTP {status}")),
        }
    }
}

/// Remote metering operations.
///
/// Implemented over HTTP by [`HttpQuotaService`]; tests substitute their own.
#[async_trait]
pub trait QuotaService: Send + Sync {
    /// Asks whether `identity` may spend `units` of `category`.
    async fn check(
        &self,
        identity: &Identity,
        category: QuotaCategory,
        units: u32,
    ) -> Result<CheckResponse, QuotaError>;

    /// Records `units` of `category` as spent by `identity`.
    async fn consume(
        &self,
        identity: &Identity,
        category: QuotaCategory,
        units: u32,
    ) -> Result<ConsumeResponse, QuotaError>;
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
enum QuotaAction {
    Check,
    Consume,
}

/// Request body. Exactly one of `userId` / `guestId` is serialized.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QuotaRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    guest_id: Option<&'a str>,
    #[serde(rename = "type")]
    category: QuotaCategory,
    count: u32,
    action: QuotaAction,
}

impl<'a> QuotaRequest<'a> {
    fn new(identity: &'a Identity, category: QuotaCategory, count: u32, action: QuotaAction) -> Self {
        let (user_id, guest_id) = match identity {
            Identity::User { id } => (Some(id.as_str()), None),
            Identity::Guest { fingerprint } => (None, Some(fingerprint.as_str())),
        };
        Self {
            user_id,
            guest_id,
            category,
            count,
            action,
        }
    }
}

/// JSON-over-HTTP quota service client.
#[derive(Debug, Clone)]
pub struct HttpQuotaService {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpQuotaService {
    /// Creates a client for `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error when the client cannot be built.
    pub fn new(endpoint: impl Into<String>, timeouts: HttpTimeouts) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(timeouts, true)?,
            endpoint: endpoint.into(),
            timeout: timeouts.response,
        })
    }

    /// Endpoint this client posts to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, body: &QuotaRequest<'_>) -> Result<(u16, Vec<u8>), QuotaError> {
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| QuotaError::unreachable(&self.endpoint, e))?;
        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| QuotaError::unreachable(&self.endpoint, e))?;
        Ok((status, bytes.to_vec()))
    }

    fn decode<T: for<'de> Deserialize<'de>>(&self, body: &[u8]) -> Result<T, QuotaError> {
        serde_json::from_slice(body).map_err(|e| QuotaError::invalid_response(&self.endpoint, e))
    }
}

#[async_trait]
impl QuotaService for HttpQuotaService {
    #[instrument(skip(self, identity), fields(identity = %identity, %category, units))]
    async fn check(
        &self,
        identity: &Identity,
        category: QuotaCategory,
        units: u32,
    ) -> Result<CheckResponse, QuotaError> {
        let request = QuotaRequest::new(identity, category, units, QuotaAction::Check);
        let (status, body) = self.post(&request).await?;
        if !(200..300).contains(&status) {
            return Err(QuotaError::http_status(&self.endpoint, status));
        }
        let response: CheckResponse = self.decode(&body)?;
        debug!(allowed = response.allowed, "quota check answered");
        Ok(response)
    }

    #[instrument(skip(self, identity), fields(identity = %identity, %category, units))]
    async fn consume(
        &self,
        identity: &Identity,
        category: QuotaCategory,
        units: u32,
    ) -> Result<ConsumeResponse, QuotaError> {
        let request = QuotaRequest::new(identity, category, units, QuotaAction::Consume);
        let (status, body) = self.post(&request).await?;
        if INELIGIBLE_STATUSES.contains(&status) {
            debug!(status, "quota consume refused");
            return Ok(ConsumeResponse::ineligible(status));
        }
        if !(200..300).contains(&status) {
            return Err(QuotaError::http_status(&self.endpoint, status));
        }
        let response: ConsumeResponse = self.decode(&body)?;
        debug!(success = response.succeeded(), "quota consume answered");
        Ok(response)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use serde_json::json;
    use wiremock::matchers::{body_json, method};
    use wiremock::{Mock, ResponseTemplate};

    fn guest() -> Identity {
        Identity::Guest {
            fingerprint: "guest_abc".to_string(),
        }
    }

    fn service(uri: &str) -> HttpQuotaService {
        HttpQuotaService::new(uri, HttpTimeouts::from_secs(5, 5, 5)).unwrap()
    }

    #[test]
    fn test_request_serializes_only_guest_id_for_guest() {
        let identity = guest();
        let request = QuotaRequest::new(&identity, QuotaCategory::Download, 1, QuotaAction::Check);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({"guestId": "guest_abc", "type": "download", "count": 1, "action": "check"})
        );
    }

    #[test]
    fn test_request_serializes_only_user_id_for_user() {
        let identity = Identity::User {
            id: "u-42".to_string(),
        };
        let request = QuotaRequest::new(&identity, QuotaCategory::Summary, 3, QuotaAction::Consume);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({"userId": "u-42", "type": "summary", "count": 3, "action": "consume"})
        );
    }

    #[test]
    fn test_consume_response_success_inferred_from_usage() {
        let response: ConsumeResponse =
            serde_json::from_value(json!({"usage": {"plan": "FREE", "downloadCount": 1}})).unwrap();
        assert!(response.succeeded());

        let response: ConsumeResponse = serde_json::from_value(json!({})).unwrap();
        assert!(!response.succeeded());

        let response: ConsumeResponse =
            serde_json::from_value(json!({"success": false, "usage": {}})).unwrap();
        assert!(!response.succeeded());
    }

    #[tokio::test]
    async fn test_check_posts_expected_body() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("POST"))
            .and(body_json(json!({
                "guestId": "guest_abc",
                "type": "download",
                "count": 2,
                "action": "check"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"allowed": true})))
            .expect(1)
            .mount(&mock_server)
            .await;

        let response = service(&mock_server.uri())
            .check(&guest(), QuotaCategory::Download, 2)
            .await
            .unwrap();
        assert!(response.allowed);
        assert!(response.usage.is_none());
    }

    #[tokio::test]
    async fn test_check_500_is_http_status_error() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let result = service(&mock_server.uri())
            .check(&guest(), QuotaCategory::Download, 1)
            .await;
        assert!(matches!(result, Err(QuotaError::HttpStatus { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_check_malformed_body_is_invalid_response() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let result = service(&mock_server.uri())
            .check(&guest(), QuotaCategory::Download, 1)
            .await;
        assert!(matches!(result, Err(QuotaError::InvalidResponse { .. })));
    }

    #[tokio::test]
    async fn test_consume_429_is_refusal_not_error() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&mock_server)
            .await;

        let response = service(&mock_server.uri())
            .consume(&guest(), QuotaCategory::Download, 1)
            .await
            .unwrap();
        assert!(!response.succeeded());
        assert!(response.usage.is_none());
    }

    #[tokio::test]
    async fn test_consume_returns_usage_snapshot() {
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "usage": {"plan": "PRO", "downloadCount": 9}
            })))
            .mount(&mock_server)
            .await;

        let response = service(&mock_server.uri())
            .consume(&guest(), QuotaCategory::Download, 1)
            .await
            .unwrap();
        assert!(response.succeeded());
        assert_eq!(response.usage.unwrap().download_count, 9);
    }
}
