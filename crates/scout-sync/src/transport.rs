//! # Transport
//!
//! The network port the engine talks through, plus its HTTP implementation.
//!
//! ## Endpoints
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Scouting Backend API                              │
//! │                                                                         │
//! │  POST /scans                  {isbn,title,author,clientScanId}          │
//! │       2xx ok · 403 quota · other non-2xx retryable                     │
//! │                                                                         │
//! │  POST /pricing/cache-lookup   {isbn,title?,author?,publisher?}          │
//! │       → {ebayPrice,amazonPrice,title,author,publisher,confidence?}     │
//! │                                                                         │
//! │  POST /pricing/live-lookup    {isbn}                                    │
//! │       → same shape + source ("demo" = synthetic data)                  │
//! │                                                                         │
//! │  GET  /sync/status            → {pendingSync, lastSync|null}           │
//! │  POST /sync/trigger           → {count}                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Prices arrive as decimal JSON numbers and are converted to [`Money`] here,
//! once. Nothing past this module sees a float price.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use scout_core::money::Money;
use scout_core::types::{BookMetadata, Confidence, QueuedScan};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::ScoutConfig;
use crate::error::{SyncError, SyncResult};

/// Header carrying the queued scan's id so resends can be deduplicated.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

const MAX_LOG_BODY_CHARS: usize = 512;

// =============================================================================
// Port
// =============================================================================

/// Everything the engine needs from the backend.
///
/// [`HttpApi`] is the production implementation; tests substitute an
/// in-process fake.
#[async_trait]
pub trait ScoutApi: Send + Sync {
    /// `POST /scans`. The scan's `id` is the idempotency key.
    async fn create_scan(&self, scan: &QueuedScan) -> SyncResult<()>;

    /// `POST /pricing/cache-lookup`. Non-2xx means miss.
    async fn cache_lookup(&self, request: &PriceLookupRequest) -> SyncResult<LookupResult>;

    /// `POST /pricing/live-lookup`.
    async fn live_lookup(&self, isbn: &str) -> SyncResult<LookupResult>;

    /// `GET /sync/status`.
    async fn sync_status(&self) -> SyncResult<ServerSyncStatus>;

    /// `POST /sync/trigger`; returns how many server-side items were reconciled.
    async fn trigger_sync(&self) -> SyncResult<u64>;

    /// Downloads a thumbnail.
    async fn fetch_image(&self, url: &str) -> SyncResult<Vec<u8>>;
}

// =============================================================================
// Port Types
// =============================================================================

/// Body of a server-side cache lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceLookupRequest {
    pub isbn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
}

impl PriceLookupRequest {
    pub fn new(isbn: impl Into<String>, meta: &BookMetadata) -> Self {
        PriceLookupRequest {
            isbn: isbn.into(),
            title: meta.title.clone(),
            author: meta.author.clone(),
            publisher: meta.publisher.clone(),
        }
    }
}

/// A pricing answer from either lookup endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LookupResult {
    pub ebay_price: Option<Money>,
    pub amazon_price: Option<Money>,
    pub metadata: BookMetadata,
    /// Server's own grading, if it sent one.
    pub confidence: Option<Confidence>,
    /// Upstream reported synthetic data.
    pub demo: bool,
}

impl LookupResult {
    /// True when at least one marketplace price is present.
    pub fn has_prices(&self) -> bool {
        self.ebay_price.is_some() || self.amazon_price.is_some()
    }
}

/// Server-side view of outstanding work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerSyncStatus {
    pub pending_sync: u64,
    pub last_sync: Option<DateTime<Utc>>,
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateScanBody<'a> {
    isbn: &'a str,
    title: &'a str,
    author: &'a str,
    client_scan_id: &'a str,
}

impl<'a> From<&'a QueuedScan> for CreateScanBody<'a> {
    fn from(scan: &'a QueuedScan) -> Self {
        CreateScanBody {
            isbn: &scan.isbn,
            title: &scan.title,
            author: &scan.author,
            client_scan_id: &scan.id,
        }
    }
}

#[derive(Debug, Serialize)]
struct LiveLookupBody<'a> {
    isbn: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupResponse {
    #[serde(default)]
    ebay_price: Option<f64>,
    #[serde(default)]
    amazon_price: Option<f64>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    publisher: Option<String>,
    #[serde(default)]
    confidence: Option<String>,
    #[serde(default)]
    source: Option<String>,
}

impl LookupResponse {
    fn into_result(self) -> SyncResult<LookupResult> {
        let to_money = |field: &str, amount: Option<f64>| -> SyncResult<Option<Money>> {
            amount
                .map(|a| Money::from_wire_amount(field, a))
                .transpose()
                .map_err(|e| SyncError::transport(None, format!("Malformed lookup response: {}", e)))
        };

        let confidence = match self.confidence.as_deref() {
            Some(raw) => match raw.parse::<Confidence>() {
                Ok(c) => Some(c),
                Err(e) => {
                    debug!(error = %e, "Ignoring unknown confidence grade");
                    None
                }
            },
            None => None,
        };

        Ok(LookupResult {
            ebay_price: to_money("ebayPrice", self.ebay_price)?,
            amazon_price: to_money("amazonPrice", self.amazon_price)?,
            metadata: BookMetadata {
                title: self.title,
                author: self.author,
                publisher: self.publisher,
            },
            confidence,
            demo: self
                .source
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case("demo")),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncStatusResponse {
    #[serde(default)]
    pending_sync: u64,
    #[serde(default)]
    last_sync: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct TriggerResponse {
    #[serde(default)]
    count: u64,
}

// =============================================================================
// HTTP Implementation
// =============================================================================

/// [`ScoutApi`] over HTTPS with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpApi {
    /// Creates a client for `base_url`; relative endpoint paths are joined onto it.
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> SyncResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        // Url::join replaces the last path segment unless the base ends in '/'.
        let mut normalized = base_url.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let base_url = Url::parse(&normalized)?;

        Ok(HttpApi {
            client,
            base_url,
            token,
        })
    }

    pub fn from_config(config: &ScoutConfig) -> SyncResult<Self> {
        Self::new(
            &config.api.base_url,
            config.api.token.clone(),
            config.request_timeout(),
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Full URL for an endpoint path such as `"sync/status"`.
    pub fn endpoint(&self, path: &str) -> SyncResult<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    fn request(&self, method: Method, path: &str) -> SyncResult<RequestBuilder> {
        let url = self.endpoint(path)?;
        let mut builder = self.client.request(method, url);
        if let Some(ref token) = self.token {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    fn log_response(status: StatusCode, body: &str) {
        if status.is_success() {
            debug!(%status, "API response");
            return;
        }
        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!(%status, body = %preview, "API error response");
    }

    /// Reads the body and maps non-2xx to `Transport`.
    async fn read_body(response: Response) -> SyncResult<(StatusCode, String)> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            return Err(SyncError::transport(
                Some(status.as_u16()),
                format!("Request failed: {}", body),
            ));
        }
        Ok((status, body))
    }

    async fn parse_response<T: DeserializeOwned>(response: Response) -> SyncResult<T> {
        let (status, body) = Self::read_body(response).await?;
        serde_json::from_str(&body).map_err(|e| {
            SyncError::transport(
                Some(status.as_u16()),
                format!("Failed to parse response: {}", e),
            )
        })
    }
}

#[async_trait]
impl ScoutApi for HttpApi {
    async fn create_scan(&self, scan: &QueuedScan) -> SyncResult<()> {
        let response = self
            .request(Method::POST, "scans")?
            .header(IDEMPOTENCY_KEY_HEADER, scan.id.as_str())
            .json(&CreateScanBody::from(scan))
            .send()
            .await?;

        if response.status() == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::QuotaExceeded(if body.is_empty() {
                "scan limit reached".to_string()
            } else {
                body
            }));
        }

        Self::read_body(response).await?;
        debug!(id = %scan.id, isbn = %scan.isbn, "Scan accepted by server");
        Ok(())
    }

    async fn cache_lookup(&self, request: &PriceLookupRequest) -> SyncResult<LookupResult> {
        let response = self
            .request(Method::POST, "pricing/cache-lookup")?
            .json(request)
            .send()
            .await?;
        Self::parse_response::<LookupResponse>(response)
            .await?
            .into_result()
    }

    async fn live_lookup(&self, isbn: &str) -> SyncResult<LookupResult> {
        let response = self
            .request(Method::POST, "pricing/live-lookup")?
            .json(&LiveLookupBody { isbn })
            .send()
            .await?;
        Self::parse_response::<LookupResponse>(response)
            .await?
            .into_result()
    }

    async fn sync_status(&self) -> SyncResult<ServerSyncStatus> {
        let response = self.request(Method::GET, "sync/status")?.send().await?;
        let status: SyncStatusResponse = Self::parse_response(response).await?;
        Ok(ServerSyncStatus {
            pending_sync: status.pending_sync,
            last_sync: status.last_sync,
        })
    }

    async fn trigger_sync(&self) -> SyncResult<u64> {
        let response = self.request(Method::POST, "sync/trigger")?.send().await?;
        let trigger: TriggerResponse = Self::parse_response(response).await?;
        Ok(trigger.count)
    }

    async fn fetch_image(&self, url: &str) -> SyncResult<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::transport(
                Some(status.as_u16()),
                format!("Image fetch failed for {}", url),
            ));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_join_keeps_base_path() {
        let api = HttpApi::new("https://api.example.com/v1", None, Duration::from_secs(5)).unwrap();
        assert_eq!(
            api.endpoint("pricing/cache-lookup").unwrap().as_str(),
            "https://api.example.com/v1/pricing/cache-lookup"
        );
        assert_eq!(
            api.endpoint("/sync/status").unwrap().as_str(),
            "https://api.example.com/v1/sync/status"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let err = HttpApi::new("not a url", None, Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, SyncError::InvalidUrl(_)));
    }

    #[test]
    fn test_create_scan_body_carries_client_scan_id() {
        let scan = QueuedScan {
            id: "c0ffee".into(),
            isbn: "9780140449136".into(),
            title: "The Odyssey".into(),
            author: "Homer".into(),
            timestamp: Utc::now(),
            retries: 0,
            error: None,
        };
        let json = serde_json::to_value(CreateScanBody::from(&scan)).unwrap();
        assert_eq!(json["clientScanId"], "c0ffee");
        assert_eq!(json["isbn"], "9780140449136");
    }

    #[test]
    fn test_lookup_request_omits_missing_metadata() {
        let request = PriceLookupRequest::new("9780140449136", &BookMetadata::with_author("Homer"));
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"isbn":"9780140449136","author":"Homer"}"#);
    }

    #[test]
    fn test_lookup_response_conversion() {
        let body = r#"{
            "ebayPrice": 12.99,
            "amazonPrice": null,
            "title": "Guards! Guards!",
            "author": "Terry Pratchett",
            "confidence": "medium"
        }"#;
        let response: LookupResponse = serde_json::from_str(body).unwrap();
        let result = response.into_result().unwrap();
        assert_eq!(result.ebay_price, Some(Money::from_cents(1299)));
        assert_eq!(result.amazon_price, None);
        assert_eq!(result.confidence, Some(Confidence::Medium));
        assert_eq!(result.metadata.author.as_deref(), Some("Terry Pratchett"));
        assert!(!result.demo);
        assert!(result.has_prices());
    }

    #[test]
    fn test_demo_source_and_unknown_confidence() {
        let body = r#"{"ebayPrice": 4.5, "source": "demo", "confidence": "certain"}"#;
        let response: LookupResponse = serde_json::from_str(body).unwrap();
        let result = response.into_result().unwrap();
        assert!(result.demo);
        assert_eq!(result.confidence, None);
    }

    #[test]
    fn test_empty_lookup_has_no_prices() {
        let result = LookupResponse::default().into_result().unwrap();
        assert!(!result.has_prices());
    }

    #[test]
    fn test_sync_status_response() {
        let body = r#"{"pendingSync": 4, "lastSync": "2024-05-01T12:00:00Z"}"#;
        let status: SyncStatusResponse = serde_json::from_str(body).unwrap();
        assert_eq!(status.pending_sync, 4);
        assert!(status.last_sync.is_some());

        let status: SyncStatusResponse =
            serde_json::from_str(r#"{"pendingSync": 0, "lastSync": null}"#).unwrap();
        assert!(status.last_sync.is_none());
    }
}
