//! Google Docs REST client.
//!
//! ## Retry Strategy
//!
//! 429 and 5xx gateway errors are transient under load, as are connect
//! failures and timeouts. Those are retried with exponential backoff
//! (`retry_backoff_ms * 2^(attempt-1)`): with the 500 ms default and 3
//! retries the waits are 500 ms → 1 s → 2 s. Every other status is mapped to
//! a [`GdocsError`] and returned at once.

use super::auth::resolve_access_token;
use super::DocumentGateway;
use crate::config::SyncConfig;
use crate::document::Document;
use crate::error::GdocsError;
use crate::pipeline::edits::{batch_update_body, EditOperation};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Default REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://docs.googleapis.com/v1";

/// Statuses worth retrying.
const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// [`DocumentGateway`] backed by the Google Docs v1 REST API.
pub struct GoogleDocsClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl std::fmt::Debug for GoogleDocsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleDocsClient")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .finish()
    }
}

/// Why the last attempt of a retried call failed.
enum LastFailure {
    Status(u16),
    Transport(reqwest::Error),
}

impl GoogleDocsClient {
    /// Build a client with an already-resolved bearer token.
    pub fn new(token: impl Into<String>, config: &SyncConfig) -> Result<Self, GdocsError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .user_agent(concat!("gdocs-markdown/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GdocsError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
        })
    }

    /// Resolve credentials (explicit → env → gcloud) and build a client.
    pub async fn from_config(config: &SyncConfig) -> Result<Self, GdocsError> {
        let (token, source) = resolve_access_token(config.access_token.as_deref()).await?;
        debug!("Access token resolved from {:?}", source);
        Self::new(token, config)
    }

    fn document_url(&self, document_id: &str) -> String {
        format!("{}/documents/{}", self.base_url, document_id)
    }

    /// Send a request built by `build`, retrying transient failures.
    async fn send_json<F>(
        &self,
        operation: &str,
        document_id: Option<&str>,
        build: F,
    ) -> Result<Value, GdocsError>
    where
        F: Fn() -> reqwest::RequestBuilder + Send + Sync,
    {
        let mut last: Option<LastFailure> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.retry_backoff_ms * 2u64.pow(attempt - 1);
                warn!(
                    "{}: retry {}/{} after {}ms",
                    operation, attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            let response = match build().bearer_auth(&self.token).send().await {
                Ok(response) => response,
                Err(e) if is_retryable_transport(&e) => {
                    warn!("{}: attempt {} failed: {}", operation, attempt + 1, e);
                    last = Some(LastFailure::Transport(e));
                    continue;
                }
                Err(e) => {
                    return Err(GdocsError::Request {
                        operation: operation.to_string(),
                        source: e,
                    })
                }
            };

            let status = response.status().as_u16();
            if response.status().is_success() {
                let text = response.text().await.map_err(|e| GdocsError::Request {
                    operation: operation.to_string(),
                    source: e,
                })?;
                return serde_json::from_str(&text).map_err(|e| GdocsError::MalformedResponse {
                    operation: operation.to_string(),
                    detail: e.to_string(),
                });
            }

            let body = response.text().await.unwrap_or_default();
            if is_retryable_status(status) {
                warn!("{}: attempt {} got HTTP {}", operation, attempt + 1, status);
                last = Some(LastFailure::Status(status));
                continue;
            }
            return Err(classify_status(status, &body, operation, document_id));
        }

        Err(match last {
            Some(LastFailure::Status(status)) => GdocsError::TransientService {
                status,
                attempts: self.max_retries + 1,
                operation: operation.to_string(),
            },
            Some(LastFailure::Transport(source)) => GdocsError::Request {
                operation: operation.to_string(),
                source,
            },
            None => GdocsError::Internal(format!("{operation}: no attempt was made")),
        })
    }
}

#[async_trait]
impl DocumentGateway for GoogleDocsClient {
    async fn fetch(&self, document_id: &str, include_all_tabs: bool) -> Result<Document, GdocsError> {
        let operation = format!("fetching document {document_id}");
        let url = self.document_url(document_id);
        let flag = if include_all_tabs { "true" } else { "false" };
        info!("Fetching document {}", document_id);

        let value = self
            .send_json(&operation, Some(document_id), || {
                self.http.get(&url).query(&[("includeTabsContent", flag)])
            })
            .await?;
        Document::from_value(value).map_err(|e| GdocsError::MalformedResponse {
            operation,
            detail: e.to_string(),
        })
    }

    async fn create(&self, title: &str) -> Result<Document, GdocsError> {
        let operation = format!("creating document '{title}'");
        let url = format!("{}/documents", self.base_url);
        let body = serde_json::json!({ "title": title });
        info!("Creating document '{}'", title);

        let value = self
            .send_json(&operation, None, || self.http.post(&url).json(&body))
            .await?;
        Document::from_value(value).map_err(|e| GdocsError::MalformedResponse {
            operation,
            detail: e.to_string(),
        })
    }

    async fn apply_edits(
        &self,
        document_id: &str,
        tab_id: Option<&str>,
        operations: &[EditOperation],
    ) -> Result<Vec<Value>, GdocsError> {
        let operation = format!("updating document {document_id}");
        let url = format!("{}:batchUpdate", self.document_url(document_id));
        let body = batch_update_body(operations, tab_id);
        info!(
            "Applying {} edit operations to document {}",
            operations.len(),
            document_id
        );

        let value = self
            .send_json(&operation, Some(document_id), || self.http.post(&url).json(&body))
            .await?;
        Ok(match value.get("replies") {
            Some(Value::Array(replies)) => replies.clone(),
            _ => Vec::new(),
        })
    }
}

/// Whether an HTTP status is worth another attempt.
pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}

fn is_retryable_transport(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect()
}

/// Map a non-retryable error status to a fatal error.
///
/// `document_id` is `None` for calls that do not address a document, in which
/// case 403 and 404 fall through to [`GdocsError::Api`].
pub fn classify_status(status: u16, body: &str, operation: &str, document_id: Option<&str>) -> GdocsError {
    match (status, document_id) {
        (401, _) => GdocsError::AuthenticationFailed,
        (403, _) if is_scope_error(body) => GdocsError::InsufficientScopes,
        (403, Some(id)) => GdocsError::PermissionDenied {
            document_id: id.to_string(),
        },
        (404, Some(id)) => GdocsError::NotFound {
            document_id: id.to_string(),
        },
        _ => GdocsError::Api {
            status,
            operation: operation.to_string(),
            message: api_error_message(body),
        },
    }
}

fn is_scope_error(body: &str) -> bool {
    body.contains("ACCESS_TOKEN_SCOPE_INSUFFICIENT")
        || body
            .to_ascii_lowercase()
            .contains("insufficient authentication scopes")
}

/// Pull `error.message` out of an API error body, or fall back to the raw text.
fn api_error_message(body: &str) -> String {
    const MAX_LEN: usize = 500;

    let parsed = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        v.pointer("/error/message")
            .and_then(Value::as_str)
            .map(str::to_string)
    });
    let message = parsed.unwrap_or_else(|| body.trim().to_string());
    if message.is_empty() {
        return "(empty response body)".into();
    }
    if message.chars().count() > MAX_LEN {
        let truncated: String = message.chars().take(MAX_LEN).collect();
        format!("{truncated}…")
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses() {
        for status in [429, 500, 502, 503, 504] {
            assert!(is_retryable_status(status), "{status}");
        }
        for status in [400, 401, 403, 404, 501] {
            assert!(!is_retryable_status(status), "{status}");
        }
    }

    #[test]
    fn auth_and_access_statuses() {
        assert!(matches!(
            classify_status(401, "", "fetching", Some("doc")),
            GdocsError::AuthenticationFailed
        ));
        assert!(matches!(
            classify_status(403, r#"{"error":{"status":"PERMISSION_DENIED"}}"#, "fetching", Some("doc")),
            GdocsError::PermissionDenied { document_id } if document_id == "doc"
        ));
        assert!(matches!(
            classify_status(404, "", "fetching", Some("doc")),
            GdocsError::NotFound { document_id } if document_id == "doc"
        ));
    }

    #[test]
    fn scope_errors_are_recognised() {
        let reason = r#"{"error":{"details":[{"reason":"ACCESS_TOKEN_SCOPE_INSUFFICIENT"}]}}"#;
        assert!(matches!(
            classify_status(403, reason, "fetching", Some("doc")),
            GdocsError::InsufficientScopes
        ));
        let message = r#"{"error":{"message":"Request had insufficient authentication scopes."}}"#;
        assert!(matches!(
            classify_status(403, message, "creating", None),
            GdocsError::InsufficientScopes
        ));
    }

    #[test]
    fn other_statuses_carry_api_message() {
        let body = r#"{"error":{"code":400,"message":"Invalid requests[0].insertText: Index 9 must be less than the end index"}}"#;
        match classify_status(400, body, "updating document doc", Some("doc")) {
            GdocsError::Api {
                status,
                operation,
                message,
            } => {
                assert_eq!(status, 400);
                assert_eq!(operation, "updating document doc");
                assert!(message.starts_with("Invalid requests[0].insertText"));
            }
            other => panic!("expected Api, got {other:?}"),
        }
    }

    #[test]
    fn not_found_without_document_is_api_error() {
        assert!(matches!(
            classify_status(404, "nope", "creating", None),
            GdocsError::Api { status: 404, .. }
        ));
    }

    #[test]
    fn api_message_fallbacks() {
        assert_eq!(api_error_message("  plain text  "), "plain text");
        assert_eq!(api_error_message(""), "(empty response body)");
        let long = "x".repeat(600);
        assert_eq!(api_error_message(&long).chars().count(), 501);
    }

    // ── HTTP behaviour against a local mock server ────────────────────────

    const DOC: &str = "abc123def456";

    const DOC_JSON: &str = r#"{
        "documentId": "abc123def456",
        "title": "Notes",
        "body": {"content": [
            {"endIndex": 1, "sectionBreak": {}},
            {"startIndex": 1, "endIndex": 4, "paragraph": {
                "elements": [{"textRun": {"content": "Hi\n"}}],
                "paragraphStyle": {"namedStyleType": "NORMAL_TEXT"}
            }}
        ]}
    }"#;

    fn client_for(server: &mockito::Server, max_retries: u32) -> GoogleDocsClient {
        let config = SyncConfig::builder()
            .base_url(server.url())
            .max_retries(max_retries)
            .retry_backoff_ms(1)
            .build()
            .unwrap();
        GoogleDocsClient::new("test-token", &config).unwrap()
    }

    #[tokio::test]
    async fn fetch_retries_transient_statuses_then_succeeds() {
        use mockito::Matcher;

        let mut server = mockito::Server::new_async().await;
        let path = format!("/documents/{DOC}");
        let failing = server
            .mock("GET", path.as_str())
            .match_query(Matcher::UrlEncoded("includeTabsContent".into(), "true".into()))
            .with_status(503)
            .expect(2)
            .create_async()
            .await;
        let ok = server
            .mock("GET", path.as_str())
            .match_query(Matcher::UrlEncoded("includeTabsContent".into(), "true".into()))
            .match_header("authorization", "Bearer test-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(DOC_JSON)
            .expect(1)
            .create_async()
            .await;

        let doc = client_for(&server, 3).fetch(DOC, true).await.unwrap();

        failing.assert_async().await;
        ok.assert_async().await;
        assert_eq!(doc.id, DOC);
        assert_eq!(doc.title, "Notes");
    }

    #[tokio::test]
    async fn persistent_unavailability_gives_up_after_every_attempt() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", format!("/documents/{DOC}").as_str())
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let err = client_for(&server, 2).fetch(DOC, true).await.unwrap_err();

        mock.assert_async().await;
        assert!(err.is_transient());
        assert!(matches!(
            err,
            GdocsError::TransientService {
                status: 503,
                attempts: 3,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn not_found_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", format!("/documents/{DOC}").as_str())
            .match_query(mockito::Matcher::Any)
            .with_status(404)
            .with_body(r#"{"error":{"code":404,"message":"Requested entity was not found."}}"#)
            .expect(1)
            .create_async()
            .await;

        let err = client_for(&server, 3).fetch(DOC, true).await.unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, GdocsError::NotFound { document_id } if document_id == DOC));
    }

    #[tokio::test]
    async fn apply_edits_posts_batch_update_body() {
        let operations = vec![
            EditOperation::DeleteRange { start: 1, end: 3 },
            EditOperation::InsertText {
                index: 1,
                text: "Hi\n".into(),
            },
        ];
        let expected = serde_json::json!({
            "requests": [
                {"deleteContentRange": {"range": {"startIndex": 1, "endIndex": 3, "tabId": "t.0"}}},
                {"insertText": {"location": {"index": 1, "tabId": "t.0"}, "text": "Hi\n"}}
            ]
        });

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", format!("/documents/{DOC}:batchUpdate").as_str())
            .match_header("authorization", "Bearer test-token")
            .match_body(mockito::Matcher::Json(expected))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"documentId":"abc123def456","replies":[{},{}]}"#)
            .expect(1)
            .create_async()
            .await;

        let replies = client_for(&server, 0)
            .apply_edits(DOC, Some("t.0"), &operations)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(replies.len(), 2);
    }

    #[tokio::test]
    async fn create_posts_title() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/documents")
            .match_body(mockito::Matcher::Json(serde_json::json!({"title": "Notes"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(DOC_JSON)
            .create_async()
            .await;

        let doc = client_for(&server, 0).create("Notes").await.unwrap();

        mock.assert_async().await;
        assert_eq!(doc.first_tab().map(|t| t.body.end_index), Some(4));
    }

    #[test]
    fn urls_trim_trailing_slash() {
        let config = SyncConfig::builder()
            .base_url("http://localhost:8080/v1/")
            .build()
            .unwrap();
        let client = GoogleDocsClient::new("ya29.secret", &config).unwrap();
        assert_eq!(client.document_url("abc"), "http://localhost:8080/v1/documents/abc");
        assert!(!format!("{client:?}").contains("ya29.secret"));
    }
}
