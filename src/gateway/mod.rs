//! Remote document access.
//!
//! [`DocumentGateway`] is the only seam between the converter and the
//! network. The conversion entry points in [`crate::convert`] hold an
//! `Arc<dyn DocumentGateway>` and never see HTTP; tests substitute an
//! in-memory implementation.
//!
//! | Implementation | Module |
//! |----------------|--------|
//! | [`GoogleDocsClient`]: REST over `reqwest` with retry | [`http`] |
//! | token acquisition (flag → env → gcloud) | [`auth`] |

pub mod auth;
pub mod http;

pub use http::GoogleDocsClient;

use crate::document::Document;
use crate::error::GdocsError;
use crate::pipeline::edits::EditOperation;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

/// Fetch, create and mutate remote documents.
///
/// Implementations own authentication and retry; callers treat every method
/// as a single logical call.
#[async_trait]
pub trait DocumentGateway: Send + Sync {
    /// Fetch a document. With `include_all_tabs` the response carries every
    /// tab's content instead of only the first tab's body.
    async fn fetch(&self, document_id: &str, include_all_tabs: bool) -> Result<Document, GdocsError>;

    /// Create an empty document with the given title.
    async fn create(&self, title: &str) -> Result<Document, GdocsError>;

    /// Apply a batch of operations atomically, targeting `tab_id` when given.
    ///
    /// Returns the API's per-request replies, which callers treat as opaque.
    async fn apply_edits(
        &self,
        document_id: &str,
        tab_id: Option<&str>,
        operations: &[EditOperation],
    ) -> Result<Vec<serde_json::Value>, GdocsError>;
}

static URL_PATH_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/document/d/([A-Za-z0-9_-]+)").unwrap());

static QUERY_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[?&]id=([A-Za-z0-9_-]+)").unwrap());

static BARE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{10,}$").unwrap());

/// Extract the document id from a Google Docs URL or a bare id.
///
/// Accepted forms, tried in order:
/// - `https://docs.google.com/document/d/{id}[/edit|/view][?…]`
/// - any URL with an `id={id}` query parameter
/// - a bare id of at least 10 characters from `[A-Za-z0-9_-]`
pub fn extract_document_id(url_or_id: &str) -> Result<String, GdocsError> {
    let input = url_or_id.trim();

    if let Some(caps) = URL_PATH_ID.captures(input) {
        return Ok(caps[1].to_string());
    }
    if let Some(caps) = QUERY_ID.captures(input) {
        return Ok(caps[1].to_string());
    }
    if BARE_ID.is_match(input) {
        return Ok(input.to_string());
    }

    Err(GdocsError::InvalidArgument(format!(
        "Could not extract a document ID from '{input}'. \
         Pass a Google Docs URL (https://docs.google.com/document/d/<ID>/edit) or the ID itself."
    )))
}
