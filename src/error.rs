//! Error types for the gdocs-markdown library.
//!
//! Two distinct types reflect two distinct failure modes:
//!
//! * [`GdocsError`]: **Fatal**: the operation cannot proceed at all
//!   (malformed document id, document not shared with the caller, no
//!   credentials, unreadable Markdown file). Returned as `Err(GdocsError)`
//!   from the gateway and the top-level `download*` / `upload*` functions.
//!
//! * [`DataLoss`]: **Non-fatal**: the serializer had to drop something it
//!   cannot represent in Markdown (a whitespace-only paragraph, a table nested
//!   inside a cell). Stored inside [`crate::output::TabMarkdown`] so callers
//!   can decide whether the loss matters to them.
//!
//! The pure conversion functions never return errors; every fallible step
//! lives at the gateway or file-system boundary.

use std::path::PathBuf;
use thiserror::Error;

/// Re-authentication hint shared by the credential-related variants.
const REAUTH_HINT: &str = "gcloud auth application-default login --scopes=https://www.googleapis.com/auth/documents";

/// All fatal errors returned by the gdocs-markdown library.
#[derive(Debug, Error)]
pub enum GdocsError {
    // ── Argument errors ───────────────────────────────────────────────────
    /// A document id/URL or a combination of arguments was malformed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A requested tab does not exist in the document.
    #[error("Tab '{selector}' not found. Available tabs: {}", .available.join(", "))]
    TabNotFound {
        selector: String,
        available: Vec<String>,
    },

    // ── Access errors ─────────────────────────────────────────────────────
    /// The document id does not resolve to a document.
    #[error(
        "Document {document_id} not found.\n\n\
Please verify:\n  \
  - The document ID is correct\n  \
  - The document exists and is accessible\n  \
  - You have permission to view/edit the document"
    )]
    NotFound { document_id: String },

    /// The caller is authenticated but the document is not shared with them.
    #[error(
        "Access denied to document {document_id}.\n\n\
To fix:\n  \
  1. Ensure the document is shared with your Google account\n  \
  2. Re-authenticate: {}\n  \
  3. Enable the API: gcloud services enable docs.googleapis.com",
        REAUTH_HINT
    )]
    PermissionDenied { document_id: String },

    /// The access token lacks the Google Docs scope.
    #[error(
        "Authentication scopes are insufficient for the Google Docs API.\n\n\
To fix:\n  \
  1. gcloud auth application-default revoke\n  \
  2. {}\n  \
  3. gcloud services enable docs.googleapis.com",
        REAUTH_HINT
    )]
    InsufficientScopes,

    /// HTTP 401: the credentials were rejected, usually because they expired.
    #[error("Authentication failed. Your credentials may have expired.\n\nTo fix:\n  {}", REAUTH_HINT)]
    AuthenticationFailed,

    // ── Service errors ────────────────────────────────────────────────────
    /// 429/5xx persisted through every retry.
    #[error("Google Docs API returned HTTP {status} while {operation} (gave up after {attempts} attempts)")]
    TransientService {
        status: u16,
        attempts: u32,
        operation: String,
    },

    /// The API returned a non-retryable error status.
    #[error("Google Docs API error while {operation}: HTTP {status}: {message}")]
    Api {
        status: u16,
        operation: String,
        message: String,
    },

    /// The HTTP request could not be sent or its body could not be read.
    #[error("Request failed while {operation}: {source}")]
    Request {
        operation: String,
        #[source]
        source: reqwest::Error,
    },

    /// The API answered 2xx but the body was not the expected JSON shape.
    #[error("Unexpected response while {operation}: {detail}")]
    MalformedResponse { operation: String, detail: String },

    // ── Credential errors ─────────────────────────────────────────────────
    /// No access token could be obtained from any source.
    #[error("No credentials found.\n{hint}")]
    CredentialsUnavailable { hint: String },

    /// A gcloud invocation failed.
    #[error("{message}\nOperation: {operation}\nCommand: {}", .command.join(" "))]
    Gcloud {
        message: String,
        operation: String,
        command: Vec<String>,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// A local input file does not exist.
    #[error("File not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// A local input file exists but could not be read.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An embedded data URI did not hold valid base64.
    #[error("Failed to decode base64 for mime={mime}: {detail}")]
    ImageDecode { mime: String, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GdocsError {
    /// Whether retrying the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, GdocsError::TransientService { .. })
    }
}

/// Information the serializer dropped while rendering a tab.
///
/// Nothing here aborts a download; the notices are collected per tab and
/// logged at `debug` level.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum DataLoss {
    /// A paragraph trimmed to the empty string and produced no line.
    #[error("paragraph {index} is empty or whitespace-only and was dropped")]
    EmptyParagraph { index: usize },

    /// A table inside a table cell; only the cell's direct paragraphs render.
    #[error("table nested in cell (row {row}, column {column}) of block {index} was dropped")]
    NestedTable {
        index: usize,
        row: usize,
        column: usize,
    },

    /// A table of contents is regenerated by Docs and never rendered.
    #[error("table of contents at block {index} was skipped")]
    TableOfContents { index: usize },

    /// A table with no rows (or a header without cells) rendered nothing.
    #[error("table at block {index} has no cells and was dropped")]
    EmptyTable { index: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display_names_document() {
        let e = GdocsError::NotFound {
            document_id: "abc123def456".into(),
        };
        assert!(e.to_string().contains("abc123def456"));
    }

    #[test]
    fn gcloud_display_includes_operation_and_command() {
        let e = GdocsError::Gcloud {
            message: "gcloud exited with status 1".into(),
            operation: "printing an access token".into(),
            command: vec![
                "gcloud".into(),
                "auth".into(),
                "application-default".into(),
                "print-access-token".into(),
            ],
        };
        let msg = e.to_string();
        assert!(msg.contains("Operation: printing an access token"), "got: {msg}");
        assert!(
            msg.contains("Command: gcloud auth application-default print-access-token"),
            "got: {msg}"
        );
    }

    #[test]
    fn tab_not_found_lists_available_tabs() {
        let e = GdocsError::TabNotFound {
            selector: "Appendix".into(),
            available: vec!["Intro".into(), "Body".into()],
        };
        assert!(e.to_string().contains("Intro, Body"));
    }

    #[test]
    fn only_transient_service_is_transient() {
        let transient = GdocsError::TransientService {
            status: 503,
            attempts: 4,
            operation: "fetching document".into(),
        };
        assert!(transient.is_transient());
        assert!(!GdocsError::AuthenticationFailed.is_transient());
        assert!(transient.to_string().contains("4 attempts"));
    }

    #[test]
    fn data_loss_display() {
        let loss = DataLoss::NestedTable {
            index: 3,
            row: 1,
            column: 0,
        };
        assert!(loss.to_string().contains("block 3"));
    }
}
