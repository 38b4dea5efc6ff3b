//! Result types returned by the conversion entry points.
//!
//! Everything here is `Serialize` so the CLI can print it with `--json`.

use crate::error::DataLoss;
use serde::Serialize;

/// Markdown for every selected tab of one document.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadOutput {
    pub document_id: String,
    pub title: String,
    /// Selected tabs in selection order (depth-first for `TabSelection::All`).
    pub tabs: Vec<TabMarkdown>,
}

impl DownloadOutput {
    /// Total number of dropped elements across every tab.
    pub fn loss_count(&self) -> usize {
        self.tabs.iter().map(|t| t.losses.len()).sum()
    }
}

/// One tab rendered to Markdown.
#[derive(Debug, Clone, Serialize)]
pub struct TabMarkdown {
    pub tab_id: Option<String>,
    pub title: String,
    pub markdown: String,
    /// Elements that could not be represented and were skipped.
    pub losses: Vec<DataLoss>,
}

/// A tab as listed by `list_tabs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TabInfo {
    pub tab_id: Option<String>,
    pub title: String,
    pub index: usize,
    /// 0 for top-level tabs.
    pub depth: usize,
}

/// Outcome of an upload or create.
#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
    pub document_id: String,
    pub tab_id: Option<String>,
    /// True when the remote content already matched and nothing was sent.
    pub skipped: bool,
    /// Number of edit operations sent in the batch.
    pub request_count: usize,
    /// Raw per-request replies from the API.
    pub replies: Vec<serde_json::Value>,
}
