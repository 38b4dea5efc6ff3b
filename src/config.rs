//! Configuration types for document synchronisation.
//!
//! All download and upload behaviour is controlled through [`SyncConfig`],
//! built via its [`SyncConfigBuilder`]. The builder lets callers set only
//! what they care about and rely on the documented defaults for the rest.

use crate::error::GdocsError;
use crate::gateway::http::DEFAULT_BASE_URL;
use crate::gateway::DocumentGateway;
use crate::pipeline::edits::EditOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Configuration for downloads and uploads.
///
/// Built via [`SyncConfig::builder()`] or using [`SyncConfig::default()`].
///
/// # Example
/// ```rust
/// use gdocs_markdown::{SyncConfig, TabSelection};
///
/// let config = SyncConfig::builder()
///     .max_retries(5)
///     .tabs(TabSelection::Named(vec!["Intro".into()]))
///     .build()
///     .unwrap();
/// assert_eq!(config.max_retries, 5);
/// ```
#[derive(Clone)]
pub struct SyncConfig {
    /// Maximum retry attempts on a transient API failure. Default: 3.
    ///
    /// Only 429/500/502/503/504 and connect/timeout failures are retried;
    /// permission and not-found errors surface immediately.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubling per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-request timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// REST endpoint. Default: `https://docs.googleapis.com/v1`.
    pub base_url: String,

    /// Bearer token. If None, falls back to `GOOGLE_DOCS_ACCESS_TOKEN`, then gcloud.
    pub access_token: Option<String>,

    /// Pre-constructed gateway. Takes precedence over every credential setting.
    pub gateway: Option<Arc<dyn DocumentGateway>>,

    /// Tabs to download; the first selected tab is the upload target. Default: all.
    pub tabs: TabSelection,

    /// Turn inline markers back into bold/italic/underline on upload. Default: true.
    pub restore_inline_styles: bool,

    /// Upload even when the remote content already matches. Default: false.
    pub overwrite: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            base_url: DEFAULT_BASE_URL.to_string(),
            access_token: None,
            gateway: None,
            tabs: TabSelection::default(),
            restore_inline_styles: true,
            overwrite: false,
        }
    }
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("base_url", &self.base_url)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("gateway", &self.gateway.as_ref().map(|_| "<dyn DocumentGateway>"))
            .field("tabs", &self.tabs)
            .field("restore_inline_styles", &self.restore_inline_styles)
            .field("overwrite", &self.overwrite)
            .finish()
    }
}

impl SyncConfig {
    /// Create a new builder for `SyncConfig`.
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder {
            config: Self::default(),
        }
    }

    /// Options for the edit builder derived from this config.
    pub fn edit_options(&self) -> EditOptions {
        EditOptions {
            restore_inline_styles: self.restore_inline_styles,
        }
    }
}

/// Builder for [`SyncConfig`].
#[derive(Debug)]
pub struct SyncConfigBuilder {
    config: SyncConfig,
}

impl SyncConfigBuilder {
    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.config.access_token = Some(token.into());
        self
    }

    pub fn gateway(mut self, gateway: Arc<dyn DocumentGateway>) -> Self {
        self.config.gateway = Some(gateway);
        self
    }

    pub fn tabs(mut self, selection: TabSelection) -> Self {
        self.config.tabs = selection;
        self
    }

    pub fn restore_inline_styles(mut self, v: bool) -> Self {
        self.config.restore_inline_styles = v;
        self
    }

    pub fn overwrite(mut self, v: bool) -> Self {
        self.config.overwrite = v;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SyncConfig, GdocsError> {
        let c = &self.config;
        if c.api_timeout_secs == 0 {
            return Err(GdocsError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_retries > 10 {
            return Err(GdocsError::InvalidConfig(format!(
                "max_retries must be 0–10, got {}",
                c.max_retries
            )));
        }
        if !(c.base_url.starts_with("https://") || c.base_url.starts_with("http://")) {
            return Err(GdocsError::InvalidConfig(format!(
                "base_url must be an http(s) URL, got '{}'",
                c.base_url
            )));
        }
        if let TabSelection::Named(names) = &c.tabs {
            if names.is_empty() || names.iter().any(|n| n.trim().is_empty()) {
                return Err(GdocsError::InvalidConfig(
                    "Tab selection must name at least one non-empty tab".into(),
                ));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which tabs of a document to operate on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TabSelection {
    /// Every tab, depth-first (default).
    #[default]
    All,
    /// Tabs matched by id or title, in the order given.
    Named(Vec<String>),
}

impl TabSelection {
    /// `All` for an empty list, otherwise `Named`.
    pub fn from_names(names: Vec<String>) -> Self {
        if names.is_empty() {
            TabSelection::All
        } else {
            TabSelection::Named(names)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_backoff_ms, 500);
        assert_eq!(config.api_timeout_secs, 60);
        assert_eq!(config.base_url, "https://docs.googleapis.com/v1");
        assert_eq!(config.tabs, TabSelection::All);
        assert!(config.restore_inline_styles);
        assert!(!config.overwrite);
        assert!(config.edit_options().restore_inline_styles);
    }

    #[test]
    fn build_rejects_invalid_values() {
        assert!(SyncConfig::builder().api_timeout_secs(0).build().is_err());
        assert!(SyncConfig::builder().max_retries(11).build().is_err());
        assert!(SyncConfig::builder().base_url("docs.googleapis.com").build().is_err());
        assert!(SyncConfig::builder()
            .tabs(TabSelection::Named(vec![]))
            .build()
            .is_err());
        assert!(SyncConfig::builder()
            .tabs(TabSelection::Named(vec!["  ".into()]))
            .build()
            .is_err());
    }

    #[test]
    fn debug_redacts_token() {
        let config = SyncConfig::builder().access_token("ya29.secret").build().unwrap();
        let shown = format!("{config:?}");
        assert!(!shown.contains("ya29.secret"));
        assert!(shown.contains("<redacted>"));
    }

    #[test]
    fn tab_selection_from_names() {
        assert_eq!(TabSelection::from_names(vec![]), TabSelection::All);
        assert_eq!(
            TabSelection::from_names(vec!["Intro".into()]),
            TabSelection::Named(vec!["Intro".into()])
        );
    }
}
