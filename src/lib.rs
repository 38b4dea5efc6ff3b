//! # gdocs-markdown
//!
//! Convert Google Docs documents to Markdown and back.
//!
//! Downloading walks the structured document returned by the Docs API and
//! writes headings, bold/italic/underline runs and pipe tables. Uploading
//! parses Markdown line by line and synthesises the positional edit
//! operations (`insertText`, `deleteContentRange`, `updateParagraphStyle`,
//! `updateTextStyle`) that rewrite a tab into that content.
//!
//! ## Pipeline Overview
//!
//! ```text
//! download                                  upload
//!  │                                         │
//!  ├─ 1. Gateway    fetch (all tabs)         ├─ 1. Gateway   fetch target tab
//!  ├─ 2. Model      normalise tabs/blocks    ├─ 2. Compare   skip if unchanged
//!  ├─ 3. Serialize  body → Markdown          ├─ 3. Edits     lines → operations
//!  └─ 4. Output     one .md per tab          └─ 4. Gateway   one batchUpdate
//! ```
//!
//! The round trip is lossy by construction: only headings, paragraphs with
//! inline runs, and simple tables survive. Everything dropped is reported as a
//! [`DataLoss`] notice instead of failing.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gdocs_markdown::{download, SyncConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Token from GOOGLE_DOCS_ACCESS_TOKEN, or gcloud application-default credentials
//!     let config = SyncConfig::default();
//!     let output = download("https://docs.google.com/document/d/<ID>/edit", &config).await?;
//!     for tab in &output.tabs {
//!         println!("## {}\n{}", tab.title, tab.markdown);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! The pure stages need no network at all:
//!
//! ```rust
//! use gdocs_markdown::{plan_upload, EditOperation, EditOptions};
//!
//! let ops = plan_upload("# Title", 1, &EditOptions::default());
//! assert!(matches!(ops[0], EditOperation::InsertText { index: 1, .. }));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `gdocs-md` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! gdocs-markdown = { version = "0.2", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod document;
pub mod error;
pub mod gateway;
pub mod images;
pub mod output;
pub mod pipeline;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{SyncConfig, SyncConfigBuilder, TabSelection};
pub use convert::{
    create_from_markdown, download, download_sync, download_to_path, list_tabs, plan_upload,
    prepare_upload, resolve_gateway, sanitize_file_name, upload, upload_file, write_download,
    PreparedUpload,
};
pub use document::{Block, Body, Document, HeadingLevel, NamedStyle, Paragraph, Tab, TextRun, TextStyle};
pub use error::{DataLoss, GdocsError};
pub use gateway::{extract_document_id, DocumentGateway, GoogleDocsClient};
pub use images::{extract_images, inline_images, ExtractReport, InlineReport};
pub use output::{DownloadOutput, TabInfo, TabMarkdown, UploadReport};
pub use pipeline::edits::{EditOperation, EditOptions};
pub use pipeline::serialize::{body_to_markdown, render_body, RenderedBody};
