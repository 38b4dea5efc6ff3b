//! Conversion entry points: download, list, upload, create.
//!
//! Each function takes a document URL or id plus a [`SyncConfig`], resolves
//! a [`DocumentGateway`], and drives the pure stages in [`crate::pipeline`].
//! Nothing here parses Markdown or walks the document tree itself.

use crate::config::{SyncConfig, TabSelection};
use crate::document::{Document, Tab};
use crate::error::GdocsError;
use crate::gateway::{extract_document_id, DocumentGateway, GoogleDocsClient};
use crate::output::{DownloadOutput, TabInfo, TabMarkdown, UploadReport};
use crate::pipeline::edits::{batch_update_body, build_edits, EditOperation, EditOptions};
use crate::pipeline::serialize::render_body;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Download every selected tab of a document as Markdown.
///
/// # Errors
/// - [`GdocsError::InvalidArgument`] for an unrecognisable URL or id
/// - [`GdocsError::TabNotFound`] when a named tab does not exist
/// - any gateway error from fetching the document
pub async fn download(input: impl AsRef<str>, config: &SyncConfig) -> Result<DownloadOutput, GdocsError> {
    let document_id = extract_document_id(input.as_ref())?;
    let gateway = resolve_gateway(config).await?;
    let document = gateway.fetch(&document_id, true).await?;

    let tabs: Vec<TabMarkdown> = select_tabs(&document, &config.tabs)?
        .into_iter()
        .map(|tab| {
            let rendered = render_body(&tab.body);
            if !rendered.losses.is_empty() {
                warn!(
                    "Tab '{}': {} element(s) could not be represented in Markdown",
                    tab.title,
                    rendered.losses.len()
                );
            }
            TabMarkdown {
                tab_id: tab.id.clone(),
                title: tab.title.clone(),
                markdown: rendered.markdown,
                losses: rendered.losses,
            }
        })
        .collect();

    info!("Downloaded '{}': {} tab(s)", document.title, tabs.len());
    Ok(DownloadOutput {
        document_id: document.id,
        title: document.title,
        tabs,
    })
}

/// Download and write the Markdown to disk. Returns the written paths.
///
/// Output location:
/// - `None` → a directory named after the document title
/// - a `*.md` path with exactly one selected tab → that file
/// - anything else → a directory holding one `{tab title}.md` per tab
pub async fn download_to_path(
    input: impl AsRef<str>,
    output: Option<&Path>,
    config: &SyncConfig,
) -> Result<Vec<PathBuf>, GdocsError> {
    let downloaded = download(input, config).await?;
    write_download(&downloaded, output).await
}

/// Write an already-downloaded document following [`download_to_path`]'s layout.
pub async fn write_download(downloaded: &DownloadOutput, output: Option<&Path>) -> Result<Vec<PathBuf>, GdocsError> {
    let is_md = |p: &Path| p.extension().is_some_and(|e| e.eq_ignore_ascii_case("md"));

    if let (Some(path), [tab]) = (output, downloaded.tabs.as_slice()) {
        if is_md(path) {
            write_atomic(path, &tab.markdown).await?;
            return Ok(vec![path.to_path_buf()]);
        }
    }

    let dir = match output {
        Some(path) if is_md(path) => path.with_extension(""),
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(sanitize_file_name(&downloaded.title)),
    };

    let titles: Vec<&str> = downloaded.tabs.iter().map(|t| t.title.as_str()).collect();
    let mut written = Vec::with_capacity(titles.len());
    for (tab, name) in downloaded.tabs.iter().zip(tab_file_names(&titles)) {
        let path = dir.join(name);
        write_atomic(&path, &tab.markdown).await?;
        written.push(path);
    }
    Ok(written)
}

/// Synchronous wrapper around [`download`].
///
/// Creates a temporary tokio runtime internally.
pub fn download_sync(input: impl AsRef<str>, config: &SyncConfig) -> Result<DownloadOutput, GdocsError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| GdocsError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(download(input, config))
}

/// List every tab of a document, depth-first.
pub async fn list_tabs(input: impl AsRef<str>, config: &SyncConfig) -> Result<Vec<TabInfo>, GdocsError> {
    let document_id = extract_document_id(input.as_ref())?;
    let gateway = resolve_gateway(config).await?;
    let document = gateway.fetch(&document_id, true).await?;

    Ok(document
        .all_tabs()
        .into_iter()
        .map(|(depth, tab)| TabInfo {
            tab_id: tab.id.clone(),
            title: tab.title.clone(),
            index: tab.index,
            depth,
        })
        .collect())
}

/// The edits an upload would send, computed without sending them.
#[derive(Debug, Clone)]
pub struct PreparedUpload {
    pub document_id: String,
    pub tab_id: Option<String>,
    pub operations: Vec<EditOperation>,
    /// The remote tab already renders to the same Markdown.
    pub unchanged: bool,
}

impl PreparedUpload {
    /// The `batchUpdate` body these operations would be sent as.
    pub fn request_body(&self) -> serde_json::Value {
        batch_update_body(&self.operations, self.tab_id.as_deref())
    }
}

/// Fetch the target tab and compute the edits that replace it with `markdown`.
///
/// The target is the first selected tab, or the document's first tab.
pub async fn prepare_upload(
    input: impl AsRef<str>,
    markdown: &str,
    config: &SyncConfig,
) -> Result<PreparedUpload, GdocsError> {
    let document_id = extract_document_id(input.as_ref())?;
    let gateway = resolve_gateway(config).await?;
    prepare_with(gateway.as_ref(), document_id, markdown, config).await
}

/// Replace a tab's content with `markdown`.
///
/// When the remote tab already renders to the same Markdown and
/// `config.overwrite` is false, nothing is sent and the report is marked
/// `skipped`.
pub async fn upload(input: impl AsRef<str>, markdown: &str, config: &SyncConfig) -> Result<UploadReport, GdocsError> {
    let document_id = extract_document_id(input.as_ref())?;
    let gateway = resolve_gateway(config).await?;
    let prepared = prepare_with(gateway.as_ref(), document_id, markdown, config).await?;

    if prepared.unchanged && !config.overwrite {
        info!("No changes detected for document {}; skipping upload", prepared.document_id);
        return Ok(UploadReport {
            document_id: prepared.document_id,
            tab_id: prepared.tab_id,
            skipped: true,
            request_count: 0,
            replies: Vec::new(),
        });
    }

    send(gateway.as_ref(), prepared.document_id, prepared.tab_id, &prepared.operations).await
}

/// Read a Markdown file and [`upload`] it.
pub async fn upload_file(
    input: impl AsRef<str>,
    path: impl AsRef<Path>,
    config: &SyncConfig,
) -> Result<UploadReport, GdocsError> {
    let markdown = read_markdown(path.as_ref()).await?;
    upload(input, &markdown, config).await
}

/// Create a new document titled `title` and fill it with `markdown`.
pub async fn create_from_markdown(
    title: &str,
    markdown: &str,
    config: &SyncConfig,
) -> Result<UploadReport, GdocsError> {
    let gateway = resolve_gateway(config).await?;
    let document = gateway.create(title).await?;
    info!("Created document {} ('{}')", document.id, document.title);

    let (tab_id, end_index) = match document.first_tab() {
        Some(tab) => (tab.id.clone(), tab.body.end_index),
        None => (None, 1),
    };
    let operations = plan_upload(markdown, end_index, &config.edit_options());
    send(gateway.as_ref(), document.id, tab_id, &operations).await
}

/// Build the edit operations replacing a body that ends at `end_offset`.
///
/// Pure: performs no I/O and cannot fail.
pub fn plan_upload(markdown: &str, end_offset: usize, options: &EditOptions) -> Vec<EditOperation> {
    build_edits(markdown, end_offset, options).operations
}

/// Reduce a title to a portable file name.
///
/// Keeps alphanumerics, spaces, `-` and `_`; spaces become `_`. An empty
/// result becomes `document`.
pub fn sanitize_file_name(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|&c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let name = kept.trim().replace(' ', "_");
    if name.is_empty() {
        "document".to_string()
    } else {
        name
    }
}

/// Resolve the gateway: a configured one, or a REST client with resolved credentials.
pub async fn resolve_gateway(config: &SyncConfig) -> Result<Arc<dyn DocumentGateway>, GdocsError> {
    if let Some(ref gateway) = config.gateway {
        return Ok(Arc::clone(gateway));
    }
    let client = GoogleDocsClient::from_config(config).await?;
    Ok(Arc::new(client))
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn prepare_with(
    gateway: &dyn DocumentGateway,
    document_id: String,
    markdown: &str,
    config: &SyncConfig,
) -> Result<PreparedUpload, GdocsError> {
    let document = gateway.fetch(&document_id, true).await?;
    let tab = upload_target(&document, &config.tabs)?;

    let current = render_body(&tab.body).markdown;
    let unchanged = current.trim_end() == markdown.trim_end();
    let operations = plan_upload(markdown, tab.body.end_index, &config.edit_options());
    debug!(
        "Upload to tab '{}': {} operation(s), end index {}",
        tab.title,
        operations.len(),
        tab.body.end_index
    );

    Ok(PreparedUpload {
        document_id,
        tab_id: tab.id.clone(),
        operations,
        unchanged,
    })
}

async fn send(
    gateway: &dyn DocumentGateway,
    document_id: String,
    tab_id: Option<String>,
    operations: &[EditOperation],
) -> Result<UploadReport, GdocsError> {
    let replies = if operations.is_empty() {
        Vec::new()
    } else {
        gateway
            .apply_edits(&document_id, tab_id.as_deref(), operations)
            .await?
    };
    info!(
        "Uploaded {} operation(s) to document {}",
        operations.len(),
        document_id
    );
    Ok(UploadReport {
        document_id,
        tab_id,
        skipped: false,
        request_count: operations.len(),
        replies,
    })
}

fn tab_titles(document: &Document) -> Vec<String> {
    document
        .all_tabs()
        .into_iter()
        .map(|(_, t)| t.title.clone())
        .collect()
}

fn select_tabs<'a>(document: &'a Document, selection: &TabSelection) -> Result<Vec<&'a Tab>, GdocsError> {
    match selection {
        TabSelection::All => Ok(document.all_tabs().into_iter().map(|(_, t)| t).collect()),
        TabSelection::Named(names) => names
            .iter()
            .map(|name| {
                document.find_tab(name).ok_or_else(|| GdocsError::TabNotFound {
                    selector: name.clone(),
                    available: tab_titles(document),
                })
            })
            .collect(),
    }
}

fn upload_target<'a>(document: &'a Document, selection: &TabSelection) -> Result<&'a Tab, GdocsError> {
    select_tabs(document, selection)?
        .into_iter()
        .next()
        .ok_or_else(|| GdocsError::Internal(format!("Document {} has no tabs", document.id)))
}

/// `{sanitised title}.md` per tab, with `-2`, `-3`… appended to repeats.
fn tab_file_names(titles: &[&str]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    titles
        .iter()
        .map(|title| {
            let base = sanitize_file_name(title);
            let mut candidate = base.clone();
            let mut n = 2;
            while !seen.insert(candidate.to_lowercase()) {
                candidate = format!("{base}-{n}");
                n += 1;
            }
            format!("{candidate}.md")
        })
        .collect()
}

pub async fn read_markdown(path: &Path) -> Result<String, GdocsError> {
    tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            GdocsError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            GdocsError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })
}

/// Atomic write: write to a sibling temp file, then rename over the target.
async fn write_atomic(path: &Path, contents: &str) -> Result<(), GdocsError> {
    let write_err = |e| GdocsError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, contents).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    debug!("Wrote {}", path.display());
    Ok(())
}

/// Blocking [`write_atomic`] for the synchronous image utilities.
pub(crate) fn write_atomic_blocking(path: &Path, contents: &str) -> Result<(), GdocsError> {
    let write_err = |e| GdocsError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    let tmp_path = path.with_extension("md.tmp");
    std::fs::write(&tmp_path, contents).map_err(write_err)?;
    std::fs::rename(&tmp_path, path).map_err(write_err)?;
    debug!("Wrote {}", path.display());
    Ok(())
}
