//! CLI binary for gdocs-markdown.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `SyncConfig` and prints results.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use gdocs_markdown::{
    create_from_markdown, download, extract_images, inline_images, list_tabs, plan_upload, prepare_upload,
    upload, write_download, EditOptions, SyncConfig, TabSelection, UploadReport,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Download every tab into ./<Document_Title>/
  gdocs-md download https://docs.google.com/document/d/<ID>/edit

  # One tab to a single file
  gdocs-md download <ID> -t Intro -o intro.md

  # List tabs as JSON
  gdocs-md list-tabs <ID> --json

  # Replace a document's first tab with a local file
  gdocs-md upload <ID> notes.md

  # Show the batchUpdate request without sending it
  gdocs-md upload <ID> notes.md --dry-run

  # Create a new document from Markdown
  gdocs-md upload notes.md --create --title "Meeting notes"

  # Move embedded base64 images into ./imgs/ and back
  gdocs-md images extract notes.md
  gdocs-md images inline notes.md

AUTHENTICATION (first match wins):
  --access-token / GDOCS_MD_ACCESS_TOKEN
  GOOGLE_DOCS_ACCESS_TOKEN
  gcloud auth application-default print-access-token

  One-time setup:
    gcloud auth application-default login \
      --scopes=https://www.googleapis.com/auth/documents
"#;

/// Download Google Docs as Markdown and upload Markdown back.
#[derive(Parser, Debug)]
#[command(
    name = "gdocs-md",
    version,
    about = "Download Google Docs as Markdown and upload Markdown back",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    global: GlobalArgs,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// OAuth access token (skips env and gcloud lookup).
    #[arg(long, global = true, env = "GDOCS_MD_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Retries on transient API failures (429/5xx, timeouts).
    #[arg(long, global = true, env = "GDOCS_MD_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Per-request timeout in seconds.
    #[arg(long, global = true, env = "GDOCS_MD_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Disable the progress spinner.
    #[arg(long, global = true, env = "GDOCS_MD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "GDOCS_MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "GDOCS_MD_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download a document as Markdown (one file per tab).
    Download {
        /// Document URL or id.
        document: String,

        /// Output file (`.md`, single tab) or directory.
        #[arg(short, long, env = "GDOCS_MD_OUTPUT")]
        output: Option<PathBuf>,

        /// Tab id or title to download; repeatable. Default: all tabs.
        #[arg(short = 't', long = "tab")]
        tabs: Vec<String>,

        /// Print structured JSON to stdout instead of writing files.
        #[arg(long)]
        json: bool,
    },

    /// List a document's tabs.
    ListTabs {
        /// Document URL or id.
        document: String,

        #[arg(long)]
        json: bool,
    },

    /// Replace a document tab with a Markdown file, or create a new document.
    Upload {
        /// `[DOC] FILE`: the document is omitted with --create.
        #[arg(num_args = 1..=2, value_names = ["DOC", "FILE"], required = true)]
        targets: Vec<String>,

        /// Create a new document instead of updating one.
        #[arg(long)]
        create: bool,

        /// Title for --create. Default: the file name.
        #[arg(long, requires = "create")]
        title: Option<String>,

        /// Tab id or title to replace. Default: the first tab.
        #[arg(long)]
        tab: Option<String>,

        /// Upload even if the document already matches the file.
        #[arg(long, env = "GDOCS_MD_OVERWRITE")]
        overwrite: bool,

        /// Print the batchUpdate request instead of sending it.
        #[arg(long)]
        dry_run: bool,

        /// Insert `**`, `*` and `<u>` markers literally instead of as styles.
        #[arg(long, env = "GDOCS_MD_NO_INLINE_STYLES")]
        no_inline_styles: bool,
    },

    /// Extract or inline images embedded in Markdown files.
    Images {
        #[command(subcommand)]
        action: ImagesCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ImagesCommand {
    /// Move base64 data-URI images into ./imgs/ next to the file.
    Extract {
        markdown: PathBuf,

        /// Export the images but leave the Markdown file untouched.
        #[arg(long)]
        no_rewrite: bool,
    },
    /// Turn `[imageN]: <path>` references back into data URIs.
    Inline {
        markdown: PathBuf,

        /// Report what would change without rewriting the file.
        #[arg(long)]
        no_rewrite: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let g = &cli.global;

    // ── Logging setup ────────────────────────────────────────────────────
    // Log lines would tear the spinner, so it runs with errors only.
    let show_progress = !g.quiet && !g.no_progress;
    let filter = if g.verbose {
        "debug"
    } else if g.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Command::Download {
            document,
            output,
            tabs,
            json,
        } => {
            let config = build_config(g, TabSelection::from_names(tabs.clone()), |b| b)?;
            let downloaded = with_spinner(show_progress && !json, "Fetching document…", download(document, &config))
                .await
                .context("Download failed")?;

            if *json {
                println!("{}", serde_json::to_string_pretty(&downloaded).context("Failed to serialise output")?);
                return Ok(());
            }

            let written = write_download(&downloaded, output.as_deref())
                .await
                .context("Failed to write Markdown")?;
            if !g.quiet {
                for path in &written {
                    eprintln!("{} {}", green("✔"), bold(&path.display().to_string()));
                }
                let losses = downloaded.loss_count();
                if losses > 0 {
                    eprintln!(
                        "{} {} element(s) could not be represented in Markdown (run with -v for details)",
                        yellow("⚠"),
                        losses
                    );
                }
            }
        }

        Command::ListTabs { document, json } => {
            let config = build_config(g, TabSelection::All, |b| b)?;
            let tabs = with_spinner(show_progress && !json, "Fetching document…", list_tabs(document, &config))
                .await
                .context("Failed to list tabs")?;

            if *json {
                println!("{}", serde_json::to_string_pretty(&tabs).context("Failed to serialise output")?);
            } else {
                for tab in &tabs {
                    println!(
                        "{}{}  {}",
                        "  ".repeat(tab.depth),
                        bold(&tab.title),
                        dim(tab.tab_id.as_deref().unwrap_or("-"))
                    );
                }
            }
        }

        Command::Upload {
            targets,
            create,
            title,
            tab,
            overwrite,
            dry_run,
            no_inline_styles,
        } => {
            let (document, file) = match (targets.as_slice(), *create) {
                ([file], true) => (None, PathBuf::from(file)),
                ([doc, file], false) => (Some(doc.as_str()), PathBuf::from(file)),
                ([_], false) => bail!("upload needs a document URL or id, or --create"),
                (_, true) => bail!("--create takes only the Markdown file, not a document"),
                _ => bail!("upload takes [DOC] FILE"),
            };

            let selection = TabSelection::from_names(tab.iter().cloned().collect());
            let config = build_config(g, selection, |b| {
                b.overwrite(*overwrite).restore_inline_styles(!no_inline_styles)
            })?;
            let markdown = gdocs_markdown::convert::read_markdown(&file)
                .await
                .context("Failed to read Markdown file")?;

            match document {
                None => {
                    let title = title.clone().unwrap_or_else(|| default_title(&file));
                    if *dry_run {
                        let options = EditOptions {
                            restore_inline_styles: !no_inline_styles,
                        };
                        let ops = plan_upload(&markdown, 1, &options);
                        let body = gdocs_markdown::pipeline::edits::batch_update_body(&ops, None);
                        println!("{}", serde_json::to_string_pretty(&body)?);
                        return Ok(());
                    }
                    let report = with_spinner(
                        show_progress,
                        "Creating document…",
                        create_from_markdown(&title, &markdown, &config),
                    )
                    .await
                    .context("Create failed")?;
                    print_upload(&report, g.quiet);
                }
                Some(document) => {
                    if *dry_run {
                        let prepared = with_spinner(
                            show_progress,
                            "Fetching document…",
                            prepare_upload(document, &markdown, &config),
                        )
                        .await
                        .context("Failed to prepare upload")?;
                        if prepared.unchanged && !g.quiet {
                            eprintln!("{} remote content already matches {}", dim("note:"), file.display());
                        }
                        println!("{}", serde_json::to_string_pretty(&prepared.request_body())?);
                        return Ok(());
                    }
                    let report = with_spinner(show_progress, "Uploading…", upload(document, &markdown, &config))
                        .await
                        .context("Upload failed")?;
                    print_upload(&report, g.quiet);
                }
            }
        }

        Command::Images { action } => match action {
            ImagesCommand::Extract { markdown, no_rewrite } => {
                let report = extract_images(markdown, !no_rewrite).context("Image extraction failed")?;
                if !g.quiet {
                    if report.found == 0 {
                        eprintln!("No embedded images found in {}", markdown.display());
                    } else {
                        eprintln!(
                            "{} Found {} embedded image(s); exported {} unique image(s) to {}{}",
                            green("✔"),
                            report.found,
                            report.unique,
                            bold(&report.images_dir.display().to_string()),
                            if report.rewritten { " (markdown updated)" } else { "" }
                        );
                    }
                }
            }
            ImagesCommand::Inline { markdown, no_rewrite } => {
                let report = inline_images(markdown, !no_rewrite).context("Image inlining failed")?;
                if !g.quiet {
                    for path in &report.missing {
                        eprintln!("{} image file not found: {}", yellow("⚠"), path.display());
                    }
                    if report.inlined.is_empty() {
                        eprintln!("No image references found to inline");
                    } else {
                        eprintln!(
                            "{} Inlined {} image(s) as data URIs{}",
                            green("✔"),
                            report.inlined.len(),
                            if report.rewritten { " (markdown updated)" } else { "" }
                        );
                    }
                }
            }
        },
    }

    Ok(())
}

/// Map global flags (plus per-command tweaks) to `SyncConfig`.
fn build_config(
    g: &GlobalArgs,
    tabs: TabSelection,
    extra: impl FnOnce(gdocs_markdown::SyncConfigBuilder) -> gdocs_markdown::SyncConfigBuilder,
) -> Result<SyncConfig> {
    let mut builder = SyncConfig::builder()
        .max_retries(g.max_retries)
        .api_timeout_secs(g.api_timeout)
        .tabs(tabs);
    if let Some(ref token) = g.access_token {
        builder = builder.access_token(token);
    }
    extra(builder).build().context("Invalid configuration")
}

/// Run `fut` under an indicatif spinner when `enabled`.
async fn with_spinner<T>(enabled: bool, message: &str, fut: impl Future<Output = T>) -> T {
    if !enabled {
        return fut.await;
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    let out = fut.await;
    bar.finish_and_clear();
    out
}

fn print_upload(report: &UploadReport, quiet: bool) {
    if quiet {
        return;
    }
    if report.skipped {
        eprintln!(
            "{} No changes detected for {}; nothing uploaded (use --overwrite to force)",
            dim("•"),
            report.document_id
        );
    } else {
        eprintln!(
            "{} Sent {} operation(s) to https://docs.google.com/document/d/{}/edit",
            green("✔"),
            report.request_count,
            report.document_id
        );
    }
}

fn default_title(file: &Path) -> String {
    file.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Untitled document".to_string())
}
