//! Document → Markdown serialization.
//!
//! Rendering is best-effort and total: it never fails, and the same tree
//! always produces byte-identical output. Anything that cannot be expressed
//! is dropped and recorded as a [`DataLoss`] notice so callers can surface it.
//!
//! ## Inline runs
//!
//! Each run is wrapped on its own (bold `**`, then italic `*`, then `<u>`),
//! so adjacent runs with different styles stay distinct. Whitespace at the
//! edges of a run, including the newline that terminates every Docs
//! paragraph, is kept outside the markers: `**Title\n**` would not parse back.
//! Literal `\`, `*`, `<u>` and `</u>` in run text are backslash-escaped.

use crate::document::{Block, Body, Paragraph, Table, TableCell, TextRun};
use crate::error::DataLoss;
use tracing::debug;

/// Markdown for one tab body together with what had to be dropped.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderedBody {
    pub markdown: String,
    pub losses: Vec<DataLoss>,
}

/// Render a body to Markdown, discarding the loss report.
pub fn body_to_markdown(body: &Body) -> String {
    render_body(body).markdown
}

/// Render a body to Markdown and report every element that was dropped.
pub fn render_body(body: &Body) -> RenderedBody {
    let mut out = RenderedBody::default();

    for (index, block) in body.content.iter().enumerate() {
        match block {
            Block::Paragraph(p) => match render_paragraph(p) {
                Some(line) => out.markdown.push_str(&line),
                None => out.losses.push(DataLoss::EmptyParagraph { index }),
            },
            Block::Table(t) => render_table(t, index, &mut out),
            Block::TableOfContents(_) => out.losses.push(DataLoss::TableOfContents { index }),
            Block::SectionBreak => {}
        }
    }

    for loss in &out.losses {
        debug!("Dropped during serialization: {}", loss);
    }
    out
}

/// Render one paragraph as a single terminated line.
///
/// Returns `None` when the paragraph trims to nothing; no blank line is
/// emitted in its place.
pub fn render_paragraph(paragraph: &Paragraph) -> Option<String> {
    let text: String = paragraph.runs.iter().map(render_run).collect();
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    Some(match paragraph.style.heading_level() {
        Some(level) => format!("{} {}\n", "#".repeat(level.get() as usize), text),
        None => format!("{text}\n"),
    })
}

/// Wrap a run's text in its inline markers.
pub fn render_run(run: &TextRun) -> String {
    let escaped = escape_markup(&run.content);
    let content = escaped.as_str();
    let core = content.trim();
    if core.is_empty() || run.style.is_plain() {
        return escaped;
    }

    let start = content.len() - content.trim_start().len();
    let end = start + core.len();

    let mut wrapped = core.to_string();
    if run.style.bold {
        wrapped = format!("**{wrapped}**");
    }
    if run.style.italic {
        wrapped = format!("*{wrapped}*");
    }
    if run.style.underline {
        wrapped = format!("<u>{wrapped}</u>");
    }
    format!("{}{}{}", &content[..start], wrapped, &content[end..])
}

/// Backslash-escape text that would otherwise read as inline markup.
pub fn escape_markup(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('*', "\\*")
        .replace("<u>", "\\<u>")
        .replace("</u>", "\\</u>")
}

fn render_table(table: &Table, index: usize, out: &mut RenderedBody) {
    let Some((header, body_rows)) = table.rows.split_first() else {
        out.losses.push(DataLoss::EmptyTable { index });
        return;
    };

    let header_cells: Vec<String> = header
        .cells
        .iter()
        .enumerate()
        .map(|(column, cell)| cell_text(cell, index, 0, column, &mut out.losses))
        .collect();
    if header_cells.is_empty() {
        out.losses.push(DataLoss::EmptyTable { index });
        return;
    }

    out.markdown.push_str(&pipe_row(&header_cells));
    out.markdown
        .push_str(&pipe_row(&vec!["---".to_string(); header_cells.len()]));

    for (offset, row) in body_rows.iter().enumerate() {
        let cells: Vec<String> = row
            .cells
            .iter()
            .enumerate()
            .map(|(column, cell)| cell_text(cell, index, offset + 1, column, &mut out.losses))
            .collect();
        if !cells.is_empty() {
            out.markdown.push_str(&pipe_row(&cells));
        }
    }
    out.markdown.push('\n');
}

fn pipe_row(cells: &[String]) -> String {
    format!("| {} |\n", cells.join(" | "))
}

/// Flatten one level of a cell: the runs of its direct paragraphs.
///
/// Tables nested inside the cell are not descended into.
fn cell_text(
    cell: &TableCell,
    index: usize,
    row: usize,
    column: usize,
    losses: &mut Vec<DataLoss>,
) -> String {
    let mut pieces: Vec<String> = Vec::new();
    for block in &cell.content {
        match block {
            Block::Paragraph(p) => pieces.extend(
                p.runs
                    .iter()
                    .map(|r| r.content.replace(['\n', '\r', '\u{000B}'], " "))
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty()),
            ),
            Block::Table(_) => losses.push(DataLoss::NestedTable { index, row, column }),
            Block::TableOfContents(_) | Block::SectionBreak => {}
        }
    }
    pieces.join(" ").replace('|', "\\|")
}
