//! Serde shapes of the Google Docs `documents.get` response and their
//! normalisation into the [`super`] model.
//!
//! Every field is optional or defaulted: the API omits empty collections
//! and default styles, and a missing field must degrade to the default
//! rendering rather than a decoding failure.

use super::{Block, Body, Document, NamedStyle, Paragraph, Tab, Table, TableCell, TableRow, TextRun, TextStyle};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDocument {
    #[serde(default)]
    pub document_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<RawBody>,
    #[serde(default)]
    pub tabs: Vec<RawTab>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTab {
    #[serde(default)]
    pub tab_properties: Option<RawTabProperties>,
    #[serde(default)]
    pub document_tab: Option<RawDocumentTab>,
    #[serde(default)]
    pub child_tabs: Vec<RawTab>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTabProperties {
    #[serde(default)]
    pub tab_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub index: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDocumentTab {
    #[serde(default)]
    pub body: Option<RawBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBody {
    #[serde(default)]
    pub content: Vec<RawStructuralElement>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStructuralElement {
    #[serde(default)]
    pub start_index: Option<usize>,
    #[serde(default)]
    pub end_index: Option<usize>,
    #[serde(default)]
    pub paragraph: Option<RawParagraph>,
    #[serde(default)]
    pub table: Option<RawTable>,
    #[serde(default)]
    pub section_break: Option<Value>,
    #[serde(default)]
    pub table_of_contents: Option<RawTableOfContents>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawParagraph {
    #[serde(default)]
    pub elements: Vec<RawParagraphElement>,
    #[serde(default)]
    pub paragraph_style: Option<RawParagraphStyle>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawParagraphStyle {
    #[serde(default)]
    pub named_style_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawParagraphElement {
    #[serde(default)]
    pub text_run: Option<RawTextRun>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTextRun {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub text_style: Option<RawTextStyle>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTextStyle {
    #[serde(default)]
    pub bold: Option<bool>,
    #[serde(default)]
    pub italic: Option<bool>,
    #[serde(default)]
    pub underline: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTable {
    #[serde(default)]
    pub table_rows: Vec<RawTableRow>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTableRow {
    #[serde(default)]
    pub table_cells: Vec<RawTableCell>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTableCell {
    #[serde(default)]
    pub content: Vec<RawStructuralElement>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTableOfContents {
    #[serde(default)]
    pub content: Vec<RawStructuralElement>,
}

// ── Normalisation ────────────────────────────────────────────────────────

impl Document {
    /// Decode a `documents.get` JSON payload.
    pub fn from_json(json: &str) -> Result<Document, serde_json::Error> {
        let raw: RawDocument = serde_json::from_str(json)?;
        Ok(raw.into())
    }

    /// Decode an already-parsed `documents.get` payload.
    pub fn from_value(value: Value) -> Result<Document, serde_json::Error> {
        let raw: RawDocument = serde_json::from_value(value)?;
        Ok(raw.into())
    }
}

impl From<RawDocument> for Document {
    fn from(raw: RawDocument) -> Self {
        let title = raw.title.unwrap_or_default();
        let tabs = if raw.tabs.is_empty() {
            // Legacy single-body shape (or a document with no content at all):
            // one implicit tab carrying the document title.
            vec![Tab {
                id: None,
                title: title.clone(),
                index: 0,
                body: raw.body.map(Body::from).unwrap_or_else(Body::empty),
                children: Vec::new(),
            }]
        } else {
            raw.tabs
                .into_iter()
                .enumerate()
                .map(|(i, t)| normalise_tab(t, i))
                .collect()
        };

        Document {
            id: raw.document_id.unwrap_or_default(),
            title,
            tabs,
        }
    }
}

fn normalise_tab(raw: RawTab, position: usize) -> Tab {
    let props = raw.tab_properties.unwrap_or_default();
    let body = raw
        .document_tab
        .and_then(|d| d.body)
        .map(Body::from)
        .unwrap_or_else(Body::empty);
    let children = raw
        .child_tabs
        .into_iter()
        .enumerate()
        .map(|(i, t)| normalise_tab(t, i))
        .collect();

    Tab {
        id: props.tab_id,
        title: props
            .title
            .unwrap_or_else(|| format!("Tab {}", position + 1)),
        index: props.index.unwrap_or(position),
        body,
        children,
    }
}

impl From<RawBody> for Body {
    fn from(raw: RawBody) -> Self {
        let end_index = raw
            .content
            .last()
            .and_then(|e| e.end_index)
            .unwrap_or(1);
        Body {
            content: normalise_blocks(raw.content),
            end_index,
        }
    }
}

fn normalise_blocks(elements: Vec<RawStructuralElement>) -> Vec<Block> {
    elements.into_iter().filter_map(normalise_block).collect()
}

/// Elements carrying none of the known keys are dropped.
fn normalise_block(raw: RawStructuralElement) -> Option<Block> {
    if let Some(p) = raw.paragraph {
        return Some(Block::Paragraph(p.into()));
    }
    if let Some(t) = raw.table {
        return Some(Block::Table(t.into()));
    }
    if let Some(toc) = raw.table_of_contents {
        return Some(Block::TableOfContents(normalise_blocks(toc.content)));
    }
    raw.section_break.map(|_| Block::SectionBreak)
}

impl From<RawParagraph> for Paragraph {
    fn from(raw: RawParagraph) -> Self {
        let style = raw
            .paragraph_style
            .and_then(|s| s.named_style_type)
            .map(|name| NamedStyle::parse(&name))
            .unwrap_or_default();
        // Only text runs survive; inline objects, page breaks, chips, etc. are dropped.
        let runs = raw
            .elements
            .into_iter()
            .filter_map(|e| e.text_run)
            .map(|run| {
                let style = run.text_style.unwrap_or_default();
                TextRun {
                    content: run.content.unwrap_or_default(),
                    style: TextStyle {
                        bold: style.bold.unwrap_or(false),
                        italic: style.italic.unwrap_or(false),
                        underline: style.underline.unwrap_or(false),
                    },
                }
            })
            .collect();
        Paragraph { style, runs }
    }
}

impl From<RawTable> for Table {
    fn from(raw: RawTable) -> Self {
        Table {
            rows: raw
                .table_rows
                .into_iter()
                .map(|row| TableRow {
                    cells: row
                        .table_cells
                        .into_iter()
                        .map(|cell| TableCell {
                            content: normalise_blocks(cell.content),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}
