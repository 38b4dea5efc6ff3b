//! Markdown → edit operations.
//!
//! Instead of building a tree, the builder walks the Markdown line by line
//! and emits the positional operations that rewrite a remote body into that
//! content. The running cursor is an explicit accumulator folded over the
//! lines; there is no hidden state, so the builder is reentrant and pure.
//!
//! ## Offsets
//!
//! Offsets are 1-based and counted in UTF-16 code units, the unit used by the
//! Docs API. Every body ends with a sentinel newline that can never be
//! deleted; in an empty body it sits at offset 1, and every insertion lands
//! just before it.
//!
//! ## Line kinds
//!
//! | Line | Operations |
//! |------|------------|
//! | blank | insert `"\n"` |
//! | `#`… heading | insert text, set `HEADING_n` (n clamped to 6) |
//! | `|`… table row | insert verbatim (no table structure is rebuilt) |
//! | anything else | insert as a `NORMAL_TEXT` paragraph |
//!
//! Headings and paragraphs additionally get their inline markers turned into
//! text-style operations unless [`EditOptions::restore_inline_styles`] is off.

use super::inline::{parse_inline, plain_text, Span};
use crate::document::{HeadingLevel, NamedStyle, TextStyle};
use serde::Serialize;
use serde_json::Value;

/// One positional mutation of a remote document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOperation {
    InsertText { index: usize, text: String },
    /// `end` is exclusive.
    DeleteRange { start: usize, end: usize },
    SetParagraphStyle {
        start: usize,
        end: usize,
        style: NamedStyle,
    },
    /// Sets exactly the flags that are `true` in `style`.
    SetTextStyle {
        start: usize,
        end: usize,
        style: TextStyle,
    },
}

/// Knobs for [`build_edits`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditOptions {
    /// Turn `**`, `*` and `<u>` markers back into styled runs. Default: true.
    ///
    /// When off, heading and paragraph text is inserted verbatim, markers
    /// included.
    pub restore_inline_styles: bool,
}

impl Default for EditOptions {
    fn default() -> Self {
        Self {
            restore_inline_styles: true,
        }
    }
}

/// The operations for one upload plus the final cursor position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditPlan {
    pub operations: Vec<EditOperation>,
    pub cursor: usize,
}

/// Classification of one Markdown line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    Blank,
    Heading { level: HeadingLevel, text: &'a str },
    TableRow(&'a str),
    Paragraph(&'a str),
}

impl<'a> Line<'a> {
    /// Classify a line; trailing whitespace must already be removed.
    pub fn classify(line: &'a str) -> Line<'a> {
        if line.trim().is_empty() {
            Line::Blank
        } else if line.starts_with('#') {
            let rest = line.trim_start_matches('#');
            Line::Heading {
                level: HeadingLevel::clamped(line.len() - rest.len()),
                text: rest.trim(),
            }
        } else if line.starts_with('|') && line[1..].contains('|') {
            Line::TableRow(line)
        } else {
            Line::Paragraph(line)
        }
    }
}

/// Length in the API's offset unit.
pub fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}

/// Build the operations that replace a body ending at `end_index` with `markdown`.
pub fn build_edits(markdown: &str, end_index: usize, options: &EditOptions) -> EditPlan {
    let mut operations = Vec::new();
    // Everything before the sentinel newline; nothing to delete when the
    // body holds only the sentinel.
    if end_index > 2 {
        operations.push(EditOperation::DeleteRange {
            start: 1,
            end: end_index - 1,
        });
    }
    let plan = EditPlan {
        operations,
        cursor: 1,
    };

    let lines: Vec<&str> = markdown.lines().map(str::trim_end).collect();
    if lines.len() == 1 && lines[0].is_empty() {
        return plan;
    }

    lines
        .into_iter()
        .fold(plan, |plan, line| plan.push_line(Line::classify(line), options))
}

impl EditPlan {
    fn push_line(self, line: Line<'_>, options: &EditOptions) -> Self {
        match line {
            Line::Blank => self.insert_verbatim(""),
            Line::TableRow(row) => self.insert_verbatim(row),
            Line::Heading { level, text } => {
                self.insert_paragraph(text, Some(NamedStyle::Heading(level)), options)
            }
            Line::Paragraph(text) => self.insert_paragraph(text, None, options),
        }
    }

    fn insert_verbatim(mut self, text: &str) -> Self {
        let index = self.cursor;
        self.cursor += utf16_len(text) + 1;
        self.operations.push(EditOperation::InsertText {
            index,
            text: format!("{text}\n"),
        });
        self
    }

    fn insert_paragraph(mut self, text: &str, style: Option<NamedStyle>, options: &EditOptions) -> Self {
        let spans = if options.restore_inline_styles {
            parse_inline(text)
        } else {
            vec![Span::plain(text)]
        };
        let plain = plain_text(&spans);
        let start = self.cursor;
        let len = utf16_len(&plain);

        self.operations.push(EditOperation::InsertText {
            index: start,
            text: format!("{plain}\n"),
        });
        if let Some(style) = style {
            if len > 0 {
                self.operations.push(EditOperation::SetParagraphStyle {
                    start,
                    end: start + len,
                    style,
                });
            }
        }

        let mut offset = start;
        for span in &spans {
            let span_len = utf16_len(&span.text);
            if !span.style.is_plain() {
                self.operations.push(EditOperation::SetTextStyle {
                    start: offset,
                    end: offset + span_len,
                    style: span.style,
                });
            }
            offset += span_len;
        }

        self.cursor = start + len + 1;
        self
    }

    /// Sum of the lengths of every inserted text.
    pub fn inserted_len(&self) -> usize {
        self.operations
            .iter()
            .map(|op| match op {
                EditOperation::InsertText { text, .. } => utf16_len(text),
                _ => 0,
            })
            .sum()
    }
}

// ── Wire form ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Location<'a> {
    index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    tab_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Range<'a> {
    start_index: usize,
    end_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    tab_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertTextRequest<'a> {
    location: Location<'a>,
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteContentRangeRequest<'a> {
    range: Range<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ParagraphStyleFields {
    named_style_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateParagraphStyleRequest<'a> {
    range: Range<'a>,
    paragraph_style: ParagraphStyleFields,
    fields: &'static str,
}

#[derive(Debug, Serialize)]
struct TextStyleFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    italic: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    underline: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateTextStyleRequest<'a> {
    range: Range<'a>,
    text_style: TextStyleFields,
    fields: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum Request<'a> {
    InsertText(InsertTextRequest<'a>),
    DeleteContentRange(DeleteContentRangeRequest<'a>),
    UpdateParagraphStyle(UpdateParagraphStyleRequest<'a>),
    UpdateTextStyle(UpdateTextStyleRequest<'a>),
}

impl EditOperation {
    fn as_request<'a>(&'a self, tab_id: Option<&'a str>) -> Request<'a> {
        let range = |start_index, end_index| Range {
            start_index,
            end_index,
            tab_id,
        };
        match self {
            EditOperation::InsertText { index, text } => Request::InsertText(InsertTextRequest {
                location: Location {
                    index: *index,
                    tab_id,
                },
                text,
            }),
            EditOperation::DeleteRange { start, end } => {
                Request::DeleteContentRange(DeleteContentRangeRequest {
                    range: range(*start, *end),
                })
            }
            EditOperation::SetParagraphStyle { start, end, style } => {
                Request::UpdateParagraphStyle(UpdateParagraphStyleRequest {
                    range: range(*start, *end),
                    paragraph_style: ParagraphStyleFields {
                        named_style_type: style.api_name().into_owned(),
                    },
                    fields: "namedStyleType",
                })
            }
            EditOperation::SetTextStyle { start, end, style } => {
                let flag = |on: bool| on.then_some(true);
                let fields: Vec<&str> = [
                    (style.bold, "bold"),
                    (style.italic, "italic"),
                    (style.underline, "underline"),
                ]
                .into_iter()
                .filter_map(|(on, name)| on.then_some(name))
                .collect();
                Request::UpdateTextStyle(UpdateTextStyleRequest {
                    range: range(*start, *end),
                    text_style: TextStyleFields {
                        bold: flag(style.bold),
                        italic: flag(style.italic),
                        underline: flag(style.underline),
                    },
                    fields: fields.join(","),
                })
            }
        }
    }

    /// The `batchUpdate` request record for this operation.
    pub fn to_request(&self, tab_id: Option<&str>) -> Value {
        // Serializing plain structs of strings and integers cannot fail.
        serde_json::to_value(self.as_request(tab_id)).unwrap_or(Value::Null)
    }
}

/// The full `batchUpdate` body: `{"requests": [...]}`.
pub fn batch_update_body(operations: &[EditOperation], tab_id: Option<&str>) -> Value {
    let requests: Vec<Value> = operations.iter().map(|op| op.to_request(tab_id)).collect();
    serde_json::json!({ "requests": requests })
}
