//! In-memory `DocumentGateway` that applies edit operations the way the
//! Docs API does, so round trips can be tested without a network.
//!
//! Only top-level paragraphs are modelled when applying edits. Offsets are
//! counted per `char`, which equals UTF-16 units for the BMP text used here.

#![allow(dead_code)]

use async_trait::async_trait;
use gdocs_markdown::{
    Block, Body, Document, DocumentGateway, EditOperation, GdocsError, NamedStyle, Paragraph, Tab, TextRun,
    TextStyle,
};
use std::collections::HashMap;
use std::sync::Mutex;

/// One recorded `apply_edits` call.
#[derive(Debug, Clone)]
pub struct AppliedBatch {
    pub document_id: String,
    pub tab_id: Option<String>,
    pub operations: Vec<EditOperation>,
}

#[derive(Default)]
pub struct MockGateway {
    documents: Mutex<HashMap<String, Document>>,
    batches: Mutex<Vec<AppliedBatch>>,
    next_id: Mutex<usize>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, document: Document) -> Self {
        self.documents
            .lock()
            .unwrap()
            .insert(document.id.clone(), document);
        self
    }

    pub fn document(&self, id: &str) -> Document {
        self.documents.lock().unwrap()[id].clone()
    }

    pub fn batches(&self) -> Vec<AppliedBatch> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentGateway for MockGateway {
    async fn fetch(&self, document_id: &str, _include_all_tabs: bool) -> Result<Document, GdocsError> {
        self.documents
            .lock()
            .unwrap()
            .get(document_id)
            .cloned()
            .ok_or_else(|| GdocsError::NotFound {
                document_id: document_id.to_string(),
            })
    }

    async fn create(&self, title: &str) -> Result<Document, GdocsError> {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        let document = Document {
            id: format!("created-document-{next}"),
            title: title.to_string(),
            tabs: vec![tab("t.0", "Tab 1", empty_body())],
        };
        self.documents
            .lock()
            .unwrap()
            .insert(document.id.clone(), document.clone());
        Ok(document)
    }

    async fn apply_edits(
        &self,
        document_id: &str,
        tab_id: Option<&str>,
        operations: &[EditOperation],
    ) -> Result<Vec<serde_json::Value>, GdocsError> {
        let mut documents = self.documents.lock().unwrap();
        let document = documents.get_mut(document_id).ok_or_else(|| GdocsError::NotFound {
            document_id: document_id.to_string(),
        })?;
        let target = find_tab_mut(&mut document.tabs, tab_id)
            .ok_or_else(|| GdocsError::InvalidArgument(format!("no tab {tab_id:?}")))?;

        let mut cells = to_cells(&target.body);
        for op in operations {
            apply(&mut cells, op)?;
        }
        target.body = from_cells(&cells);

        self.batches.lock().unwrap().push(AppliedBatch {
            document_id: document_id.to_string(),
            tab_id: tab_id.map(str::to_string),
            operations: operations.to_vec(),
        });
        Ok(operations.iter().map(|_| serde_json::json!({})).collect())
    }
}

// ── Document builders ────────────────────────────────────────────────────────

/// A body holding only the undeletable trailing newline.
pub fn empty_body() -> Body {
    Body {
        content: vec![
            Block::SectionBreak,
            Block::Paragraph(Paragraph::new(NamedStyle::NormalText, vec![TextRun::plain("\n")])),
        ],
        end_index: 2,
    }
}

/// A body built from `(style, runs)` paragraphs, with correct offsets.
pub fn body_of(paragraphs: Vec<(NamedStyle, Vec<TextRun>)>) -> Body {
    let mut cells = Vec::new();
    for (style, runs) in paragraphs {
        for run in runs {
            cells.extend(run.content.chars().map(|ch| Cell {
                ch,
                style: run.style,
                paragraph: style.clone(),
            }));
        }
    }
    cells.push(Cell::newline(NamedStyle::NormalText));
    from_cells(&cells)
}

pub fn tab(id: &str, title: &str, body: Body) -> Tab {
    Tab {
        id: Some(id.to_string()),
        title: title.to_string(),
        index: 0,
        body,
        children: Vec::new(),
    }
}

// ── Edit simulation ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Cell {
    ch: char,
    style: TextStyle,
    /// Meaningful on `'\n'` cells only: the style of the paragraph it ends.
    paragraph: NamedStyle,
}

impl Cell {
    fn newline(paragraph: NamedStyle) -> Self {
        Self {
            ch: '\n',
            style: TextStyle::default(),
            paragraph,
        }
    }
}

fn find_tab_mut<'a>(tabs: &'a mut [Tab], id: Option<&str>) -> Option<&'a mut Tab> {
    let Some(id) = id else {
        return tabs.first_mut();
    };
    for tab in tabs.iter_mut() {
        if tab.id.as_deref() == Some(id) {
            return Some(tab);
        }
        if let Some(found) = find_tab_mut(&mut tab.children, Some(id)) {
            return Some(found);
        }
    }
    None
}

fn to_cells(body: &Body) -> Vec<Cell> {
    let mut cells = Vec::new();
    for paragraph in body.paragraphs() {
        for run in &paragraph.runs {
            cells.extend(run.content.chars().map(|ch| Cell {
                ch,
                style: run.style,
                paragraph: paragraph.style.clone(),
            }));
        }
    }
    cells
}

fn from_cells(cells: &[Cell]) -> Body {
    let mut content = vec![Block::SectionBreak];
    let mut runs: Vec<TextRun> = Vec::new();
    for cell in cells {
        match runs.last_mut() {
            Some(run) if run.style == cell.style => run.content.push(cell.ch),
            _ => runs.push(TextRun::styled(cell.ch.to_string(), cell.style)),
        }
        if cell.ch == '\n' {
            content.push(Block::Paragraph(Paragraph::new(
                cell.paragraph.clone(),
                std::mem::take(&mut runs),
            )));
        }
    }
    Body {
        content,
        end_index: cells.len() + 1,
    }
}

fn invalid(op: &EditOperation, len: usize) -> GdocsError {
    GdocsError::Api {
        status: 400,
        operation: "applying edits".into(),
        message: format!("invalid range in {op:?} for a body of {len} units"),
    }
}

/// Apply one operation. Offsets are 1-based; the last cell is the sentinel.
fn apply(cells: &mut Vec<Cell>, op: &EditOperation) -> Result<(), GdocsError> {
    let len = cells.len();
    match op {
        EditOperation::InsertText { index, text } => {
            if *index < 1 || *index > len {
                return Err(invalid(op, len));
            }
            let inserted: Vec<Cell> = text
                .chars()
                .map(|ch| Cell {
                    ch,
                    style: TextStyle::default(),
                    paragraph: NamedStyle::NormalText,
                })
                .collect();
            let at = index - 1;
            cells.splice(at..at, inserted);
        }
        EditOperation::DeleteRange { start, end } => {
            if *start < 1 || start >= end || *end > len {
                return Err(invalid(op, len));
            }
            cells.drain(start - 1..end - 1);
        }
        EditOperation::SetParagraphStyle { start, end, style } => {
            if *start < 1 || start >= end || *end > len + 1 {
                return Err(invalid(op, len));
            }
            let mut i = start - 1;
            while i < end - 1 {
                let newline = (i..len).find(|&j| cells[j].ch == '\n').ok_or_else(|| invalid(op, len))?;
                cells[newline].paragraph = style.clone();
                i = newline + 1;
            }
        }
        EditOperation::SetTextStyle { start, end, style } => {
            if *start < 1 || start >= end || *end > len + 1 {
                return Err(invalid(op, len));
            }
            for cell in &mut cells[start - 1..end - 1] {
                cell.style = cell.style.with(*style);
            }
        }
    }
    Ok(())
}
