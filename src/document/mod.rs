//! In-memory model of a fetched Google Docs document.
//!
//! The model is deliberately small: it holds exactly what the Markdown
//! serializer can render (headings, paragraphs of styled runs, tables) plus
//! explicit variants for the block kinds it knowingly skips, so every
//! traversal matches exhaustively instead of probing for optional keys.
//!
//! Both wire shapes returned by the API (a legacy single `body` and the
//! `tabs` tree returned with `includeTabsContent=true`) are normalised by
//! [`wire`] into a non-empty list of [`Tab`]s. Downstream code never
//! special-cases the tab count.
//!
//! Instances are read-only once built; conversion derives new values from
//! them and never mutates a fetched tree.

pub mod wire;

use serde::Serialize;
use std::borrow::Cow;
use std::fmt;

/// A fetched document, always holding at least one tab.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub tabs: Vec<Tab>,
}

/// A named sub-document. Single-tab documents carry one implicit tab.
#[derive(Debug, Clone, PartialEq)]
pub struct Tab {
    /// `None` only for the implicit tab of a legacy single-body response.
    pub id: Option<String>,
    pub title: String,
    pub index: usize,
    pub body: Body,
    pub children: Vec<Tab>,
}

/// The content of one tab.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub content: Vec<Block>,
    /// Exclusive end offset of the last element; 1 for an empty body.
    pub end_index: usize,
}

/// A block-level structural element.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
    /// Section breaks carry layout only; the first element of every body is one.
    SectionBreak,
    /// Generated by Docs from the headings; never rendered.
    TableOfContents(Vec<Block>),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Paragraph {
    pub style: NamedStyle,
    pub runs: Vec<TextRun>,
}

impl Paragraph {
    pub fn new(style: NamedStyle, runs: Vec<TextRun>) -> Self {
        Self { style, runs }
    }

    /// Concatenation of every run's raw content, ignoring style.
    pub fn plain_text(&self) -> String {
        self.runs.iter().map(|r| r.content.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextRun {
    pub content: String,
    pub style: TextStyle,
}

impl TextRun {
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            style: TextStyle::default(),
        }
    }

    pub fn styled(content: impl Into<String>, style: TextStyle) -> Self {
        Self {
            content: content.into(),
            style,
        }
    }
}

/// Inline style flags; each one is independent of the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize)]
pub struct TextStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl TextStyle {
    pub const BOLD: TextStyle = TextStyle {
        bold: true,
        italic: false,
        underline: false,
    };
    pub const ITALIC: TextStyle = TextStyle {
        bold: false,
        italic: true,
        underline: false,
    };
    pub const UNDERLINE: TextStyle = TextStyle {
        bold: false,
        italic: false,
        underline: true,
    };

    pub fn is_plain(&self) -> bool {
        !(self.bold || self.italic || self.underline)
    }

    /// Union of two flag sets.
    pub fn with(self, other: TextStyle) -> TextStyle {
        TextStyle {
            bold: self.bold || other.bold,
            italic: self.italic || other.italic,
            underline: self.underline || other.underline,
        }
    }

    /// `self` with every flag set in `other` cleared.
    pub fn without(self, other: TextStyle) -> TextStyle {
        TextStyle {
            bold: self.bold && !other.bold,
            italic: self.italic && !other.italic,
            underline: self.underline && !other.underline,
        }
    }

    /// Whether every flag set in `other` is also set in `self`.
    pub fn contains(self, other: TextStyle) -> bool {
        (!other.bold || self.bold) && (!other.italic || self.italic) && (!other.underline || self.underline)
    }

    /// Whether `self` and `other` share no set flag.
    pub fn is_disjoint(self, other: TextStyle) -> bool {
        !(self.bold && other.bold || self.italic && other.italic || self.underline && other.underline)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

/// A cell owns its own block list; it may itself contain tables.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableCell {
    pub content: Vec<Block>,
}

impl TableCell {
    /// A cell holding a single unstyled paragraph.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Block::Paragraph(Paragraph::new(
                NamedStyle::NormalText,
                vec![TextRun::plain(text)],
            ))],
        }
    }
}

// ── Named styles ─────────────────────────────────────────────────────────

/// Heading level, always within 1..=6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HeadingLevel(u8);

impl HeadingLevel {
    pub const MAX: u8 = 6;

    /// Clamp any count of `#` characters into a valid level.
    pub fn clamped(n: usize) -> Self {
        Self(n.clamp(1, Self::MAX as usize) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

/// A paragraph's `namedStyleType`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NamedStyle {
    #[default]
    NormalText,
    Heading(HeadingLevel),
    /// Any other style name (`TITLE`, `SUBTITLE`, …), kept verbatim.
    Other(String),
}

impl NamedStyle {
    pub fn heading(level: usize) -> Self {
        NamedStyle::Heading(HeadingLevel::clamped(level))
    }

    /// Parse an API style name. Unknown names are preserved as [`NamedStyle::Other`].
    pub fn parse(name: &str) -> Self {
        if name == "NORMAL_TEXT" {
            return NamedStyle::NormalText;
        }
        if let Some(n) = name.strip_prefix("HEADING_") {
            if let Ok(level @ 1..=6) = n.parse::<usize>() {
                return NamedStyle::Heading(HeadingLevel::clamped(level));
            }
        }
        NamedStyle::Other(name.to_string())
    }

    pub fn api_name(&self) -> Cow<'_, str> {
        match self {
            NamedStyle::NormalText => Cow::Borrowed("NORMAL_TEXT"),
            NamedStyle::Heading(level) => Cow::Owned(format!("HEADING_{}", level.get())),
            NamedStyle::Other(name) => Cow::Borrowed(name),
        }
    }

    pub fn heading_level(&self) -> Option<HeadingLevel> {
        match self {
            NamedStyle::Heading(level) => Some(*level),
            _ => None,
        }
    }
}

impl fmt::Display for NamedStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.api_name())
    }
}

// ── Traversal helpers ────────────────────────────────────────────────────

impl Document {
    /// Every tab, depth-first in document order, with its nesting depth.
    pub fn all_tabs(&self) -> Vec<(usize, &Tab)> {
        fn walk<'a>(tabs: &'a [Tab], depth: usize, out: &mut Vec<(usize, &'a Tab)>) {
            for tab in tabs {
                out.push((depth, tab));
                walk(&tab.children, depth + 1, out);
            }
        }
        let mut out = Vec::new();
        walk(&self.tabs, 0, &mut out);
        out
    }

    /// Find a tab by id first, then by exact title, then by case-insensitive title.
    pub fn find_tab(&self, selector: &str) -> Option<&Tab> {
        let tabs = self.all_tabs();
        tabs.iter()
            .find(|(_, t)| t.id.as_deref() == Some(selector))
            .or_else(|| tabs.iter().find(|(_, t)| t.title == selector))
            .or_else(|| {
                tabs.iter()
                    .find(|(_, t)| t.title.eq_ignore_ascii_case(selector))
            })
            .map(|(_, t)| *t)
    }

    /// The first tab (the document body for single-tab documents).
    pub fn first_tab(&self) -> Option<&Tab> {
        self.tabs.first()
    }
}

impl Body {
    pub fn empty() -> Self {
        Self {
            content: Vec::new(),
            end_index: 1,
        }
    }

    /// Top-level paragraphs in order, skipping every other block kind.
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.content.iter().filter_map(|b| match b {
            Block::Paragraph(p) => Some(p),
            _ => None,
        })
    }
}
