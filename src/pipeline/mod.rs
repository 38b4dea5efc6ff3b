//! Conversion stages between the document model and Markdown.
//!
//! Every stage here is pure and synchronous: no I/O, no shared state, and no
//! error paths. Network access lives in [`crate::gateway`].
//!
//! ## Data Flow
//!
//! ```text
//! download:  Document ──▶ serialize ──▶ Markdown (+ DataLoss notices)
//! upload:    Markdown ──▶ inline ──▶ edits ──▶ batchUpdate requests
//! ```
//!
//! 1. [`serialize`]: walk a tab body and emit headings, styled runs and pipe
//!    tables
//! 2. [`inline`]: split one line into styled spans by its `**`/`*`/`<u>`
//!    markers
//! 3. [`edits`]: fold the lines into positional edit operations with a
//!    running cursor

pub mod edits;
pub mod inline;
pub mod serialize;
