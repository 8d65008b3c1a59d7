//! # nbedit
//!
//! Index-addressed editing operations for Jupyter notebooks, built on the
//! [`nbformat`] v4 document model.
//!
//! ## What it does
//!
//! - **Mutations** ([`ops`]): insert, bulk insert, replace source, delete,
//!   retype, duplicate, move, split, merge, metadata edits, output edits
//! - **Queries** ([`query`]): cell/metadata/output reads, count, outline,
//!   substring search with per-line matches
//! - **Info** ([`info`]): counts by cell type plus kernel and language
//! - **Requests** ([`request`]): named operations decoded from JSON and run
//!   through [`EditContext::apply`]
//!
//! Every operation validates its arguments against the current notebook
//! before changing anything. A refused operation returns an [`EditError`] and
//! leaves the notebook exactly as it was.
//!
//! The engine does no I/O. Hosts load a notebook, hand it to the engine along
//! with a request, and persist it again when [`Response::modified`] is set.
//!
//! ## Example
//!
//! ```rust
//! use nbedit::{EditContext, Request};
//! use nbformat::v4::CellType;
//!
//! let ctx = EditContext::default();
//! let mut notebook = ctx.create_notebook();
//!
//! ctx.apply(&mut notebook, Request::Insert {
//!     index: -1,
//!     cell_type: CellType::Markdown,
//!     source: "# Title".into(),
//! }).unwrap();
//!
//! let outline = ctx.apply(&mut notebook, Request::Outline).unwrap();
//! assert_eq!(outline.text, "[0] markdown: Title (1 lines)");
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod info;
pub mod ops;
pub mod query;
pub mod request;

pub use config::Config;
pub use context::EditContext;
pub use error::{EditError, ErrorKind, Result};
pub use info::{info, NotebookInfo};
pub use ops::NewCell;
pub use query::{LineMatch, OutlineEntry, SearchHit};
pub use request::{Request, Response};
