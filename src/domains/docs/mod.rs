//! Documentation domain module.
//!
//! Read-only access to the upstream documentation site: the markdown index
//! (table of contents) and individual pages addressed by route.
//!
//! ## Architecture
//!
//! - `model.rs` - Routes, pages and the table of contents parser
//! - `source.rs` - The `DocsSource` trait and its HTTP implementation
//! - `error.rs` - Fetch and parse failures

mod error;
mod model;
mod source;

#[cfg(test)]
pub(crate) mod testing;

pub use error::DocsError;
pub use model::{DocumentationPage, Route, TableOfContents, TocEntry};
pub use source::{DocsSource, HttpDocsSource};
