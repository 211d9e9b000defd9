//! Documentation tools module.
//!
//! - `table_of_contents`: list every page route in the documentation index
//! - `read_page`: read one page by route

pub mod common;
pub mod read_page;
pub mod table_of_contents;

pub use read_page::{ReadPageParams, ReadPageTool};
pub use table_of_contents::{TableOfContentsParams, TableOfContentsTool};
