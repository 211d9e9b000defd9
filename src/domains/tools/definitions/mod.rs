//! Tool definitions module.
//!
//! This module exports all available tool definitions.
//! Each tool is defined in its own file.

pub mod docs;

pub use docs::{ReadPageParams, ReadPageTool, TableOfContentsParams, TableOfContentsTool};
