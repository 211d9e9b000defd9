//! Domains module containing business logic organized by bounded contexts.
//!
//! - **docs**: fetches the index and pages from the upstream site
//! - **tools**: exposes the docs domain as MCP tools

pub mod docs;
pub mod tools;
