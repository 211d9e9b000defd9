//! Better Auth documentation over MCP.
//!
//! This crate serves a documentation site as two MCP tools and ships a chat
//! client that lets a hosted model call those tools while answering
//! questions.
//!
//! # Architecture
//!
//! - **core**: configuration, error handling, JSON-RPC types, the MCP server
//!   and its transports
//! - **domains**: business logic organized by bounded contexts
//!   - **docs**: upstream documentation source adapter
//!   - **tools**: `get_table_of_contents` and `read_page`
//! - **chat**: the model/tool relay loop and its collaborators
//!
//! # Example
//!
//! ```rust,no_run
//! use docs_mcp::{core::McpServer, core::Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let server = McpServer::new(config)?;
//!     // Start the server...
//!     Ok(())
//! }
//! ```

pub mod chat;
pub mod core;
pub mod domains;

// Re-export commonly used types for convenience
pub use core::{Config, Error, McpServer, Result};
