//! Tools domain module.
//!
//! This module handles all tool-related functionality for the documentation
//! server. Tools are the operations MCP clients (and the models behind them)
//! call to browse the documentation.
//!
//! ## Architecture
//!
//! - `definitions/` - Individual tool implementations (one file per tool)
//! - `router.rs` - ToolRouter builder for the STDIO transport
//! - `registry.rs` - Static tool set and dispatch (HTTP transport, in-process clients)
//! - `error.rs` - Tool-specific error types
//!
//! ## Adding a New Tool
//!
//! 1. Create a new file in `definitions/docs/`
//! 2. Define params, `execute()`, `call()`, `to_tool()` and `create_route()`
//! 3. Add a `ToolKind` variant in `registry.rs`
//! 4. Match the variant in `router.rs`

pub mod definitions;
mod error;
mod registry;
pub mod router;

pub use error::ToolError;
pub use registry::{ToolKind, ToolRegistry};
pub use router::build_tool_router;
