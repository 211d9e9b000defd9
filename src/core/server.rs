//! MCP Server implementation and lifecycle management.
//!
//! This module contains the server handler that implements the MCP protocol
//! by delegating to the tool registry.
//!
//! ## Tool Architecture
//!
//! Tools are defined in `domains/tools/definitions/` with one file per tool.
//! The rmcp ToolRouter (STDIO) and the HTTP dispatch both come from the same
//! `ToolRegistry`, so the two transports always serve the same tool set.

use rmcp::{
    ErrorData as McpError, ServerHandler, handler::server::tool::ToolRouter, model::*,
    tool_handler,
};
use std::sync::Arc;
use tracing::info;

use super::config::Config;
use super::error::Result as CoreResult;
use crate::domains::docs::{DocsSource, HttpDocsSource};
use crate::domains::tools::{ToolError, ToolRegistry, build_tool_router};

/// Usage guidance advertised to clients.
pub const INSTRUCTIONS: &str = "Answers questions about Better Auth using its documentation. \
     Call 'get_table_of_contents' first to see the available pages, then call 'read_page' \
     with the full route from the table of contents (including the '/llms.txt/docs/' prefix). \
     Reuse the table of contents instead of fetching it repeatedly.";

/// The main MCP server handler.
///
/// This struct implements the `ServerHandler` trait from rmcp. It is cheap
/// to clone; every clone shares the registry and its documentation source.
#[derive(Clone)]
pub struct McpServer {
    /// Server configuration.
    config: Arc<Config>,

    /// Static tool set and dispatch.
    registry: ToolRegistry,

    /// Tool router for handling tool calls.
    tool_router: ToolRouter<Self>,
}

impl McpServer {
    /// Create a new MCP server that reads from the configured upstream site.
    pub fn new(config: Config) -> CoreResult<Self> {
        let source = Arc::new(HttpDocsSource::new(&config.docs)?);
        Self::with_source(config, source)
    }

    /// Create a server over an arbitrary documentation source.
    pub fn with_source(config: Config, source: Arc<dyn DocsSource>) -> CoreResult<Self> {
        let registry = ToolRegistry::new(source)?;

        Ok(Self {
            tool_router: build_tool_router::<Self>(&registry),
            config: Arc::new(config),
            registry,
        })
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.config.server.name
    }

    /// Get the server version.
    pub fn version(&self) -> &str {
        &self.config.server.version
    }

    /// Get the server configuration.
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Get the tool registry.
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    // ========================================================================
    // HTTP Transport Support Methods
    // ========================================================================

    /// List all available tools (for HTTP transport).
    pub fn list_tools(&self) -> Vec<serde_json::Value> {
        self.tool_router
            .list_all()
            .into_iter()
            .map(|t| {
                serde_json::json!({
                    "name": t.name,
                    "description": t.description,
                    "inputSchema": t.input_schema
                })
            })
            .collect()
    }

    /// Call a tool by name (for HTTP transport).
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> std::result::Result<serde_json::Value, ToolError> {
        info!("Calling tool: {}", name);
        let result = self.registry.call_tool(name, arguments).await?;
        serde_json::to_value(result).map_err(|e| ToolError::internal(e.to_string()))
    }
}

/// ServerHandler implementation with tool_handler macro for automatic tool routing.
#[tool_handler]
impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
