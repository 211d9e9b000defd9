//! Tool Registry - central registration and dispatch for all tools.
//!
//! Tool names map to handlers through the closed [`ToolKind`] enum; there is
//! no name-keyed handler table. The registry checks the set at construction
//! so a bad tool set fails at startup rather than on the first call.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use rmcp::model::{CallToolResult, JsonObject, Tool};

use super::definitions::{ReadPageTool, TableOfContentsTool};
use super::error::ToolError;
use crate::domains::docs::DocsSource;

/// The closed set of tools served by this provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    TableOfContents,
    ReadPage,
}

impl ToolKind {
    /// Every tool, in advertisement order.
    pub const ALL: [ToolKind; 2] = [ToolKind::TableOfContents, ToolKind::ReadPage];

    /// Name as registered in MCP.
    pub fn name(self) -> &'static str {
        match self {
            Self::TableOfContents => TableOfContentsTool::NAME,
            Self::ReadPage => ReadPageTool::NAME,
        }
    }

    /// Resolve a tool name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Tool metadata.
    pub fn to_tool(self) -> Tool {
        match self {
            Self::TableOfContents => TableOfContentsTool::to_tool(),
            Self::ReadPage => ReadPageTool::to_tool(),
        }
    }
}

/// Tool registry - owns the documentation source and dispatches calls.
///
/// Cheap to clone; clones share the source.
#[derive(Clone)]
pub struct ToolRegistry {
    source: Arc<dyn DocsSource>,
    tools: Vec<Tool>,
}

impl ToolRegistry {
    /// Create a new tool registry, validating the tool set.
    pub fn new(source: Arc<dyn DocsSource>) -> Result<Self, ToolError> {
        let tools = Self::get_all_tools();
        validate_tools(&tools)?;

        info!("Registered {} tools: {:?}", tools.len(), ToolKind::ALL);
        Ok(Self { source, tools })
    }

    /// Get all tool names.
    pub fn tool_names(&self) -> Vec<&'static str> {
        ToolKind::ALL.iter().map(|kind| kind.name()).collect()
    }

    /// Get all tools as Tool models (metadata).
    ///
    /// This is the single source of truth for all available tools; both the
    /// rmcp router and the HTTP transport advertise this list.
    pub fn get_all_tools() -> Vec<Tool> {
        ToolKind::ALL.iter().map(|kind| kind.to_tool()).collect()
    }

    /// Tool metadata, in advertisement order.
    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    /// The documentation source backing the tools.
    pub fn source(&self) -> Arc<dyn DocsSource> {
        self.source.clone()
    }

    /// Dispatch a tool call.
    ///
    /// Documentation failures come back as `Ok` error results; `Err` is
    /// reserved for unknown tools and invalid arguments.
    #[instrument(skip(self, arguments))]
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult, ToolError> {
        let Some(kind) = ToolKind::from_name(name) else {
            warn!("Unknown tool requested: {}", name);
            return Err(ToolError::unknown_tool(name));
        };

        match kind {
            ToolKind::TableOfContents => {
                TableOfContentsTool::call(arguments, self.source.as_ref()).await
            }
            ToolKind::ReadPage => ReadPageTool::call(arguments, self.source.as_ref()).await,
        }
    }
}

/// Check an advertised tool set: every name routes to a [`ToolKind`], no
/// name repeats, every kind is advertised and takes an object argument.
pub fn validate_tools(tools: &[Tool]) -> Result<(), ToolError> {
    let mut seen = HashSet::new();
    for tool in tools {
        let Some(kind) = ToolKind::from_name(&tool.name) else {
            return Err(ToolError::internal(format!(
                "advertised tool '{}' has no handler",
                tool.name
            )));
        };
        if !seen.insert(kind) {
            return Err(ToolError::DuplicateName(tool.name.to_string()));
        }
        if tool.input_schema.get("type").and_then(|ty| ty.as_str()) != Some("object") {
            return Err(ToolError::internal(format!(
                "tool '{}' input schema is not an object",
                tool.name
            )));
        }
    }

    if let Some(missing) = ToolKind::ALL.iter().find(|kind| !seen.contains(*kind)) {
        return Err(ToolError::internal(format!(
            "tool '{}' is not advertised",
            missing.name()
        )));
    }
    Ok(())
}
