//! Tool Router - builds the rmcp ToolRouter from the registry.
//!
//! This module builds the ToolRouter for the STDIO transport by delegating
//! to the tool definitions themselves. Each tool knows how to create its own route.

use rmcp::handler::server::tool::ToolRouter;

use super::definitions::{ReadPageTool, TableOfContentsTool};
use super::registry::{ToolKind, ToolRegistry};

/// Build the tool router with every [`ToolKind`].
pub fn build_tool_router<S>(registry: &ToolRegistry) -> ToolRouter<S>
where
    S: Send + Sync + 'static,
{
    ToolKind::ALL
        .into_iter()
        .fold(ToolRouter::new(), |router, kind| {
            let source = registry.source();
            match kind {
                ToolKind::TableOfContents => {
                    router.with_route(TableOfContentsTool::create_route(source))
                }
                ToolKind::ReadPage => router.with_route(ReadPageTool::create_route(source)),
            }
        })
}
