//! Table of contents tool.
//!
//! Returns the documentation index so the model can discover page routes.

use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, JsonObject, Tool},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::common::{error_result, parse_params, structured_result};
use crate::domains::docs::{DocsSource, TocEntry};
use crate::domains::tools::ToolError;

/// Parameters for the table of contents tool (none).
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct TableOfContentsParams {}

/// Structured output: the parsed index entries.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct TableOfContentsResult {
    pub entries: Vec<TocEntry>,
    pub total_count: usize,
}

/// Table of contents tool implementation.
#[derive(Debug, Clone)]
pub struct TableOfContentsTool;

impl TableOfContentsTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "get_table_of_contents";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Fetch the Table of Contents (including routes to pages) from the Better Auth documentation website. \
         Call this once at the start of a conversation and reuse the routes it lists with read_page.";

    /// Execute the tool logic.
    pub async fn execute(source: &dyn DocsSource) -> CallToolResult {
        info!("Fetching table of contents");

        match source.list_contents().await {
            Ok(toc) => {
                let data = TableOfContentsResult {
                    total_count: toc.len(),
                    entries: toc.entries,
                };
                // The raw index is what the model reads; entries are for clients.
                structured_result(toc.raw, &data)
            }
            Err(e) => error_result(&e),
        }
    }

    /// Validate arguments and execute.
    pub async fn call(
        arguments: Option<JsonObject>,
        source: &dyn DocsSource,
    ) -> Result<CallToolResult, ToolError> {
        let _params: TableOfContentsParams = parse_params(arguments)?;
        Ok(Self::execute(source).await)
    }

    /// Create a Tool model for this tool (metadata).
    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<TableOfContentsParams>(),
            annotations: None,
            output_schema: None,
            icons: None,
            meta: None,
            title: Some("Table of contents".to_string()),
        }
    }

    /// Create a ToolRoute for the rmcp router (STDIO transport).
    pub fn create_route<S>(source: Arc<dyn DocsSource>) -> ToolRoute<S>
    where
        S: Send + Sync + 'static,
    {
        ToolRoute::new_dyn(Self::to_tool(), move |ctx: ToolCallContext<'_, S>| {
            let args = ctx.arguments.clone();
            let source = source.clone();
            async move {
                Self::call(args, source.as_ref())
                    .await
                    .map_err(|e| McpError::invalid_params(e.to_string(), None))
            }
            .boxed()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::docs::testing::{INDEX, StaticDocsSource};
    use rmcp::model::RawContent;

    #[tokio::test]
    async fn test_returns_raw_index_and_entries() {
        let source = StaticDocsSource::new();
        let result = TableOfContentsTool::execute(&source).await;

        assert_eq!(result.is_error, Some(false));
        if let RawContent::Text(text) = &result.content[0].raw {
            assert_eq!(text.text, INDEX);
        } else {
            panic!("Expected text content");
        }

        let structured = result.structured_content.unwrap();
        assert_eq!(structured["total_count"], 2);
        assert_eq!(structured["entries"][0]["route"], "/docs/session");
    }

    #[tokio::test]
    async fn test_twice_returns_equal_content() {
        let source = StaticDocsSource::new();
        let first = TableOfContentsTool::execute(&source).await;
        let second = TableOfContentsTool::execute(&source).await;
        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn test_upstream_failure_is_error_result() {
        let source = StaticDocsSource::unavailable();
        let result = TableOfContentsTool::execute(&source).await;
        assert_eq!(result.is_error, Some(true));
        assert_eq!(
            result.structured_content.unwrap()["error"]["kind"],
            "upstream_unavailable"
        );
    }

    #[test]
    fn test_tool_metadata() {
        let tool = TableOfContentsTool::to_tool();
        assert_eq!(tool.name, "get_table_of_contents");
        assert!(tool.description.is_some());
    }
}
