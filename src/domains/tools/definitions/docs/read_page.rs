//! Read page tool.
//!
//! Fetches one documentation page by route and returns it verbatim.

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
use crate::domains::docs::DocsSource;
use crate::domains::tools::ToolError;

/// Parameters for reading a page.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ReadPageParams {
    /// Route of the page, exactly as listed in the table of contents.
    #[serde(alias = "page_route")]
    #[schemars(
        description = "Route of the page to read, as listed in the table of contents (e.g. \"/llms.txt/docs/basic-usage.md\")"
    )]
    pub route: String,
}

/// Structured output for a page read.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ReadPageResult {
    pub route: String,
    pub length: usize,
}

/// Read page tool implementation.
#[derive(Debug, Clone)]
pub struct ReadPageTool;

impl ReadPageTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "read_page";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Read a page from the Better Auth documentation website. \
         Use the full route from the table of contents, including the '/llms.txt/docs/' prefix.";

    /// Execute the tool logic.
    pub async fn execute(params: &ReadPageParams, source: &dyn DocsSource) -> CallToolResult {
        info!("Reading page: {}", params.route);

        match source.read_page(&params.route).await {
            Ok(page) => {
                let data = ReadPageResult {
                    route: page.route.to_string(),
                    length: page.content.len(),
                };
                structured_result(page.content, &data)
            }
            Err(e) => error_result(&e),
        }
    }

    /// Validate arguments and execute.
    pub async fn call(
        arguments: Option<JsonObject>,
        source: &dyn DocsSource,
    ) -> Result<CallToolResult, ToolError> {
        let params: ReadPageParams = parse_params(arguments)?;
        Ok(Self::execute(&params, source).await)
    }

    /// Create a Tool model for this tool (metadata).
    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<ReadPageParams>(),
            annotations: None,
            output_schema: None,
            icons: None,
            meta: None,
            title: Some("Read page".to_string()),
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
    use crate::domains::docs::testing::StaticDocsSource;
    use rmcp::model::RawContent;

    fn text_of(result: &CallToolResult) -> String {
        match &result.content[0].raw {
            RawContent::Text(text) => text.text.clone(),
            _ => panic!("Expected text content"),
        }
    }

    #[test]
    fn test_params_accept_page_route_alias() {
        let params: ReadPageParams =
            serde_json::from_str(r#"{"page_route": "/docs/session"}"#).unwrap();
        assert_eq!(params.route, "/docs/session");
    }

    #[tokio::test]
    async fn test_reads_page_verbatim() {
        let source = StaticDocsSource::new();
        let params = ReadPageParams {
            route: "/docs/session".to_string(),
        };
        let result = ReadPageTool::execute(&params, &source).await;

        assert_eq!(result.is_error, Some(false));
        assert!(text_of(&result).contains("session.expiresIn"));
        assert_eq!(result.structured_content.unwrap()["route"], "/docs/session");
    }

    #[tokio::test]
    async fn test_missing_page_is_not_found_result() {
        let source = StaticDocsSource::new();
        let params = ReadPageParams {
            route: "/docs/does-not-exist".to_string(),
        };
        let result = ReadPageTool::execute(&params, &source).await;

        assert_eq!(result.is_error, Some(true));
        assert!(text_of(&result).contains("/docs/does-not-exist"));
        assert_eq!(
            result.structured_content.unwrap()["error"]["kind"],
            "not_found"
        );
    }

    #[tokio::test]
    async fn test_call_without_route_is_invalid_arguments() {
        let source = StaticDocsSource::new();
        let err = ReadPageTool::call(None, &source).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
