//! Common utilities shared across documentation tools.
//!
//! Response formatting and argument parsing helpers.

use rmcp::model::{CallToolResult, Content, JsonObject};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::domains::docs::DocsError;
use crate::domains::tools::ToolError;

/// Deserialize tool arguments into a parameters struct.
///
/// Missing arguments are treated as an empty object so that tools without
/// parameters accept `null`.
pub fn parse_params<P: DeserializeOwned>(arguments: Option<JsonObject>) -> Result<P, ToolError> {
    serde_json::from_value(serde_json::Value::Object(arguments.unwrap_or_default()))
        .map_err(|e| ToolError::invalid_arguments(e.to_string()))
}

/// Turn a documentation failure into an error tool result.
///
/// The failure is reported as content, not as a protocol fault, so the
/// calling model can read it and pick another route.
pub fn error_result(err: &DocsError) -> CallToolResult {
    warn!("{}", err);
    let mut result = CallToolResult::error(vec![Content::text(err.to_string())]);
    result.structured_content = Some(serde_json::json!({
        "error": {
            "kind": err.kind(),
            "message": err.to_string(),
        }
    }));
    result
}

/// Create a success result carrying text plus structured data.
pub fn structured_result<T: Serialize>(text: String, data: &T) -> CallToolResult {
    let mut result = CallToolResult::success(vec![Content::text(text)]);
    match serde_json::to_value(data) {
        Ok(value) => result.structured_content = Some(value),
        Err(e) => warn!("Dropping structured content: {}", e),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::RawContent;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Params {
        route: String,
    }

    #[test]
    fn test_parse_params_missing_field() {
        let err = parse_params::<Params>(None).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn test_parse_params_ok() {
        let args = serde_json::json!({ "route": "/docs/a" });
        let params: Params = parse_params(args.as_object().cloned()).unwrap();
        assert_eq!(params.route, "/docs/a");
    }

    #[test]
    fn test_error_result_is_structured() {
        let result = error_result(&DocsError::not_found("/docs/missing"));
        assert_eq!(result.is_error, Some(true));

        let structured = result.structured_content.unwrap();
        assert_eq!(structured["error"]["kind"], "not_found");

        if let RawContent::Text(text) = &result.content[0].raw {
            assert!(text.text.contains("/docs/missing"));
        } else {
            panic!("Expected text content");
        }
    }
}
