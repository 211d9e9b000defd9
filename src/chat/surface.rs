//! Plain-text rendering of a conversation for the terminal.
//!
//! Tool calls are collapsed to one line each: `[tool] name(args) → N chars`,
//! or `→ error: ...` for failed calls.

use std::collections::HashMap;

use super::conversation::{Conversation, ToolCallRequest, ToolCallResult, Turn};
use super::tools::ToolCatalog;

const ERROR_PREVIEW: usize = 120;

/// Render the whole history.
pub fn render_conversation(conversation: &Conversation) -> String {
    let mut requests: HashMap<&str, &ToolCallRequest> = HashMap::new();
    let mut lines = Vec::new();

    for turn in conversation.turns() {
        match turn {
            Turn::User { text } => lines.push(format!("you> {}", text)),
            Turn::Model { text, tool_calls } => {
                for call in tool_calls {
                    requests.insert(call.id.as_str(), call);
                }
                if let Some(text) = text.as_deref().filter(|t| !t.trim().is_empty()) {
                    lines.push(format!("assistant> {}", text));
                }
            }
            Turn::ToolResult(result) => {
                lines.push(render_tool_result(result, requests.get(result.id.as_str()).copied()));
            }
            Turn::Error { message } => lines.push(format!("error> {}", message)),
        }
    }

    lines.join("\n")
}

/// Lines for the turns appended while answering one question: model text
/// written alongside tool calls, then the collapsed tool lines. The final
/// answer and error turns are left to the caller.
pub fn render_turn_progress(turns: &[Turn]) -> Vec<String> {
    let mut requests: HashMap<&str, &ToolCallRequest> = HashMap::new();
    let mut lines = Vec::new();

    for turn in turns {
        match turn {
            Turn::Model { text, tool_calls } if !tool_calls.is_empty() => {
                for call in tool_calls {
                    requests.insert(call.id.as_str(), call);
                }
                if let Some(text) = text.as_deref().filter(|t| !t.trim().is_empty()) {
                    lines.push(format!("assistant> {}", text));
                }
            }
            Turn::ToolResult(result) => {
                lines.push(render_tool_result(result, requests.get(result.id.as_str()).copied()));
            }
            _ => {}
        }
    }

    lines
}

/// One collapsed tool line.
pub fn render_tool_result(result: &ToolCallResult, request: Option<&ToolCallRequest>) -> String {
    let args = request
        .map(|r| serde_json::Value::Object(r.arguments.clone()).to_string())
        .filter(|a| a != "{}")
        .unwrap_or_default();

    if result.is_error {
        format!(
            "  [tool] {}({}) → error: {}",
            result.name,
            args,
            preview(&result.content, ERROR_PREVIEW)
        )
    } else {
        format!(
            "  [tool] {}({}) → {} chars",
            result.name,
            args,
            result.content.chars().count()
        )
    }
}

/// Render the tool list for `/tools`.
pub fn render_tools(catalog: &ToolCatalog) -> String {
    catalog
        .tools()
        .iter()
        .map(|tool| {
            let summary = tool.description.lines().next().unwrap_or_default();
            format!("  • {} - {}", tool.name, summary)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn preview(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > max {
        let cut: String = line.chars().take(max).collect();
        format!("{}…", cut)
    } else {
        line.to_string()
    }
}
