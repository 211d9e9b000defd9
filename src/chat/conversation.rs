//! Conversation history.
//!
//! A conversation is an ordered list of turns. Tool-result turns always
//! follow the model turn that requested them, one per request and in request
//! order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::tools::ToolOutput;

/// Who a turn belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Model,
    ToolResult,
}

/// A model's request to run one tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Correlation id; unique within its model turn.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
    /// Opaque provider token that must be echoed back with the call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought_signature: Option<String>,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
            thought_signature: None,
        }
    }

    pub fn with_thought_signature(mut self, signature: impl Into<String>) -> Self {
        self.thought_signature = Some(signature.into());
        self
    }
}

/// The outcome of one tool call, correlated to its request by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub id: String,
    pub name: String,
    pub content: String,
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured: Option<Value>,
}

impl ToolCallResult {
    /// Correlate a provider reply with its request.
    pub fn from_output(request: &ToolCallRequest, output: ToolOutput) -> Self {
        Self {
            id: request.id.clone(),
            name: request.name.clone(),
            content: output.content,
            is_error: output.is_error,
            structured: output.structured,
        }
    }

    /// An error result produced on the client side (timeout, transport
    /// failure, round limit).
    pub fn error(request: &ToolCallRequest, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            id: request.id.clone(),
            name: request.name.clone(),
            structured: Some(serde_json::json!({ "error": { "kind": "client", "message": message } })),
            content: message,
            is_error: true,
        }
    }
}

/// One entry in the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Turn {
    User {
        text: String,
    },
    Model {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCallRequest>,
    },
    ToolResult(ToolCallResult),
    /// A failed model call. Shown to the user, never sent to the model.
    Error {
        message: String,
    },
}

impl Turn {
    pub fn role(&self) -> Role {
        match self {
            Self::User { .. } => Role::User,
            Self::Model { .. } | Self::Error { .. } => Role::Model,
            Self::ToolResult(_) => Role::ToolResult,
        }
    }

    /// Whether this turn is part of the history the model sees.
    pub fn is_model_visible(&self) -> bool {
        !matches!(self, Self::Error { .. })
    }
}

/// Ordered turn history of one chat session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Turns sent to the model.
    pub fn model_visible(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter().filter(|turn| turn.is_model_visible())
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
