//! The hosted-model seam of the relay loop.

use async_trait::async_trait;

use super::conversation::{Conversation, ToolCallRequest};
use super::error::ModelError;
use super::tools::ToolDescriptor;

/// Everything the model sees for one call.
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    pub system_prompt: &'a str,
    pub conversation: &'a Conversation,
    pub tools: &'a [ToolDescriptor],
}

/// One model reply: final text, tool-call requests, or both.
///
/// Requests may carry an empty id; the relay loop assigns one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
}

impl ModelReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_calls(tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            text: None,
            tool_calls,
        }
    }

    /// Neither text nor tool calls.
    pub fn is_empty(&self) -> bool {
        self.tool_calls.is_empty() && self.text.as_deref().is_none_or(|t| t.trim().is_empty())
    }
}

/// A hosted language model that can request tool calls.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, request: ModelRequest<'_>) -> Result<ModelReply, ModelError>;
}
