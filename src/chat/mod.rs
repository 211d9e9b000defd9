//! Chat client: a hosted model answers questions by calling the
//! documentation tools.
//!
//! - **conversation**: turns, tool-call requests and results
//! - **tools**: tool catalogue and the in-process / HTTP tool invokers
//! - **model**: the model client seam
//! - **gemini**: Gemini `generateContent` client
//! - **relay**: the model/tool relay loop state machine
//! - **surface**: terminal rendering of a conversation

pub mod conversation;
pub mod error;
pub mod gemini;
pub mod model;
pub mod relay;
pub mod surface;
pub mod tools;

pub use conversation::{Conversation, Role, ToolCallRequest, ToolCallResult, Turn};
pub use error::{ModelError, RelayError, ToolClientError};
pub use gemini::GeminiClient;
pub use model::{ModelClient, ModelReply, ModelRequest};
pub use relay::{ChatSession, RelayLoop, RelayOutcome, RelayState, SYSTEM_PROMPT};
pub use tools::{LocalTools, McpHttpClient, ToolCatalog, ToolDescriptor, ToolInvoker, ToolOutput};
