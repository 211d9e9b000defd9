//! Error types for the chat client.

use thiserror::Error;

/// Failures talking to the hosted model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// The request never produced a response.
    #[error("model request failed: {0}")]
    Transport(String),

    /// The model API answered with a non-success status.
    #[error("model API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// No reply within the configured timeout.
    #[error("model call timed out after {0}s")]
    Timeout(u64),

    /// The reply could not be understood, or carried nothing.
    #[error("invalid model response: {0}")]
    InvalidResponse(String),
}

impl ModelError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }
}

/// Failures talking to the tool provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolClientError {
    /// The provider could not be reached.
    #[error("tool transport error: {0}")]
    Transport(String),

    /// The provider answered with a JSON-RPC error.
    #[error("tool provider error {code}: {message}")]
    Rpc { code: i32, message: String },

    /// The provider answered with something that is not a valid MCP reply.
    #[error("tool protocol error: {0}")]
    Protocol(String),
}

impl ToolClientError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }
}

/// Failures of a relay-loop turn or of its setup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RelayError {
    /// The model call failed; the turn is abandoned.
    #[error("model call failed: {0}")]
    ModelCall(#[from] ModelError),

    /// The model kept requesting tools past the round limit.
    #[error("model still requested tools after {rounds} tool rounds")]
    ToolLoopExceeded { rounds: usize },

    /// Blank user input.
    #[error("user input must not be empty")]
    EmptyInput,

    /// The tool provider does not serve a usable tool set.
    #[error("tool catalogue rejected: {0}")]
    Catalog(String),

    /// Listing the provider's tools failed.
    #[error(transparent)]
    Tools(#[from] ToolClientError),
}
