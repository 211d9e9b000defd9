//! Documentation-source error types.

use thiserror::Error;

/// Errors that can occur while fetching documentation from the upstream site.
///
/// None of these are fatal to a conversation: the tool layer turns them into
/// error tool results so the calling model can react to them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocsError {
    /// The upstream site could not be reached, timed out, or answered with a
    /// non-success status.
    #[error("Documentation site unavailable ({url}): {reason}")]
    UpstreamUnavailable { url: String, reason: String },

    /// The requested route does not exist upstream.
    #[error("Page not found: {route}")]
    NotFound { route: String },

    /// The upstream response was not in the expected shape.
    #[error("Unable to parse upstream response: {0}")]
    ParseError(String),
}

impl DocsError {
    /// Create a new "upstream unavailable" error.
    pub fn upstream(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a new "not found" error.
    pub fn not_found(route: impl Into<String>) -> Self {
        Self::NotFound {
            route: route.into(),
        }
    }

    /// Create a new "parse" error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Stable machine-readable tag, used in structured tool error content.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UpstreamUnavailable { .. } => "upstream_unavailable",
            Self::NotFound { .. } => "not_found",
            Self::ParseError(_) => "parse_error",
        }
    }
}
