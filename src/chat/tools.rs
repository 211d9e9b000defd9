//! Tool access for the chat client.
//!
//! The relay loop only sees [`ToolInvoker`]. Two implementations exist:
//! [`LocalTools`] serves the tools in-process from an [`McpServer`], and
//! [`McpHttpClient`] talks JSON-RPC to a running server over HTTP.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use super::error::{RelayError, ToolClientError};
use crate::core::McpServer;
use crate::core::jsonrpc::{JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
use crate::domains::tools::ToolError;

/// Tool names the chat client cannot work without.
pub const REQUIRED_TOOLS: [&str; 2] = ["get_table_of_contents", "read_page"];

const SESSION_HEADER: &str = "mcp-session-id";

/// A tool as advertised by the provider's `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Value,
}

/// The provider's reply to one tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    /// Text content blocks, joined with newlines.
    pub content: String,
    pub is_error: bool,
    pub structured: Option<Value>,
}

impl ToolOutput {
    /// Read an MCP `CallToolResult` in its JSON form.
    pub fn from_value(value: &Value) -> Result<Self, ToolClientError> {
        let blocks = value
            .get("content")
            .and_then(Value::as_array)
            .ok_or_else(|| ToolClientError::protocol("tool result has no content array"))?;

        let content = blocks
            .iter()
            .filter_map(|block| block.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n");

        Ok(Self {
            content,
            is_error: value
                .get("isError")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            structured: value
                .get("structuredContent")
                .filter(|v| !v.is_null())
                .cloned(),
        })
    }
}

/// Validated set of tools offered to the model.
#[derive(Debug, Clone)]
pub struct ToolCatalog {
    tools: Vec<ToolDescriptor>,
}

impl ToolCatalog {
    /// Build a catalogue, rejecting duplicate names and a provider that is
    /// missing any of [`REQUIRED_TOOLS`].
    pub fn new(tools: Vec<ToolDescriptor>) -> Result<Self, RelayError> {
        for (i, tool) in tools.iter().enumerate() {
            if tools[..i].iter().any(|other| other.name == tool.name) {
                return Err(RelayError::Catalog(format!(
                    "tool '{}' is advertised twice",
                    tool.name
                )));
            }
        }

        let missing: Vec<&str> = REQUIRED_TOOLS
            .into_iter()
            .filter(|name| !tools.iter().any(|tool| tool.name == *name))
            .collect();
        if !missing.is_empty() {
            return Err(RelayError::Catalog(format!(
                "provider does not offer required tools: {}",
                missing.join(", ")
            )));
        }

        Ok(Self { tools })
    }

    /// List the provider's tools and build a catalogue from them.
    pub async fn discover(invoker: &dyn ToolInvoker) -> Result<Self, RelayError> {
        let tools = invoker.list_tools().await?;
        info!("Discovered {} tools", tools.len());
        Self::new(tools)
    }

    pub fn tools(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.iter().any(|tool| tool.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.name.as_str()).collect()
    }
}

/// Something that can list and call documentation tools.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolClientError>;

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolOutput, ToolClientError>;
}

/// Serves the tools from an in-process server.
#[derive(Clone)]
pub struct LocalTools {
    server: McpServer,
}

impl LocalTools {
    pub fn new(server: McpServer) -> Self {
        Self { server }
    }
}

#[async_trait]
impl ToolInvoker for LocalTools {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolClientError> {
        self.server
            .list_tools()
            .into_iter()
            .map(|tool| {
                serde_json::from_value(tool).map_err(|e| ToolClientError::protocol(e.to_string()))
            })
            .collect()
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolOutput, ToolClientError> {
        match self.server.call_tool(name, Some(arguments)).await {
            Ok(value) => ToolOutput::from_value(&value),
            Err(e @ ToolError::Internal(_)) => Err(ToolClientError::Rpc {
                code: -32603,
                message: e.to_string(),
            }),
            Err(e) => Err(ToolClientError::Rpc {
                code: -32602,
                message: e.to_string(),
            }),
        }
    }
}

/// JSON-RPC client for a documentation server reachable over HTTP.
///
/// Accepts plain JSON and single-event SSE replies. The `initialize`
/// handshake runs once, before the first request.
pub struct McpHttpClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
    session_id: Mutex<Option<String>>,
    initialized: OnceCell<()>,
}

impl McpHttpClient {
    /// Create a client for the JSON-RPC endpoint at `url`.
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Result<Self, ToolClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("docs-chat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ToolClientError::transport(e.to_string()))?;

        Ok(Self {
            http,
            url: url.into(),
            next_id: AtomicU64::new(1),
            session_id: Mutex::new(None),
            initialized: OnceCell::new(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn ensure_initialized(&self) -> Result<(), ToolClientError> {
        self.initialized
            .get_or_try_init(|| async {
                let params = serde_json::json!({
                    "protocolVersion": MCP_PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": "docs-chat",
                        "version": env!("CARGO_PKG_VERSION")
                    }
                });
                let result = self
                    .send(JsonRpcRequest::new(self.id(), "initialize", Some(params)))
                    .await?;
                let server_name = result
                    .as_ref()
                    .and_then(|r| r.pointer("/serverInfo/name"))
                    .and_then(Value::as_str)
                    .unwrap_or("unknown server");
                let protocol = result
                    .as_ref()
                    .and_then(|r| r.get("protocolVersion"))
                    .and_then(Value::as_str)
                    .unwrap_or("?");
                info!("Connected to {} (protocol {})", server_name, protocol);
                self.send(JsonRpcRequest::notification("notifications/initialized"))
                    .await?;
                Ok::<(), ToolClientError>(())
            })
            .await
            .map(|_| ())
    }

    fn id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, ToolClientError> {
        self.ensure_initialized().await?;
        self.send(JsonRpcRequest::new(self.id(), method, params))
            .await?
            .ok_or_else(|| ToolClientError::protocol(format!("empty reply to {}", method)))
    }

    /// Post one message. Notifications yield `Ok(None)`.
    #[instrument(skip(self, message), fields(method = %message.method))]
    async fn send(&self, message: JsonRpcRequest) -> Result<Option<Value>, ToolClientError> {
        let mut builder = self
            .http
            .post(&self.url)
            .header(ACCEPT, "application/json, text/event-stream")
            .json(&message);
        if let Some(session) = self.session() {
            builder = builder.header(SESSION_HEADER, session);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ToolClientError::transport(e.to_string()))?;

        if let Some(session) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            self.set_session(session);
        }

        let status = response.status();
        if !status.is_success() {
            return Err(ToolClientError::transport(format!(
                "{} returned HTTP {}",
                self.url, status
            )));
        }

        if message.id.is_none() {
            return Ok(None);
        }

        let is_sse = response
            .headers()
            .get(CONTENT_TYPE)
            .map(|ct| ct.as_bytes().starts_with(b"text/event-stream"))
            .unwrap_or(false);
        let body = response
            .text()
            .await
            .map_err(|e| ToolClientError::transport(e.to_string()))?;
        debug!("Received {} bytes (sse: {})", body.len(), is_sse);

        let reply = parse_reply_body(&body, is_sse)?;
        if let Some(error) = reply.error {
            return Err(ToolClientError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        reply
            .result
            .map(Some)
            .ok_or_else(|| ToolClientError::protocol("reply has neither result nor error"))
    }

    fn session(&self) -> Option<HeaderValue> {
        let guard = self.session_id.lock().ok()?;
        guard.as_deref().and_then(|s| HeaderValue::from_str(s).ok())
    }

    fn set_session(&self, session: &str) {
        match self.session_id.lock() {
            Ok(mut guard) => *guard = Some(session.to_string()),
            Err(_) => warn!("Session id lock poisoned; ignoring new session id"),
        }
    }
}

#[async_trait]
impl ToolInvoker for McpHttpClient {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolClientError> {
        let result = self.request("tools/list", None).await?;
        let tools = result
            .get("tools")
            .cloned()
            .ok_or_else(|| ToolClientError::protocol("tools/list reply has no tools"))?;
        serde_json::from_value(tools).map_err(|e| ToolClientError::protocol(e.to_string()))
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolOutput, ToolClientError> {
        let params = serde_json::json!({ "name": name, "arguments": arguments });
        let result = self.request("tools/call", Some(params)).await?;
        ToolOutput::from_value(&result)
    }
}

/// Decode a JSON-RPC reply carried either as a JSON body or as SSE, where
/// the first `data:` line holds the message.
pub fn parse_reply_body(body: &str, is_sse: bool) -> Result<JsonRpcResponse, ToolClientError> {
    let trimmed = body.trim_start();
    let payload = if is_sse || trimmed.starts_with("data:") || trimmed.starts_with("event:") {
        body.lines()
            .find_map(|line| line.strip_prefix("data:"))
            .map(str::trim)
            .ok_or_else(|| ToolClientError::protocol("event stream carried no data line"))?
    } else {
        body
    };

    serde_json::from_str(payload).map_err(|e| ToolClientError::protocol(e.to_string()))
}
