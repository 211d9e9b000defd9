//! Gemini `generateContent` client.
//!
//! Maps the conversation onto Gemini contents: user turns become `user`
//! text parts, model turns become `model` parts (text and `functionCall`),
//! and the tool results of one round are grouped into a single `user`
//! content of `functionResponse` parts.

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::conversation::{ToolCallRequest, ToolCallResult, Turn};
use super::error::ModelError;
use super::model::{ModelClient, ModelReply, ModelRequest};
use super::tools::ToolDescriptor;
use crate::core::config::ChatConfig;

const API_KEY_HEADER: &str = "x-goog-api-key";
const MAX_ERROR_BODY: usize = 512;

/// Client for one Gemini model.
pub struct GeminiClient {
    http: reqwest::Client,
    api_base: String,
    model: String,
    api_key: String,
    temperature: f32,
    timeout_secs: u64,
}

impl GeminiClient {
    pub fn new(config: &ChatConfig, api_key: impl Into<String>) -> Result<Self, ModelError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("docs-chat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ModelError::transport(e.to_string()))?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: api_key.into(),
            temperature: config.temperature,
            timeout_secs: config.model_timeout_secs,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// `generateContent` URL for the configured model.
    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }

    async fn post(&self, body: &Value) -> Result<Value, ModelError> {
        let response = self
            .http
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| ModelError::transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ModelError::transport(e.to_string()))?;

        if !status.is_success() {
            let mut body = text;
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(ModelError::Status {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&text).map_err(|e| ModelError::invalid(e.to_string()))
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn generate(&self, request: ModelRequest<'_>) -> Result<ModelReply, ModelError> {
        let body = build_request_body(&request, self.temperature);
        debug!(
            "Sending {} contents to {}",
            body["contents"].as_array().map(Vec::len).unwrap_or(0),
            self.model
        );

        let reply = tokio::time::timeout(Duration::from_secs(self.timeout_secs), self.post(&body))
            .await
            .map_err(|_| ModelError::Timeout(self.timeout_secs))??;

        parse_reply(&reply)
    }
}

/// Build the `generateContent` request body.
pub fn build_request_body(request: &ModelRequest<'_>, temperature: f32) -> Value {
    let mut contents: Vec<Value> = Vec::new();
    let mut pending_results: Vec<Value> = Vec::new();

    for turn in request.conversation.model_visible() {
        if let Turn::ToolResult(result) = turn {
            pending_results.push(function_response_part(result));
            continue;
        }
        if !pending_results.is_empty() {
            push_content(&mut contents, "user", std::mem::take(&mut pending_results));
        }
        match turn {
            Turn::User { text } => {
                push_content(&mut contents, "user", vec![json!({ "text": text })]);
            }
            Turn::Model { text, tool_calls } => {
                let mut parts = Vec::new();
                if let Some(text) = text.as_deref().filter(|t| !t.is_empty()) {
                    parts.push(json!({ "text": text }));
                }
                parts.extend(tool_calls.iter().map(function_call_part));
                push_content(&mut contents, "model", parts);
            }
            Turn::ToolResult(_) | Turn::Error { .. } => {}
        }
    }
    if !pending_results.is_empty() {
        push_content(&mut contents, "user", pending_results);
    }

    let mut body = json!({
        "systemInstruction": { "parts": [{ "text": request.system_prompt }] },
        "contents": contents,
        "generationConfig": { "temperature": temperature },
    });

    if !request.tools.is_empty() {
        let declarations: Vec<Value> = request.tools.iter().map(function_declaration).collect();
        body["tools"] = json!([{ "functionDeclarations": declarations }]);
    }

    body
}

/// Append parts to the history, merging with the previous content when the
/// role repeats. Gemini expects user and model contents to alternate.
fn push_content(contents: &mut Vec<Value>, role: &str, parts: Vec<Value>) {
    if parts.is_empty() {
        return;
    }
    if let Some(last) = contents.last_mut().filter(|c| c["role"] == role) {
        if let Some(existing) = last["parts"].as_array_mut() {
            existing.extend(parts);
            return;
        }
    }
    contents.push(json!({ "role": role, "parts": parts }));
}

fn function_call_part(call: &ToolCallRequest) -> Value {
    let mut part = json!({
        "functionCall": {
            "id": call.id,
            "name": call.name,
            "args": call.arguments,
        }
    });
    if let Some(signature) = &call.thought_signature {
        part["thoughtSignature"] = Value::from(signature.as_str());
    }
    part
}

fn function_response_part(result: &ToolCallResult) -> Value {
    let response = if result.is_error {
        json!({ "error": result.content })
    } else {
        json!({ "result": result.content })
    };
    json!({
        "functionResponse": {
            "id": result.id,
            "name": result.name,
            "response": response,
        }
    })
}

fn function_declaration(tool: &ToolDescriptor) -> Value {
    let mut declaration = json!({
        "name": tool.name,
        "description": tool.description,
    });
    // Gemini rejects OBJECT parameters with no properties.
    let has_properties = tool
        .input_schema
        .get("properties")
        .and_then(Value::as_object)
        .is_some_and(|props| !props.is_empty());
    if has_properties {
        declaration["parameters"] = to_gemini_schema(&tool.input_schema);
    }
    declaration
}

/// Convert a JSON Schema into Gemini's schema dialect.
///
/// Keeps `type` (uppercased), `description`, `properties`, `required` and
/// `items`; everything else is dropped.
pub fn to_gemini_schema(schema: &Value) -> Value {
    let mut out = Map::new();

    let ty = match schema.get("type") {
        Some(Value::String(ty)) => Some(ty.as_str()),
        // `["string", "null"]` style nullable types
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|ty| *ty != "null"),
        _ => None,
    };
    if let Some(ty) = ty {
        out.insert("type".to_string(), Value::from(ty.to_uppercase()));
    }

    if let Some(description) = schema.get("description").and_then(Value::as_str) {
        out.insert("description".to_string(), Value::from(description));
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        let converted: Map<String, Value> = properties
            .iter()
            .map(|(name, prop)| (name.clone(), to_gemini_schema(prop)))
            .collect();
        out.insert("properties".to_string(), Value::Object(converted));
    }

    if let Some(required) = schema.get("required").filter(|r| r.is_array()) {
        out.insert("required".to_string(), required.clone());
    }

    if let Some(items) = schema.get("items") {
        out.insert("items".to_string(), to_gemini_schema(items));
    }

    Value::Object(out)
}

/// Read the first candidate of a `generateContent` response.
pub fn parse_reply(body: &Value) -> Result<ModelReply, ModelError> {
    let Some(candidate) = body
        .get("candidates")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
    else {
        let reason = body
            .pointer("/promptFeedback/blockReason")
            .and_then(Value::as_str)
            .unwrap_or("no candidates");
        return Err(ModelError::invalid(format!("model returned no candidates ({})", reason)));
    };

    let parts = candidate
        .pointer("/content/parts")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut text = String::new();
    let mut tool_calls = Vec::new();
    for part in parts {
        if let Some(t) = part.get("text").and_then(Value::as_str) {
            if part.get("thought").and_then(Value::as_bool) == Some(true) {
                continue;
            }
            text.push_str(t);
        } else if let Some(call) = part.get("functionCall") {
            let name = call
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| ModelError::invalid("functionCall without a name"))?;
            let arguments = match call.get("args") {
                Some(Value::Object(args)) => args.clone(),
                None | Some(Value::Null) => Map::new(),
                Some(other) => {
                    warn!("Ignoring non-object args for {}: {}", name, other);
                    Map::new()
                }
            };
            let id = call.get("id").and_then(Value::as_str).unwrap_or_default();
            let mut request = ToolCallRequest::new(id, name, arguments);
            // The signature sits next to `functionCall`, not inside it.
            if let Some(signature) = part.get("thoughtSignature").and_then(Value::as_str) {
                request = request.with_thought_signature(signature);
            }
            tool_calls.push(request);
        }
    }

    let reply = ModelReply {
        text: (!text.is_empty()).then_some(text),
        tool_calls,
    };
    if reply.is_empty() {
        let finish = candidate
            .get("finishReason")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        return Err(ModelError::invalid(format!(
            "model reply is empty (finishReason: {})",
            finish
        )));
    }
    Ok(reply)
}
