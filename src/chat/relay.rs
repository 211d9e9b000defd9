//! The model/tool relay loop.
//!
//! One user turn runs as a small state machine over a [`ChatSession`]:
//!
//! ```text
//! AwaitingUser -> ModelPending -> Done
//!                      |   ^
//!                      v   |
//!                  ToolPending
//! ```
//!
//! Every tool-call request gets exactly one result turn, appended in request
//! order, before the model is called again.

use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

use super::conversation::{Conversation, ToolCallRequest, ToolCallResult, Turn};
use super::error::{ModelError, RelayError};
use super::model::{ModelClient, ModelReply, ModelRequest};
use super::tools::{ToolCatalog, ToolInvoker};
use crate::core::config::ChatConfig;

/// Default system instruction for the documentation assistant.
pub const SYSTEM_PROMPT: &str = "\
You are a helpful assistant that answers questions about Better Auth using the provided tools.

Tool usage:
1. Call 'get_table_of_contents' first to see the available documentation.
2. To answer a question about a topic, call 'read_page' with the full route exactly as it \
appears in the table of contents (for example '/llms.txt/docs/plugins/email-otp.md').
3. Do not call 'get_table_of_contents' more than once per conversation; reuse what it returned.
4. If a tool returns an error, read it and try a different route or explain what is missing.";

/// Result text for requests left over when the round limit is hit.
pub const ROUND_LIMIT_MESSAGE: &str = "tool round limit reached";

const INTERRUPTED_MESSAGE: &str = "tool call interrupted";

/// Where a session is in the relay loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    AwaitingUser,
    ModelPending,
    ToolPending,
    Done,
}

/// Conversation plus loop state for one chat.
#[derive(Debug, Clone)]
pub struct ChatSession {
    conversation: Conversation,
    state: RelayState,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            conversation: Conversation::new(),
            state: RelayState::AwaitingUser,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Drop the history and start over.
    pub fn reset(&mut self) {
        self.conversation.clear();
        self.state = RelayState::AwaitingUser;
    }

    /// Close a round left open by a cancelled turn, so every request still
    /// has a result before the next model call.
    fn close_interrupted_round(&mut self) {
        if matches!(self.state, RelayState::AwaitingUser | RelayState::Done) {
            return;
        }

        let turns = self.conversation.turns();
        let answered: HashSet<&str> = turns
            .iter()
            .rev()
            .take_while(|turn| matches!(turn, Turn::ToolResult(_)))
            .filter_map(|turn| match turn {
                Turn::ToolResult(result) => Some(result.id.as_str()),
                _ => None,
            })
            .collect();
        let open: Vec<ToolCallRequest> = turns
            .iter()
            .rev()
            .find_map(|turn| match turn {
                Turn::Model { tool_calls, .. } => Some(tool_calls),
                _ => None,
            })
            .map(|calls| {
                calls
                    .iter()
                    .filter(|call| !answered.contains(call.id.as_str()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if self.state == RelayState::ToolPending {
            warn!("Closing {} unanswered tool calls from an interrupted turn", open.len());
            for call in &open {
                self.conversation
                    .push(Turn::ToolResult(ToolCallResult::error(call, INTERRUPTED_MESSAGE)));
            }
        }
        self.state = RelayState::AwaitingUser;
    }
}

/// Outcome of a completed turn.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayOutcome {
    pub answer: String,
    pub tool_rounds: usize,
}

/// Drives model calls and tool calls for chat sessions.
///
/// Holds only shared handles; one loop can serve many sessions.
#[derive(Clone)]
pub struct RelayLoop {
    model: Arc<dyn ModelClient>,
    tools: Arc<dyn ToolInvoker>,
    catalog: ToolCatalog,
    system_prompt: String,
    max_tool_rounds: usize,
    tool_timeout: Duration,
}

impl RelayLoop {
    pub fn new(model: Arc<dyn ModelClient>, tools: Arc<dyn ToolInvoker>, catalog: ToolCatalog) -> Self {
        let defaults = ChatConfig::default();
        Self {
            model,
            tools,
            catalog,
            system_prompt: SYSTEM_PROMPT.to_string(),
            max_tool_rounds: defaults.max_tool_rounds,
            tool_timeout: Duration::from_secs(defaults.tool_timeout_secs),
        }
    }

    /// Build a loop with limits taken from the chat configuration.
    pub fn from_config(
        model: Arc<dyn ModelClient>,
        tools: Arc<dyn ToolInvoker>,
        catalog: ToolCatalog,
        config: &ChatConfig,
    ) -> Self {
        Self::new(model, tools, catalog)
            .with_max_tool_rounds(config.max_tool_rounds)
            .with_tool_timeout(Duration::from_secs(config.tool_timeout_secs))
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    pub fn max_tool_rounds(&self) -> usize {
        self.max_tool_rounds
    }

    /// Answer one user message.
    ///
    /// On a model failure an error turn is appended and the session returns
    /// to `AwaitingUser`. When the model keeps requesting tools past the
    /// round limit, the outstanding requests get error results and the turn
    /// fails with [`RelayError::ToolLoopExceeded`]. Either way the
    /// conversation stays usable for the next turn.
    #[instrument(skip_all, fields(turns = session.conversation.len()))]
    pub async fn run_turn(
        &self,
        session: &mut ChatSession,
        input: &str,
    ) -> Result<RelayOutcome, RelayError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(RelayError::EmptyInput);
        }

        session.close_interrupted_round();
        session.conversation.push(Turn::User {
            text: input.to_string(),
        });
        session.state = RelayState::ModelPending;

        let mut rounds = 0;
        loop {
            let reply = match self.call_model(&session.conversation).await {
                Ok(reply) => reply,
                Err(e) => {
                    warn!("Model call failed: {}", e);
                    session.conversation.push(Turn::Error {
                        message: e.to_string(),
                    });
                    session.state = RelayState::AwaitingUser;
                    return Err(e.into());
                }
            };

            if reply.tool_calls.is_empty() {
                let answer = reply.text.unwrap_or_default();
                session.conversation.push(Turn::Model {
                    text: Some(answer.clone()),
                    tool_calls: Vec::new(),
                });
                session.state = RelayState::Done;
                info!("Turn finished after {} tool rounds", rounds);
                return Ok(RelayOutcome {
                    answer,
                    tool_rounds: rounds,
                });
            }

            let calls = assign_call_ids(reply.tool_calls, rounds + 1);
            session.conversation.push(Turn::Model {
                text: reply.text,
                tool_calls: calls.clone(),
            });
            session.state = RelayState::ToolPending;

            if rounds >= self.max_tool_rounds {
                warn!(
                    "Model requested {} more tools after {} rounds; giving up",
                    calls.len(),
                    rounds
                );
                for call in &calls {
                    session
                        .conversation
                        .push(Turn::ToolResult(ToolCallResult::error(call, ROUND_LIMIT_MESSAGE)));
                }
                session.state = RelayState::AwaitingUser;
                return Err(RelayError::ToolLoopExceeded { rounds });
            }

            rounds += 1;
            for result in self.execute_round(&calls).await {
                session.conversation.push(Turn::ToolResult(result));
            }
            session.state = RelayState::ModelPending;
        }
    }

    async fn call_model(&self, conversation: &Conversation) -> Result<ModelReply, ModelError> {
        let reply = self
            .model
            .generate(ModelRequest {
                system_prompt: &self.system_prompt,
                conversation,
                tools: self.catalog.tools(),
            })
            .await?;
        if reply.is_empty() {
            return Err(ModelError::invalid("model reply is empty"));
        }
        Ok(reply)
    }

    /// Run every request of one round concurrently; results come back in
    /// request order.
    async fn execute_round(&self, calls: &[ToolCallRequest]) -> Vec<ToolCallResult> {
        info!(
            "Executing {} tool calls: {:?}",
            calls.len(),
            calls.iter().map(|c| c.name.as_str()).collect::<Vec<_>>()
        );

        let mut pending: FuturesUnordered<_> =
            calls.iter().map(|call| self.execute_call(call)).collect();

        let mut by_id = HashMap::with_capacity(calls.len());
        while let Some(result) = pending.next().await {
            by_id.insert(result.id.clone(), result);
        }

        calls
            .iter()
            .map(|call| {
                by_id
                    .remove(&call.id)
                    .unwrap_or_else(|| ToolCallResult::error(call, "tool call produced no result"))
            })
            .collect()
    }

    async fn execute_call(&self, call: &ToolCallRequest) -> ToolCallResult {
        if !self.catalog.contains(&call.name) {
            warn!("Model requested unknown tool '{}'", call.name);
            return ToolCallResult::error(
                call,
                format!(
                    "unknown tool '{}'; available tools: {}",
                    call.name,
                    self.catalog.names().join(", ")
                ),
            );
        }

        let invocation = self.tools.call_tool(&call.name, call.arguments.clone());
        match tokio::time::timeout(self.tool_timeout, invocation).await {
            Ok(Ok(output)) => ToolCallResult::from_output(call, output),
            Ok(Err(e)) => {
                warn!("Tool '{}' failed: {}", call.name, e);
                ToolCallResult::error(call, e.to_string())
            }
            Err(_) => {
                warn!("Tool '{}' timed out", call.name);
                ToolCallResult::error(
                    call,
                    format!("tool call timed out after {}s", self.tool_timeout.as_secs()),
                )
            }
        }
    }
}

/// Give every request a unique id: `call_<round>_<index>` when the model
/// supplied none or reused one.
fn assign_call_ids(calls: Vec<ToolCallRequest>, round: usize) -> Vec<ToolCallRequest> {
    let mut seen = HashSet::new();
    calls
        .into_iter()
        .enumerate()
        .map(|(index, mut call)| {
            if call.id.is_empty() || seen.contains(&call.id) {
                call.id = format!("call_{}_{}", round, index);
            }
            seen.insert(call.id.clone());
            call
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn call(id: &str) -> ToolCallRequest {
        ToolCallRequest::new(id, "read_page", Map::new())
    }

    #[test]
    fn test_assign_ids_fills_missing() {
        let calls = assign_call_ids(vec![call(""), call("")], 2);
        assert_eq!(calls[0].id, "call_2_0");
        assert_eq!(calls[1].id, "call_2_1");
    }

    #[test]
    fn test_assign_ids_keeps_model_ids_and_fixes_duplicates() {
        let calls = assign_call_ids(vec![call("x"), call("x"), call("y")], 1);
        let ids: Vec<&str> = calls.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "call_1_1", "y"]);
    }

    #[test]
    fn test_close_interrupted_round_answers_open_calls() {
        let mut session = ChatSession::new();
        session.conversation.push(Turn::User {
            text: "q".to_string(),
        });
        let calls = vec![call("a"), call("b")];
        session.conversation.push(Turn::Model {
            text: None,
            tool_calls: calls.clone(),
        });
        session
            .conversation
            .push(Turn::ToolResult(ToolCallResult::error(&calls[0], "x")));
        session.state = RelayState::ToolPending;

        session.close_interrupted_round();

        assert_eq!(session.state(), RelayState::AwaitingUser);
        assert_eq!(session.conversation().len(), 4);
        match session.conversation().last() {
            Some(Turn::ToolResult(result)) => {
                assert_eq!(result.id, "b");
                assert_eq!(result.content, INTERRUPTED_MESSAGE);
            }
            other => panic!("unexpected last turn: {:?}", other),
        }
    }

    #[test]
    fn test_reset_clears_history() {
        let mut session = ChatSession::new();
        session.conversation.push(Turn::User {
            text: "q".to_string(),
        });
        session.state = RelayState::Done;
        session.reset();
        assert!(session.conversation().is_empty());
        assert_eq!(session.state(), RelayState::AwaitingUser);
    }
}
