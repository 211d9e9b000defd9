use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value, json};
use tokio_test::{assert_err, assert_ok};

use docs_mcp::chat::relay::ROUND_LIMIT_MESSAGE;
use docs_mcp::chat::{
    ChatSession, Conversation, LocalTools, ModelClient, ModelError, ModelReply, ModelRequest,
    RelayError, RelayLoop, RelayState, ToolCallRequest, ToolCatalog, ToolClientError,
    ToolDescriptor, ToolInvoker, ToolOutput, Turn,
};
use docs_mcp::core::{Config, McpServer};
use docs_mcp::domains::docs::{DocsError, DocsSource, DocumentationPage, Route, TableOfContents};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Replies from a script and records the conversation it was shown.
struct ScriptedModel {
    replies: Mutex<VecDeque<Result<ModelReply, ModelError>>>,
    seen: Mutex<Vec<Conversation>>,
}

impl ScriptedModel {
    fn new(replies: Vec<Result<ModelReply, ModelError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.seen.lock().expect("seen lock").len()
    }

    fn request(&self, index: usize) -> Conversation {
        self.seen.lock().expect("seen lock")[index].clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn generate(&self, request: ModelRequest<'_>) -> Result<ModelReply, ModelError> {
        self.seen
            .lock()
            .expect("seen lock")
            .push(request.conversation.clone());
        self.replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::invalid("script exhausted")))
    }
}

/// Echoes its arguments; `delay_ms` in the arguments delays the reply.
struct EchoTools {
    invocations: AtomicUsize,
}

impl EchoTools {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            invocations: AtomicUsize::new(0),
        })
    }

    fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolInvoker for EchoTools {
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolClientError> {
        Ok(descriptors(&["get_table_of_contents", "read_page"]))
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<ToolOutput, ToolClientError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = arguments.get("delay_ms").and_then(Value::as_u64) {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        Ok(ToolOutput {
            content: format!("{}:{}", name, Value::Object(arguments)),
            is_error: false,
            structured: None,
        })
    }
}

/// Serves a small documentation site from memory.
struct SiteDocs {
    pages: HashMap<&'static str, &'static str>,
}

const SITE_INDEX: &str = "\
# Better Auth

### Concepts
- [Session Management](/docs/session): Configure session expiration and storage.
- [Email OTP](/docs/plugins/email-otp): One-time passwords by email.
";

const SESSION_PAGE: &str = "# Session Management\n\nSet `session.expiresIn` (in seconds) to control expiration.\n";

impl SiteDocs {
    fn new() -> Self {
        let mut pages = HashMap::new();
        pages.insert("/docs/session", SESSION_PAGE);
        pages.insert("/docs/plugins/email-otp", "# Email OTP\n");
        Self { pages }
    }
}

#[async_trait]
impl DocsSource for SiteDocs {
    async fn list_contents(&self) -> Result<TableOfContents, DocsError> {
        TableOfContents::parse(SITE_INDEX)
    }

    async fn read_page(&self, route: &str) -> Result<DocumentationPage, DocsError> {
        let route = Route::parse(route)?;
        let content = self
            .pages
            .get(route.as_str())
            .ok_or_else(|| DocsError::not_found(route.as_str()))?;
        Ok(DocumentationPage {
            route,
            content: content.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn call(id: &str, name: &str, args: Value) -> ToolCallRequest {
    let arguments = match args {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    ToolCallRequest::new(id, name, arguments)
}

fn descriptors(names: &[&str]) -> Vec<ToolDescriptor> {
    names
        .iter()
        .map(|name| ToolDescriptor {
            name: name.to_string(),
            description: format!("{} tool", name),
            input_schema: json!({"type": "object"}),
        })
        .collect()
}

async fn relay_with(model: Arc<dyn ModelClient>, tools: Arc<dyn ToolInvoker>) -> RelayLoop {
    let catalog = ToolCatalog::discover(tools.as_ref())
        .await
        .expect("catalogue should build");
    RelayLoop::new(model, tools, catalog)
}

async fn site_relay(model: Arc<dyn ModelClient>) -> RelayLoop {
    let server = McpServer::with_source(Config::default(), Arc::new(SiteDocs::new()))
        .expect("server should build");
    relay_with(model, Arc::new(LocalTools::new(server))).await
}

fn tool_results(conversation: &Conversation) -> Vec<&docs_mcp::chat::ToolCallResult> {
    conversation
        .turns()
        .iter()
        .filter_map(|turn| match turn {
            Turn::ToolResult(result) => Some(result),
            _ => None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Round mechanics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn every_request_gets_one_result_in_request_order() {
    for n in [0usize, 1, 3] {
        // Earlier requests sleep longer, so they complete last.
        let calls: Vec<ToolCallRequest> = (0..n)
            .map(|i| {
                call(
                    &format!("req-{}", i),
                    "read_page",
                    json!({"route": format!("/docs/{}", i), "delay_ms": 30 * (n - i) as u64}),
                )
            })
            .collect();

        let first = if n == 0 {
            ModelReply::text("no tools needed")
        } else {
            ModelReply::tool_calls(calls.clone())
        };
        let model = ScriptedModel::new(vec![Ok(first), Ok(ModelReply::text("done"))]);
        let tools = EchoTools::new();
        let relay = relay_with(model.clone(), tools.clone()).await;

        let mut session = ChatSession::new();
        let outcome = relay
            .run_turn(&mut session, "question")
            .await
            .expect("turn should complete");

        assert_eq!(tools.invocations(), n, "n = {}", n);
        assert_eq!(outcome.tool_rounds, usize::from(n > 0));
        assert_eq!(tool_results(session.conversation()).len(), n);

        if n > 0 {
            assert_eq!(model.calls(), 2);
            // The second model call sees exactly n results right after the requests.
            let seen = model.request(1);
            let turns = seen.turns();
            let tail = &turns[turns.len() - n..];
            for (request, turn) in calls.iter().zip(tail) {
                match turn {
                    Turn::ToolResult(result) => {
                        assert_eq!(result.id, request.id);
                        assert!(result.content.contains(&format!("/docs/{}", &request.id[4..])));
                    }
                    other => panic!("expected tool result, got {:?}", other),
                }
            }
            assert!(matches!(turns[turns.len() - n - 1], Turn::Model { .. }));
        } else {
            assert_eq!(model.calls(), 1);
        }
    }
}

#[tokio::test]
async fn missing_ids_are_assigned_per_round() {
    let model = ScriptedModel::new(vec![
        Ok(ModelReply::tool_calls(vec![
            call("", "get_table_of_contents", json!({})),
            call("", "read_page", json!({"route": "/docs/a"})),
        ])),
        Ok(ModelReply::text("done")),
    ]);
    let relay = relay_with(model, EchoTools::new()).await;

    let mut session = ChatSession::new();
    relay.run_turn(&mut session, "q").await.expect("turn");

    let ids: Vec<&str> = tool_results(session.conversation())
        .iter()
        .map(|r| r.id.as_str())
        .collect();
    assert_eq!(ids, vec!["call_1_0", "call_1_1"]);
}

#[tokio::test]
async fn round_limit_stops_a_tool_hungry_model() {
    // Four rounds of tool requests, then a plain answer on the next question.
    let mut replies: Vec<Result<ModelReply, ModelError>> = (0..4)
        .map(|_| Ok(ModelReply::tool_calls(vec![call("", "get_table_of_contents", json!({}))])))
        .collect();
    replies.push(Ok(ModelReply::text("Sessions last seven days by default.")));
    let model = ScriptedModel::new(replies);
    let tools = EchoTools::new();
    let relay = relay_with(model.clone(), tools.clone())
        .await
        .with_max_tool_rounds(3);

    let mut session = ChatSession::new();
    let err = relay
        .run_turn(&mut session, "loop forever")
        .await
        .expect_err("turn should fail");

    assert_eq!(err, RelayError::ToolLoopExceeded { rounds: 3 });
    assert_eq!(tools.invocations(), 3);
    assert_eq!(model.calls(), 4);
    assert_eq!(session.state(), RelayState::AwaitingUser);

    // The unexecuted request still has its result.
    match session.conversation().last() {
        Some(Turn::ToolResult(result)) => {
            assert!(result.is_error);
            assert_eq!(result.content, ROUND_LIMIT_MESSAGE);
        }
        other => panic!("expected synthetic result, got {:?}", other),
    }

    // The same session answers the next question.
    let outcome = assert_ok!(relay.run_turn(&mut session, "how long do sessions last?").await);
    assert_eq!(outcome.answer, "Sessions last seven days by default.");
    assert_eq!(session.state(), RelayState::Done);
    assert_eq!(tools.invocations(), 3);
    assert_eq!(model.calls(), 5);

    // Every tool request the model sees is followed by exactly its results.
    let seen = model.request(4);
    let turns = seen.turns();
    let mut index = 0;
    let mut rounds = 0;
    while index < turns.len() {
        if let Turn::Model { tool_calls, .. } = &turns[index] {
            if !tool_calls.is_empty() {
                rounds += 1;
                for (offset, request) in tool_calls.iter().enumerate() {
                    match turns.get(index + 1 + offset) {
                        Some(Turn::ToolResult(result)) => assert_eq!(result.id, request.id),
                        other => panic!("expected result for {}, got {:?}", request.id, other),
                    }
                }
                index += tool_calls.len();
            }
        }
        index += 1;
    }
    assert_eq!(rounds, 4);

    let synthetic: Vec<_> = tool_results(&seen)
        .into_iter()
        .filter(|r| r.content == ROUND_LIMIT_MESSAGE)
        .collect();
    assert_eq!(synthetic.len(), 1);
    assert!(matches!(
        turns.last(),
        Some(Turn::User { text }) if text == "how long do sessions last?"
    ));
}

#[tokio::test]
async fn tool_timeout_is_fed_back_as_error_result() {
    let model = ScriptedModel::new(vec![
        Ok(ModelReply::tool_calls(vec![call(
            "slow",
            "read_page",
            json!({"route": "/docs/a", "delay_ms": 5_000}),
        )])),
        Ok(ModelReply::text("the tool was too slow")),
    ]);
    let relay = relay_with(model.clone(), EchoTools::new())
        .await
        .with_tool_timeout(Duration::from_millis(50));

    let mut session = ChatSession::new();
    let outcome = relay.run_turn(&mut session, "q").await.expect("turn");
    assert_eq!(outcome.answer, "the tool was too slow");

    let results = tool_results(session.conversation());
    assert!(results[0].is_error);
    assert!(results[0].content.contains("timed out"));
}

#[tokio::test]
async fn unknown_tool_is_fed_back_without_invoking_provider() {
    let model = ScriptedModel::new(vec![
        Ok(ModelReply::tool_calls(vec![call("x", "delete_everything", json!({}))])),
        Ok(ModelReply::text("I cannot do that")),
    ]);
    let tools = EchoTools::new();
    let relay = relay_with(model.clone(), tools.clone()).await;

    let mut session = ChatSession::new();
    let outcome = relay.run_turn(&mut session, "q").await.expect("turn");

    assert_eq!(outcome.answer, "I cannot do that");
    assert_eq!(tools.invocations(), 0);
    let results = tool_results(session.conversation());
    assert!(results[0].is_error);
    assert!(results[0].content.contains("unknown tool 'delete_everything'"));
}

// ---------------------------------------------------------------------------
// Failures outside the tool round
// ---------------------------------------------------------------------------

#[tokio::test]
async fn model_failure_returns_to_awaiting_user_with_error_turn() {
    let model = ScriptedModel::new(vec![
        Err(ModelError::Timeout(60)),
        Ok(ModelReply::text("second try works")),
    ]);
    let relay = relay_with(model.clone(), EchoTools::new()).await;

    let mut session = ChatSession::new();
    let err = relay
        .run_turn(&mut session, "first")
        .await
        .expect_err("model failure");
    assert_eq!(err, RelayError::ModelCall(ModelError::Timeout(60)));
    assert_eq!(session.state(), RelayState::AwaitingUser);
    assert!(matches!(session.conversation().last(), Some(Turn::Error { .. })));

    let outcome = relay.run_turn(&mut session, "second").await.expect("retry");
    assert_eq!(outcome.answer, "second try works");

    // The error turn is kept in history but never shown to the model.
    let seen = model.request(1);
    assert_eq!(seen.model_visible().count(), 2);
    assert!(seen.model_visible().all(|t| !matches!(t, Turn::Error { .. })));
}

#[tokio::test]
async fn empty_reply_is_a_model_failure() {
    let model = ScriptedModel::new(vec![Ok(ModelReply::default())]);
    let relay = relay_with(model, EchoTools::new()).await;

    let mut session = ChatSession::new();
    let err = relay.run_turn(&mut session, "q").await.expect_err("empty");
    assert!(matches!(err, RelayError::ModelCall(ModelError::InvalidResponse(_))));
}

#[tokio::test]
async fn blank_input_is_rejected_before_the_model() {
    let model = ScriptedModel::new(vec![Ok(ModelReply::text("unused"))]);
    let relay = relay_with(model.clone(), EchoTools::new()).await;

    let mut session = ChatSession::new();
    let err = assert_err!(relay.run_turn(&mut session, "  \n\t").await);
    assert_eq!(err, RelayError::EmptyInput);
    assert_eq!(model.calls(), 0);
    assert!(session.conversation().is_empty());
}

#[tokio::test]
async fn catalogue_rejects_provider_without_required_tools() {
    struct PartialTools;

    #[async_trait]
    impl ToolInvoker for PartialTools {
        async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolClientError> {
            Ok(descriptors(&["read_page"]))
        }

        async fn call_tool(
            &self,
            _name: &str,
            _arguments: Map<String, Value>,
        ) -> Result<ToolOutput, ToolClientError> {
            Err(ToolClientError::transport("unused"))
        }
    }

    let err = ToolCatalog::discover(&PartialTools)
        .await
        .expect_err("catalogue should be rejected");
    assert!(matches!(err, RelayError::Catalog(_)));
}

// ---------------------------------------------------------------------------
// End-to-end scenarios over the in-process documentation tools
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scenario_table_of_contents_then_page() {
    let model = ScriptedModel::new(vec![
        Ok(ModelReply::tool_calls(vec![call(
            "",
            "get_table_of_contents",
            json!({}),
        )])),
        Ok(ModelReply::tool_calls(vec![call(
            "",
            "read_page",
            json!({"route": "/docs/session"}),
        )])),
        Ok(ModelReply::text(
            "Set `session.expiresIn` to the lifetime in seconds.",
        )),
    ]);
    let relay = site_relay(model.clone()).await;

    let mut session = ChatSession::new();
    let outcome = relay
        .run_turn(&mut session, "How do I configure session expiration?")
        .await
        .expect("turn");

    assert_eq!(outcome.tool_rounds, 2);
    assert_eq!(session.state(), RelayState::Done);
    assert!(outcome.answer.contains("session.expiresIn"));

    // Round one returned the index, round two the verbatim page.
    let second = model.request(1);
    let toc = tool_results(&second);
    assert!(toc[0].content.contains("/docs/session"));

    let third = model.request(2);
    let results = tool_results(&third);
    assert_eq!(results.len(), 2);
    assert_eq!(results[1].content, SESSION_PAGE);
    assert!(!results[1].is_error);
}

#[tokio::test]
async fn scenario_direct_answer_without_tools() {
    let model = ScriptedModel::new(vec![Ok(ModelReply::text("Hello! Ask me about Better Auth."))]);
    let relay = site_relay(model.clone()).await;

    let mut session = ChatSession::new();
    let outcome = assert_ok!(relay.run_turn(&mut session, "hi").await);

    assert_eq!(outcome.tool_rounds, 0);
    assert_eq!(model.calls(), 1);
    assert_eq!(session.conversation().len(), 2);
    assert_eq!(session.state(), RelayState::Done);
}

#[tokio::test]
async fn scenario_not_found_is_fed_back_to_the_model() {
    let model = ScriptedModel::new(vec![
        Ok(ModelReply::tool_calls(vec![call(
            "p1",
            "read_page",
            json!({"route": "/docs/nonexistent"}),
        )])),
        Ok(ModelReply::text("That page does not exist.")),
    ]);
    let relay = site_relay(model.clone()).await;

    let mut session = ChatSession::new();
    let outcome = relay.run_turn(&mut session, "read it").await.expect("turn");
    assert_eq!(outcome.answer, "That page does not exist.");

    let seen = model.request(1);
    let results = tool_results(&seen);
    assert_eq!(results.len(), 1);
    assert!(results[0].is_error);
    assert!(results[0].content.contains("Page not found"));
    assert_eq!(
        results[0].structured.as_ref().expect("structured error")["error"]["kind"],
        "not_found"
    );
}

#[tokio::test]
async fn history_is_retained_across_turns() {
    let model = ScriptedModel::new(vec![
        Ok(ModelReply::text("first answer")),
        Ok(ModelReply::text("second answer")),
    ]);
    let relay = site_relay(model.clone()).await;

    let mut session = ChatSession::new();
    relay.run_turn(&mut session, "one").await.expect("turn 1");
    relay.run_turn(&mut session, "two").await.expect("turn 2");

    assert_eq!(session.conversation().len(), 4);
    assert_eq!(model.request(1).len(), 3);
}
