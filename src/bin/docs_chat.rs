//! Terminal chat client.
//!
//! Answers questions about the documentation with a Gemini model that calls
//! the documentation tools. Tools are served in-process unless
//! `CHAT_MCP_URL` points at a running server.

use anyhow::{Context, Result, bail};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt};

use docs_mcp::chat::surface::{render_conversation, render_tools, render_turn_progress};
use docs_mcp::chat::{
    ChatSession, GeminiClient, LocalTools, McpHttpClient, RelayError, RelayLoop, ToolCatalog,
    ToolInvoker,
};
use docs_mcp::core::{Config, McpServer};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();
    init_logging(&config.logging.level);

    let Some(api_key) = config.credentials.gemini_api_key.clone() else {
        bail!("GEMINI_API_KEY is not set");
    };

    let tools: Arc<dyn ToolInvoker> = match &config.chat.mcp_url {
        Some(url) => {
            info!("Using documentation server at {}", url);
            Arc::new(McpHttpClient::new(url.clone(), config.chat.tool_timeout_secs)?)
        }
        None => {
            info!("Serving documentation tools in-process");
            Arc::new(LocalTools::new(McpServer::new(config.clone())?))
        }
    };

    let catalog = ToolCatalog::discover(tools.as_ref())
        .await
        .context("failed to load the tool catalogue")?;
    let model = Arc::new(GeminiClient::new(&config.chat, api_key)?);
    info!("Model: {}", model.model());

    let relay = RelayLoop::from_config(model, tools, catalog, &config.chat);
    run_repl(&relay).await
}

async fn run_repl(relay: &RelayLoop) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut session = ChatSession::new();

    write_out(
        &mut stdout,
        "Ask me about Better Auth. Commands: /tools /history /reset /exit\n",
    )
    .await?;

    loop {
        write_out(&mut stdout, "\nyou> ").await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match line.trim() {
            "" => continue,
            "/exit" | "/quit" => break,
            "/tools" => {
                write_out(&mut stdout, &format!("{}\n", render_tools(relay.catalog()))).await?;
            }
            "/history" => {
                let history = render_conversation(session.conversation());
                write_out(&mut stdout, &format!("{}\n", history)).await?;
            }
            "/reset" => {
                session.reset();
                write_out(&mut stdout, "History cleared.\n").await?;
            }
            input => {
                let start = session.conversation().len();
                let outcome = relay.run_turn(&mut session, input).await;

                // Partial model text and collapsed tool calls from this turn.
                let new_turns = &session.conversation().turns()[start..];
                for line in render_turn_progress(new_turns) {
                    write_out(&mut stdout, &format!("{}\n", line)).await?;
                }

                let reply = match outcome {
                    Ok(outcome) => format!("assistant> {}\n", outcome.answer),
                    Err(e @ RelayError::ToolLoopExceeded { .. }) => {
                        format!("error> {}. Try rephrasing the question.\n", e)
                    }
                    Err(e) => format!("error> {}\n", e),
                };
                write_out(&mut stdout, &reply).await?;
            }
        }
    }

    info!("Chat session ended");
    Ok(())
}

async fn write_out(stdout: &mut tokio::io::Stdout, text: &str) -> Result<()> {
    stdout.write_all(text.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}

/// Logs go to stderr so they do not interleave with the conversation.
fn init_logging(level: &str) {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
