//! codeloop
//!
//! Interactive terminal agent: reads a prompt line, lets the model work
//! through the local tools, prints the answer, repeats.

mod render;

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::{Agent, AgentError, SessionConfig, Submission};
use agent_runtime::ResponsesClient;

use crate::render::Terminal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing on stderr so it stays out of the conversation
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = SessionConfig::from_env().context("cannot start session")?;
    tracing::info!(?config, "Configuration loaded");

    let tools = Arc::new(agent_tools::default_registry(&config)?);
    tracing::info!("Registered {} tools: {}", tools.len(), tools.names().join(", "));

    let client = Arc::new(ResponsesClient::new(&config)?);
    let mut agent = Agent::new(client, tools, &config);
    let mut terminal = Terminal::new(agent.tools().clone());

    terminal.banner(agent.model(), &config.working_dir);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        terminal.prompt()?;
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                println!();
                terminal.goodbye();
                break;
            }
            // The offending line is consumed; the next read starts after it
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                terminal.error(&AgentError::Io(e));
                continue;
            }
            Err(e) => return Err(e).context("cannot read from stdin"),
        };
        terminal.separator();

        match agent.submit(&line, &mut terminal).await {
            Ok(Submission::Exit) => {
                terminal.goodbye();
                break;
            }
            Ok(Submission::Cleared) => terminal.cleared(),
            Ok(Submission::Ignored) => {}
            Ok(Submission::Completed(summary)) => {
                tracing::info!(
                    session = %agent.session().id,
                    model_calls = summary.model_calls,
                    tool_calls = summary.tool_calls,
                    turns = agent.conversation().len(),
                    "Turn complete"
                );
            }
            Err(e) => terminal.error(&e),
        }
    }

    Ok(())
}
