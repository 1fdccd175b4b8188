//! `stepwise chat`: interactive conversation with memory.

use std::io::Write;
use std::sync::Arc;

use stepwise_agent::CancellationToken;
use stepwise_config::{AgentKind, AppConfig};
use stepwise_core::Memory;
use stepwise_core::schema::Values;
use stepwise_memory::ConversationBuffer;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use super::{Overrides, load_executor};

pub async fn run(mut overrides: Overrides) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = AppConfig::load().unwrap_or_default();
    overrides.agent = Some(chat_agent(overrides.agent, loaded.agent, loaded.memory.enabled));

    let (config, executor) = load_executor(overrides)?;
    let memory = Arc::new(ConversationBuffer::new().with_window(config.memory.window));
    let executor = if config.memory.enabled {
        executor.with_memory(memory.clone())
    } else {
        executor
    };

    let input_key = executor
        .input_keys()
        .into_iter()
        .next()
        .ok_or("agent takes no input")?;

    println!();
    println!("  Stepwise chat");
    println!();
    println!("  Agent:     {:?}", config.agent);
    println!("  Model:     {}", config.default_model);
    println!("  Tools:     {}", executor.tools().names().join(", "));
    println!("  Memory:    {}", if config.memory.enabled { "on" } else { "off" });
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type '/clear' to forget the conversation, 'exit' to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        match line {
            "" => continue,
            "exit" | "quit" => break,
            "/clear" => {
                memory.clear().await?;
                println!("  (conversation cleared)");
                continue;
            }
            _ => {}
        }

        let inputs = Values::from([(input_key.clone(), line.to_string())]);
        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt.cancel();
            }
        });

        match executor.execute(inputs, &cancel).await {
            Ok(report) => {
                println!();
                for value in report.outputs.values() {
                    for text in value.lines() {
                        println!("  Assistant > {text}");
                    }
                }
                println!();
            }
            Err(e) => {
                eprintln!("  [Error] {e}");
                println!();
            }
        }
        watcher.abort();
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

/// Agent used for chat. Defaults to the conversational agent when memory can
/// feed it a history; without memory it has none, so zero-shot is used.
fn chat_agent(requested: Option<AgentKind>, configured: AgentKind, memory_enabled: bool) -> AgentKind {
    let agent = match requested {
        Some(agent) => agent,
        None if configured == AgentKind::ZeroShot && memory_enabled => AgentKind::Conversational,
        None => configured,
    };

    if agent == AgentKind::Conversational && !memory_enabled {
        warn!("Conversational agent needs memory for its history; using zero-shot instead");
        return AgentKind::ZeroShot;
    }
    agent
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_prefers_conversational_with_memory() {
        assert_eq!(
            chat_agent(None, AgentKind::ZeroShot, true),
            AgentKind::Conversational
        );
        assert_eq!(
            chat_agent(None, AgentKind::RuleBased, true),
            AgentKind::RuleBased
        );
        assert_eq!(
            chat_agent(Some(AgentKind::ZeroShot), AgentKind::Conversational, true),
            AgentKind::ZeroShot
        );
    }

    #[test]
    fn chat_without_memory_never_picks_conversational() {
        assert_eq!(chat_agent(None, AgentKind::ZeroShot, false), AgentKind::ZeroShot);
        assert_eq!(
            chat_agent(None, AgentKind::Conversational, false),
            AgentKind::ZeroShot
        );
        assert_eq!(
            chat_agent(Some(AgentKind::Conversational), AgentKind::ZeroShot, false),
            AgentKind::ZeroShot
        );
    }
}
