//! Subcommand implementations.

pub mod chat;
pub mod config_cmd;
pub mod run;
pub mod tools;

use std::sync::Arc;

use stepwise_agent::Executor;
use stepwise_config::{AgentKind, AppConfig};
use stepwise_core::llm::Llm;
use stepwise_tools::ToolCatalog;
use tracing::info;

/// Command-line overrides applied on top of the loaded config.
#[derive(Debug, Default, Clone, Copy)]
pub struct Overrides {
    pub agent: Option<AgentKind>,
    pub max_iterations: Option<u32>,
    pub timeout_secs: Option<u64>,
}

impl Overrides {
    fn apply(self, config: &mut AppConfig) {
        if let Some(agent) = self.agent {
            config.agent = agent;
        }
        if let Some(max) = self.max_iterations {
            config.executor.max_iterations = max;
        }
        if let Some(secs) = self.timeout_secs {
            config.executor.max_execution_time_secs = secs;
        }
    }
}

/// Load config, apply overrides, and wire the executor it describes.
pub fn load_executor(overrides: Overrides) -> Result<(AppConfig, Executor), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    overrides.apply(&mut config);
    config.validate()?;

    let tools = ToolCatalog::from_config(&config).build(&config.tools)?;

    let llm: Option<Arc<dyn Llm>> = match config.agent {
        AgentKind::RuleBased => None,
        _ if !config.has_api_key() => {
            print_missing_key_help();
            return Err("No API key found. See above for setup instructions.".into());
        }
        _ => Some(stepwise_providers::build_from_config(&config)?),
    };

    let executor = stepwise_agent::from_config(&config, llm, tools)?;
    info!(
        agent = ?config.agent,
        model = %config.default_model,
        max_iterations = config.executor.max_iterations,
        "Executor ready"
    );
    Ok((config, executor))
}

fn print_missing_key_help() {
    eprintln!();
    eprintln!("  ERROR: No API key configured!");
    eprintln!();
    eprintln!("  Set one of these environment variables:");
    eprintln!("    STEPWISE_API_KEY = 'sk-...'   (generic)");
    eprintln!("    OPENAI_API_KEY   = 'sk-...'   (for OpenAI direct)");
    eprintln!();
    eprintln!("  Or add it to your config file:");
    eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
    eprintln!();
    eprintln!("  Or run offline with: stepwise run --agent rule-based \"2 + 2\"");
    eprintln!();
}
