//! One-call construction of a ready-to-run executor.

use std::sync::Arc;

use stepwise_config::{AgentKind, AppConfig};
use stepwise_core::error::{Error, Result};
use stepwise_core::llm::Llm;
use stepwise_core::tool::Tool;

use crate::executor::{Executor, ExecutorOptions};
use crate::patterns::{ReactAgent, RuleBasedAgent};

/// Stock agent flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentType {
    /// Answers one question, choosing tools from their descriptions.
    ZeroShotReactDescription,
    /// Same, but converses; pair with memory providing `history`.
    ConversationalReactDescription,
}

/// Wrap a stock agent over `llm` and `tools` in an executor.
pub fn initialize(
    llm: Arc<dyn Llm>,
    tools: Vec<Arc<dyn Tool>>,
    agent_type: AgentType,
    options: ExecutorOptions,
) -> Executor {
    let agent = match agent_type {
        AgentType::ZeroShotReactDescription => ReactAgent::zero_shot(llm, &tools),
        AgentType::ConversationalReactDescription => ReactAgent::conversational(llm, &tools),
    };
    Executor::new(Arc::new(agent), tools).with_options(options)
}

/// Build the executor described by `config`.
///
/// `llm` may be `None` only for the rule-based agent.
pub fn from_config(
    config: &AppConfig,
    llm: Option<Arc<dyn Llm>>,
    tools: Vec<Arc<dyn Tool>>,
) -> Result<Executor> {
    let options = ExecutorOptions::from(&config.executor);

    let agent_type = match config.agent {
        AgentKind::RuleBased => {
            let agent = RuleBasedAgent::builtin()?;
            return Ok(Executor::new(Arc::new(agent), tools).with_options(options));
        }
        AgentKind::ZeroShot => AgentType::ZeroShotReactDescription,
        AgentKind::Conversational => AgentType::ConversationalReactDescription,
    };

    let llm = llm.ok_or_else(|| {
        Error::config("no language model configured; set STEPWISE_API_KEY or use the rule_based agent")
    })?;
    Ok(initialize(llm, tools, agent_type, options))
}
