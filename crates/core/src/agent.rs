//! Agent trait: the pluggable decision policy driven by the executor.
//!
//! An agent looks at the step history and the call inputs and either asks
//! for more tool invocations or declares that it is done. How it decides
//! (rules, a remote language model, a script in a test) is its own business.

use async_trait::async_trait;

use crate::error::AgentError;
use crate::schema::{AgentAction, AgentFinish, AgentStep, Values};

/// What an agent wants to happen next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentDecision {
    /// Dispatch these actions, in order, then plan again.
    Actions(Vec<AgentAction>),
    /// Stop the loop with these outputs.
    Finish(AgentFinish),
}

impl AgentDecision {
    pub fn action(action: AgentAction) -> Self {
        Self::Actions(vec![action])
    }

    pub fn is_finish(&self) -> bool {
        matches!(self, Self::Finish(_))
    }
}

/// The core Agent trait.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Decide the next move given everything observed so far.
    async fn plan(&self, steps: &[AgentStep], inputs: &Values) -> Result<AgentDecision, AgentError>;

    /// Keys the caller must supply.
    fn input_keys(&self) -> Vec<String>;

    /// Keys present in a finish's return values.
    fn output_keys(&self) -> Vec<String>;
}
