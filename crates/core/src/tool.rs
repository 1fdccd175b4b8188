//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools are what give the agent the ability to act in the world:
//! do math, search the web, query a database. Every tool takes one string
//! and returns one string; structure inside that string is between the
//! tool and the policy that calls it.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::error::ToolError;

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "calculator").
    fn name(&self) -> &str;

    /// What this tool does, phrased for the policy choosing between tools.
    fn description(&self) -> &str;

    /// Run the tool.
    ///
    /// Return [`ToolError::Fatal`] only for failures the loop must not
    /// continue past; anything else is shown to the agent as an observation.
    async fn call(&self, input: &str) -> Result<String, ToolError>;
}

/// A registry of available tools, keyed by exact (case-sensitive) name.
///
/// Registering a second tool under an existing name replaces the first.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Build a registry from a tool list. Later duplicates shadow earlier ones.
    pub fn from_tools(tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        let mut registry = Self::new();
        for tool in tools {
            registry.register(tool);
        }
        registry
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            warn!(tool = %name, "Duplicate tool name, keeping the last registered");
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Look up and run a tool.
    pub async fn call(&self, name: &str, input: &str) -> Result<String, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.call(input).await
    }

    /// All registered tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
