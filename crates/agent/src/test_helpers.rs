//! Shared test doubles for executor and agent tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use stepwise_core::agent::{Agent, AgentDecision};
use stepwise_core::error::{AgentError, ProviderError, ToolError};
use stepwise_core::llm::Llm;
use stepwise_core::schema::{AgentAction, AgentFinish, AgentStep, Values};
use stepwise_core::tool::Tool;

/// A mock model that returns a sequence of scripted completions.
///
/// Each call to `complete` returns the next response in the queue and
/// records the prompt it was given.
/// Panics if more calls are made than responses provided.
pub struct SequentialMockLlm {
    responses: Vec<String>,
    prompts: Mutex<Vec<String>>,
    chat: bool,
}

impl SequentialMockLlm {
    pub fn new(responses: &[&str]) -> Self {
        Self {
            responses: responses.iter().map(|r| r.to_string()).collect(),
            prompts: Mutex::new(Vec::new()),
            chat: false,
        }
    }

    pub fn chat(mut self) -> Self {
        self.chat = true;
        self
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Llm for SequentialMockLlm {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    fn is_chat(&self) -> bool {
        self.chat
    }

    async fn complete(&self, prompt: &str, _stop: &[String]) -> Result<String, ProviderError> {
        let mut prompts = self.prompts.lock().unwrap();
        let count = prompts.len();
        if count >= self.responses.len() {
            panic!(
                "SequentialMockLlm: no more responses (call #{}, have {})",
                count,
                self.responses.len()
            );
        }
        prompts.push(prompt.to_string());
        Ok(self.responses[count].clone())
    }
}

/// What a [`ScriptedAgent`] does on a given plan call.
#[derive(Clone)]
pub enum Script {
    Decide(AgentDecision),
    Fail(AgentError),
    /// Never returns (until dropped).
    Hang,
}

/// An agent that replays a script and records every plan call.
///
/// Once the script is exhausted the last entry repeats.
pub struct ScriptedAgent {
    script: Vec<Script>,
    input_keys: Vec<String>,
    calls: Mutex<Vec<(Vec<AgentStep>, Values)>>,
}

impl ScriptedAgent {
    pub fn new(script: Vec<Script>) -> Self {
        Self {
            script,
            input_keys: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_input_keys(mut self, keys: &[&str]) -> Self {
        self.input_keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    /// An agent whose output never parses.
    pub fn always_unparseable() -> Self {
        Self::new(vec![Script::Fail(AgentError::parse("I am thinking..."))])
    }

    pub fn plan_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Step history seen by the most recent plan call.
    pub fn last_steps(&self) -> Vec<AgentStep> {
        self.calls
            .lock()
            .unwrap()
            .last()
            .map(|(steps, _)| steps.clone())
            .unwrap_or_default()
    }

    /// Inputs seen by the most recent plan call.
    pub fn last_inputs(&self) -> Values {
        self.calls
            .lock()
            .unwrap()
            .last()
            .map(|(_, inputs)| inputs.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    async fn plan(&self, steps: &[AgentStep], inputs: &Values) -> Result<AgentDecision, AgentError> {
        let entry = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((steps.to_vec(), inputs.clone()));
            let idx = (calls.len() - 1).min(self.script.len() - 1);
            self.script[idx].clone()
        };
        match entry {
            Script::Decide(decision) => Ok(decision),
            Script::Fail(err) => Err(err),
            Script::Hang => std::future::pending().await,
        }
    }

    fn input_keys(&self) -> Vec<String> {
        self.input_keys.clone()
    }

    fn output_keys(&self) -> Vec<String> {
        vec!["output".into()]
    }
}

pub fn act(tool: &str, input: &str) -> Script {
    Script::Decide(AgentDecision::action(AgentAction::new(tool, input)))
}

pub fn finish(output: &str) -> Script {
    Script::Decide(AgentDecision::Finish(AgentFinish::single("output", output)))
}

pub fn values(pairs: &[(&str, &str)]) -> Values {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Echoes its input back.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echoes the input back"
    }

    async fn call(&self, input: &str) -> Result<String, ToolError> {
        Ok(input.to_string())
    }
}

/// Always fails, fatally or not.
pub struct FailingTool {
    pub fatal: bool,
}

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "broken"
    }

    fn description(&self) -> &str {
        "Always fails"
    }

    async fn call(&self, _input: &str) -> Result<String, ToolError> {
        if self.fatal {
            Err(ToolError::Fatal {
                tool_name: "broken".into(),
                reason: "disk on fire".into(),
            })
        } else {
            Err(ToolError::ExecutionFailed {
                tool_name: "broken".into(),
                reason: "temporarily unavailable".into(),
            })
        }
    }
}

/// Sleeps before answering.
pub struct SlowTool {
    pub delay: Duration,
}

#[async_trait]
impl Tool for SlowTool {
    fn name(&self) -> &str {
        "slow"
    }

    fn description(&self) -> &str {
        "Takes its time"
    }

    async fn call(&self, _input: &str) -> Result<String, ToolError> {
        tokio::time::sleep(self.delay).await;
        Ok("done".into())
    }
}
