//! The execution loop: **Plan → Act → Observe**, bounded.
//!
//! An [`Executor`] owns an agent, a tool registry and the loop budget. One
//! call runs the loop:
//!
//! 1. **Validate** the caller's inputs against the agent's input keys
//! 2. **Load** remembered context, if memory is attached
//! 3. **Plan**: ask the agent for the next move given all steps so far
//! 4. **Act**: dispatch each requested action to its tool, in order, and
//!    record `(action, observation)` in the step history
//! 5. **Finish**: when the agent declares it is done, save to memory and
//!    return its outputs
//!
//! The loop stops early when the iteration budget or the wall-clock
//! deadline runs out, or when the caller cancels. Planning and tool calls
//! are raced against both, so an unresponsive collaborator cannot hold a
//! call past its deadline.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use stepwise_config::{EarlyStoppingConfig, ExecutorConfig};
use stepwise_core::agent::{Agent, AgentDecision};
use stepwise_core::error::{AgentError, Error, Result, ToolError};
use stepwise_core::memory::Memory;
use stepwise_core::schema::{AgentAction, AgentFinish, AgentStep, StopReason, Values};
use stepwise_core::tool::{Tool, ToolRegistry};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::parser_error::ParserErrorHandler;

/// Default number of plan calls per executor call.
pub const DEFAULT_MAX_ITERATIONS: u32 = 5;

/// Output of a forced stop.
pub const FORCED_STOP_MESSAGE: &str = "Agent stopped due to iteration limit or time limit.";

/// What to do when a budget runs out before the agent finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EarlyStopping {
    /// Fail with [`Error::NotFinished`].
    #[default]
    Raise,
    /// Return [`FORCED_STOP_MESSAGE`] as the output.
    Force,
    /// Return the most recent observation as the output.
    LastObservation,
}

impl From<EarlyStoppingConfig> for EarlyStopping {
    fn from(config: EarlyStoppingConfig) -> Self {
        match config {
            EarlyStoppingConfig::Raise => Self::Raise,
            EarlyStoppingConfig::Force => Self::Force,
            EarlyStoppingConfig::LastObservation => Self::LastObservation,
        }
    }
}

/// Loop budget and recovery policy.
#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// Maximum plan calls per executor call. `0` means unbounded.
    pub max_iterations: u32,
    /// Wall-clock budget per executor call. `None` or zero means unbounded.
    pub max_execution_time: Option<Duration>,
    /// When set, unparseable agent output becomes an observation instead of
    /// an error.
    pub parser_error_handler: Option<ParserErrorHandler>,
    pub early_stopping: EarlyStopping,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_execution_time: None,
            parser_error_handler: None,
            early_stopping: EarlyStopping::default(),
        }
    }
}

impl From<&ExecutorConfig> for ExecutorOptions {
    fn from(config: &ExecutorConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            max_execution_time: config.max_execution_time(),
            parser_error_handler: config
                .handle_parsing_errors
                .then(ParserErrorHandler::new),
            early_stopping: config.early_stopping.into(),
        }
    }
}

/// Everything a completed call produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub outputs: Values,
    /// Step history, in dispatch order.
    pub steps: Vec<AgentStep>,
    /// Number of plan calls made.
    pub iterations: u32,
    /// Set when the outputs came from an early-stopping fallback.
    pub stopped_early: Option<StopReason>,
}

/// Why a raced future did not complete.
enum Interrupt {
    Cancelled,
    Deadline,
}

/// Drives an [`Agent`] against a [`ToolRegistry`].
pub struct Executor {
    agent: Arc<dyn Agent>,
    tools: ToolRegistry,
    options: ExecutorOptions,
    memory: Option<Arc<dyn Memory>>,
    /// Serializes load → loop → save while memory is attached.
    session: tokio::sync::Mutex<()>,
}

impl Executor {
    pub fn new(agent: Arc<dyn Agent>, tools: Vec<Arc<dyn Tool>>) -> Self {
        Self {
            agent,
            tools: ToolRegistry::from_tools(tools),
            options: ExecutorOptions::default(),
            memory: None,
            session: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_options(mut self, options: ExecutorOptions) -> Self {
        self.options = options;
        self
    }

    /// `0` means unbounded.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.options.max_iterations = max;
        self
    }

    /// `Duration::ZERO` means unbounded.
    pub fn with_max_execution_time(mut self, limit: Duration) -> Self {
        self.options.max_execution_time = (!limit.is_zero()).then_some(limit);
        self
    }

    pub fn with_parser_error_handler(mut self, handler: ParserErrorHandler) -> Self {
        self.options.parser_error_handler = Some(handler);
        self
    }

    pub fn with_early_stopping(mut self, early_stopping: EarlyStopping) -> Self {
        self.options.early_stopping = early_stopping;
        self
    }

    pub fn with_memory(mut self, memory: Arc<dyn Memory>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn options(&self) -> &ExecutorOptions {
        &self.options
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn memory(&self) -> Option<&Arc<dyn Memory>> {
        self.memory.as_ref()
    }

    /// Input keys the caller supplies: the agent's, minus those memory provides.
    pub fn input_keys(&self) -> Vec<String> {
        let provided = self.memory_keys();
        self.agent
            .input_keys()
            .into_iter()
            .filter(|key| !provided.contains(key))
            .collect()
    }

    pub fn output_keys(&self) -> Vec<String> {
        self.agent.output_keys()
    }

    /// Run the loop and return only the outputs.
    pub async fn call(&self, inputs: Values) -> Result<Values> {
        let report = self.execute(inputs, &CancellationToken::new()).await?;
        Ok(report.outputs)
    }

    /// Single-input, single-output convenience over [`call`](Self::call).
    pub async fn run(&self, input: &str) -> Result<String> {
        let input_keys = self.input_keys();
        let [input_key] = input_keys.as_slice() else {
            return Err(Error::config(format!(
                "run() needs exactly one input key, agent expects {:?}",
                input_keys
            )));
        };
        let output_keys = self.output_keys();
        let [output_key] = output_keys.as_slice() else {
            return Err(Error::config(format!(
                "run() needs exactly one output key, agent produces {:?}",
                output_keys
            )));
        };

        let inputs = Values::from([(input_key.clone(), input.to_string())]);
        let mut outputs = self.call(inputs).await?;
        outputs
            .remove(output_key)
            .ok_or_else(|| Error::Internal(format!("agent finished without '{output_key}'")))
    }

    /// Run the loop until the agent finishes, a budget runs out, a fatal
    /// error occurs, or `cancel` fires.
    pub async fn execute(&self, inputs: Values, cancel: &CancellationToken) -> Result<ExecutionReport> {
        self.validate_inputs(&inputs)?;

        let _session = match &self.memory {
            Some(_) => Some(self.session.lock().await),
            None => None,
        };

        let run_id = Uuid::new_v4();
        let caller_inputs = inputs.clone();
        let inputs = match &self.memory {
            Some(memory) => memory.load_context(inputs).await?,
            None => inputs,
        };

        let deadline = self
            .options
            .max_execution_time
            .filter(|limit| !limit.is_zero())
            .map(|limit| Instant::now() + limit);
        let mut steps: Vec<AgentStep> = Vec::new();
        let mut iterations: u32 = 0;

        info!(
            %run_id,
            max_iterations = self.options.max_iterations,
            tools = self.tools.len(),
            "Executor loop starting"
        );

        while self.has_budget(iterations, deadline) {
            if cancel.is_cancelled() {
                info!(%run_id, iterations, "Executor cancelled");
                return Err(Error::Cancelled { steps });
            }

            iterations += 1;
            debug!(%run_id, iteration = iterations, steps = steps.len(), "Planning");

            let planned = match race(self.agent.plan(&steps, &inputs), cancel, deadline).await {
                Ok(planned) => planned,
                Err(Interrupt::Cancelled) => {
                    info!(%run_id, iterations, "Executor cancelled while planning");
                    return Err(Error::Cancelled { steps });
                }
                Err(Interrupt::Deadline) => break,
            };

            let actions = match planned {
                Ok(AgentDecision::Finish(finish)) => {
                    return self
                        .finish(run_id, finish, steps, iterations, &caller_inputs)
                        .await;
                }
                Ok(AgentDecision::Actions(actions)) if actions.is_empty() => {
                    return Err(Error::Agent {
                        source: AgentError::EmptyDecision,
                        steps,
                    });
                }
                Ok(AgentDecision::Actions(actions)) => actions,
                Err(err) => {
                    let handler = match &self.options.parser_error_handler {
                        Some(handler) if err.is_parse_error() => handler,
                        _ => return Err(Error::Agent { source: err, steps }),
                    };
                    warn!(%run_id, iteration = iterations, error = %err, "Recovering from unparseable agent output");
                    // The last iteration's observation would never be planned on.
                    if self.has_budget(iterations, deadline) {
                        steps.push(AgentStep::synthetic(handler.handle(&err)));
                    }
                    continue;
                }
            };

            for action in actions {
                let observation = match self.dispatch(&action, cancel, deadline).await {
                    Ok(observation) => observation,
                    Err(Dispatch::Interrupted(Interrupt::Cancelled)) => {
                        info!(%run_id, tool = %action.tool, "Executor cancelled during tool call");
                        return Err(Error::Cancelled { steps });
                    }
                    Err(Dispatch::Interrupted(Interrupt::Deadline)) => {
                        return self.stop_early(run_id, StopReason::TimeLimit, steps, iterations);
                    }
                    Err(Dispatch::Fatal(source)) => {
                        warn!(%run_id, tool = %action.tool, error = %source, "Fatal tool error");
                        return Err(Error::Tool { source, steps });
                    }
                };
                steps.push(AgentStep::new(action, observation));
            }
        }

        let reason = if deadline.is_some_and(|d| Instant::now() >= d) {
            StopReason::TimeLimit
        } else {
            StopReason::IterationLimit
        };
        self.stop_early(run_id, reason, steps, iterations)
    }

    fn has_budget(&self, iterations: u32, deadline: Option<Instant>) -> bool {
        let max = self.options.max_iterations;
        (max == 0 || iterations < max) && deadline.is_none_or(|d| Instant::now() < d)
    }

    fn memory_keys(&self) -> Vec<String> {
        self.memory
            .as_ref()
            .map(|memory| memory.memory_keys())
            .unwrap_or_default()
    }

    fn validate_inputs(&self, inputs: &Values) -> Result<()> {
        let expected: BTreeSet<String> = self.input_keys().into_iter().collect();

        let missing: Vec<&str> = expected
            .iter()
            .filter(|key| !inputs.contains_key(*key))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(Error::config(format!("missing input keys: {}", missing.join(", "))));
        }

        let unexpected: Vec<&str> = inputs
            .keys()
            .filter(|key| !expected.contains(*key))
            .map(String::as_str)
            .collect();
        if !unexpected.is_empty() {
            return Err(Error::config(format!(
                "unexpected input keys: {}",
                unexpected.join(", ")
            )));
        }

        Ok(())
    }

    /// Run one action. Recoverable problems become the observation.
    async fn dispatch(
        &self,
        action: &AgentAction,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> std::result::Result<String, Dispatch> {
        let Some(tool) = self.tools.get(&action.tool) else {
            warn!(tool = %action.tool, "Agent requested an unknown tool");
            return Ok(format!(
                "{} is not a valid tool, try one of [{}].",
                action.tool,
                self.tools.names().join(", ")
            ));
        };

        debug!(tool = %action.tool, input = %action.tool_input, "Dispatching tool");

        match race(tool.call(&action.tool_input), cancel, deadline).await {
            Err(interrupt) => Err(Dispatch::Interrupted(interrupt)),
            Ok(Ok(output)) => Ok(output),
            Ok(Err(err)) if err.is_fatal() => Err(Dispatch::Fatal(err)),
            Ok(Err(err)) => {
                warn!(tool = %action.tool, error = %err, "Tool execution failed");
                Ok(err.to_string())
            }
        }
    }

    async fn finish(
        &self,
        run_id: Uuid,
        finish: AgentFinish,
        steps: Vec<AgentStep>,
        iterations: u32,
        caller_inputs: &Values,
    ) -> Result<ExecutionReport> {
        if let Some(memory) = &self.memory {
            memory
                .save_context(caller_inputs, &finish.return_values)
                .await?;
        }

        info!(%run_id, iterations, steps = steps.len(), "Executor finished");

        Ok(ExecutionReport {
            outputs: finish.return_values,
            steps,
            iterations,
            stopped_early: None,
        })
    }

    fn stop_early(
        &self,
        run_id: Uuid,
        reason: StopReason,
        steps: Vec<AgentStep>,
        iterations: u32,
    ) -> Result<ExecutionReport> {
        warn!(%run_id, %reason, iterations, "Agent did not finish");

        let output = match self.options.early_stopping {
            EarlyStopping::Raise => return Err(Error::NotFinished { reason, steps }),
            EarlyStopping::Force => FORCED_STOP_MESSAGE.to_string(),
            EarlyStopping::LastObservation => steps
                .last()
                .map(|step| step.observation.clone())
                .unwrap_or_else(|| FORCED_STOP_MESSAGE.to_string()),
        };

        let key = self
            .agent
            .output_keys()
            .into_iter()
            .next()
            .unwrap_or_else(|| "output".to_string());

        Ok(ExecutionReport {
            outputs: Values::from([(key, output)]),
            steps,
            iterations,
            stopped_early: Some(reason),
        })
    }
}

enum Dispatch {
    Interrupted(Interrupt),
    Fatal(ToolError),
}

/// Race `fut` against cancellation and the deadline. Losing drops `fut`.
async fn race<F: Future>(
    fut: F,
    cancel: &CancellationToken,
    deadline: Option<Instant>,
) -> std::result::Result<F::Output, Interrupt> {
    let expiry = async {
        match deadline {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Interrupt::Cancelled),
        _ = expiry => Err(Interrupt::Deadline),
        out = fut => Ok(out),
    }
}
