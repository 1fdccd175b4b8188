//! The Stepwise execution loop and its stock agents.
//!
//! An [`Executor`] follows a **Plan → Act → Observe** cycle:
//!
//! 1. **Plan**: the agent looks at every step so far and either requests
//!    tool calls or finishes
//! 2. **Act**: each requested tool runs; unknown tools and recoverable
//!    failures become observations
//! 3. **Observe**: `(action, observation)` joins the step history and the
//!    agent plans again
//!
//! The cycle is bounded by an iteration budget and an optional wall-clock
//! deadline, and can be cancelled from outside.

pub mod executor;
pub mod initialize;
pub mod parser_error;
pub mod patterns;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use executor::{
    DEFAULT_MAX_ITERATIONS, EarlyStopping, ExecutionReport, Executor, ExecutorOptions,
    FORCED_STOP_MESSAGE,
};
pub use initialize::{AgentType, from_config, initialize};
pub use parser_error::ParserErrorHandler;
pub use patterns::{ReactAgent, ReactStyle, Rule, RuleBasedAgent};
pub use tokio_util::sync::CancellationToken;
