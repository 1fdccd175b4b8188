//! End-to-end integration tests for the Stepwise executor.
//!
//! These tests exercise the full pipeline from user input to agent output:
//! prompt selection, model output parsing, tool dispatch, memory, and the
//! loop budget, with a scripted model standing in for the network.

use std::sync::{Arc, Mutex};

use stepwise_agent::{
    AgentType, CancellationToken, ExecutorOptions, ParserErrorHandler, from_config, initialize,
};
use stepwise_config::{AgentKind, AppConfig};
use stepwise_core::error::{ProviderError, ToolError};
use stepwise_core::{Error, Llm, StopReason, Tool, Values};
use stepwise_memory::ConversationBuffer;
use stepwise_tools::{CalculatorTool, SearchEngine, ToolCatalog, WebSearchTool};

// ── Mock Model ───────────────────────────────────────────────────────────

/// A mock model that returns scripted completions in sequence.
struct ScriptedLlm {
    responses: Vec<String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    fn new(responses: &[&str]) -> Self {
        Self {
            responses: responses.iter().map(|r| r.to_string()).collect(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    fn prompt(&self, n: usize) -> String {
        self.prompts.lock().unwrap()[n].clone()
    }
}

#[async_trait::async_trait]
impl Llm for ScriptedLlm {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    fn model(&self) -> &str {
        "e2e-model"
    }

    async fn complete(&self, prompt: &str, stop: &[String]) -> Result<String, ProviderError> {
        assert!(stop.iter().any(|s| s == "\nObservation:"));
        let mut prompts = self.prompts.lock().unwrap();
        let n = prompts.len();
        prompts.push(prompt.to_string());
        self.responses
            .get(n)
            .cloned()
            .ok_or_else(|| ProviderError::ApiError {
                status_code: 500,
                message: format!("no scripted response #{n}"),
            })
    }
}

/// Offline search results.
struct CannedSearch;

#[async_trait::async_trait]
impl SearchEngine for CannedSearch {
    async fn search(&self, query: &str, _max_results: usize) -> Result<String, ToolError> {
        Ok(format!(
            "The Rust Programming Language\nhttps://doc.rust-lang.org/book/\nResults for {query}"
        ))
    }
}

fn tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(CalculatorTool),
        Arc::new(WebSearchTool::new(Arc::new(CannedSearch))),
    ]
}

fn input(text: &str) -> Values {
    Values::from([("input".to_string(), text.to_string())])
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn conversation_remembers_birth_year() {
    let llm = Arc::new(ScriptedLlm::new(&[
        " Do I need to use a tool? No\nAI: Nice to meet you, Bob!",
        " Do I need to use a tool? Yes\nAction: calculator\nAction Input: 1987*34",
        " Do I need to use a tool? No\nAI: 1987 times 34 is 67558.",
    ]));
    let memory = Arc::new(ConversationBuffer::new());
    let executor = initialize(
        llm.clone(),
        tools(),
        AgentType::ConversationalReactDescription,
        ExecutorOptions::default(),
    )
    .with_memory(memory.clone());

    let first = executor
        .run("Hi! my name is Bob and the year I was born is 1987")
        .await
        .unwrap();
    assert_eq!(first, "Nice to meet you, Bob!");

    let second = executor
        .run("What is the year I was born times 34")
        .await
        .unwrap();
    assert!(second.contains("67558"));

    // The second question was asked with the first exchange as history.
    assert!(
        llm.prompt(1)
            .contains("Human: Hi! my name is Bob and the year I was born is 1987\nAI: Nice to meet you, Bob!")
    );
    // And the follow-up plan saw the calculator's observation.
    assert!(llm.prompt(2).contains("Observation: 67558\nThought:"));
    assert_eq!(memory.turns().await.len(), 2);
}

#[tokio::test]
async fn unparseable_model_output_is_recovered() {
    let llm = Arc::new(ScriptedLlm::new(&[
        " I think the answer is four.",
        " I now know the final answer\nFinal Answer: 4",
    ]));
    let executor = initialize(
        llm.clone(),
        tools(),
        AgentType::ZeroShotReactDescription,
        ExecutorOptions::default(),
    )
    .with_parser_error_handler(ParserErrorHandler::with_formatter(|msg| {
        format!("Invalid format: {msg}")
    }));

    let report = executor
        .execute(input("What is 2 + 2?"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.outputs["output"], "4");
    assert_eq!(report.iterations, 2);
    assert_eq!(report.steps.len(), 1);
    assert!(report.steps[0].action.is_empty());
    assert!(
        llm.prompt(1)
            .contains("Observation: Invalid format: unable to parse agent output:  I think the answer is four.")
    );
}

#[tokio::test]
async fn hallucinated_tool_is_reported_back() {
    let llm = Arc::new(ScriptedLlm::new(&[
        "Action: wikipedia\nAction Input: Rust",
        "Final Answer: Rust is a programming language.",
    ]));
    let executor = initialize(
        llm.clone(),
        tools(),
        AgentType::ZeroShotReactDescription,
        ExecutorOptions::default(),
    );

    let report = executor
        .execute(input("What is Rust?"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        report.steps[0].observation,
        "wikipedia is not a valid tool, try one of [calculator, web_search]."
    );
    assert_eq!(llm.calls(), 2);
}

#[tokio::test]
async fn looping_model_hits_iteration_limit() {
    let step = "Action: calculator\nAction Input: 1+1";
    let llm = Arc::new(ScriptedLlm::new(&[step, step, step, step]));
    let executor = initialize(
        llm.clone(),
        tools(),
        AgentType::ZeroShotReactDescription,
        ExecutorOptions {
            max_iterations: 3,
            ..Default::default()
        },
    );

    let err = executor.run("Add forever").await.unwrap_err();
    match err {
        Error::NotFinished { reason, steps } => {
            assert_eq!(reason, StopReason::IterationLimit);
            assert_eq!(steps.len(), 3);
        }
        other => panic!("expected iteration limit, got {other:?}"),
    }
    assert_eq!(llm.calls(), 3);
}

#[tokio::test]
async fn rule_based_config_runs_offline() {
    let config = AppConfig {
        agent: AgentKind::RuleBased,
        ..Default::default()
    };
    let mut catalog = ToolCatalog::from_config(&config);
    catalog.add("web_search", || Arc::new(WebSearchTool::new(Arc::new(CannedSearch))));
    let tools = catalog.build(&config.tools).unwrap();
    let executor = from_config(&config, None, tools).unwrap();

    assert_eq!(executor.run("What is 1987*34?").await.unwrap(), "67558");

    let search = executor.run("search rust ownership").await.unwrap();
    assert!(search.contains("The Rust Programming Language"));
}

#[tokio::test]
async fn provider_failure_is_fatal_with_history() {
    let llm = Arc::new(ScriptedLlm::new(&["Action: calculator\nAction Input: 6*7"]));
    let executor = initialize(
        llm,
        tools(),
        AgentType::ZeroShotReactDescription,
        ExecutorOptions::default(),
    );

    let err = executor.run("What is 6*7?").await.unwrap_err();
    assert!(matches!(err, Error::Agent { .. }));
    let steps = err.steps().unwrap();
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].observation, "42");
}
