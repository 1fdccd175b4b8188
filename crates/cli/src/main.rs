//! Stepwise CLI, the main entry point.
//!
//! Commands:
//! - `run`     Answer one question and exit
//! - `chat`    Interactive conversation with memory
//! - `tools`   List the tools that can be enabled
//! - `config`  Show, initialize or validate configuration

use clap::{Parser, Subcommand, ValueEnum};
use stepwise_config::AgentKind;

mod commands;

#[derive(Parser)]
#[command(
    name = "stepwise",
    about = "Stepwise: a bounded Plan-Act-Observe agent executor",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a single question
    Run {
        /// The question
        message: String,

        /// Override the configured agent
        #[arg(short, long, value_enum)]
        agent: Option<AgentArg>,

        /// Override the iteration budget (0 = unbounded)
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Override the wall-clock budget, in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Print the step history as JSON after the answer
        #[arg(long)]
        trace: bool,
    },

    /// Chat interactively; earlier turns are remembered
    Chat {
        /// Override the configured agent
        #[arg(short, long, value_enum)]
        agent: Option<AgentArg>,
    },

    /// List available tools
    Tools,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Check the configuration for problems
    Validate,
}

#[derive(Clone, Copy, ValueEnum)]
enum AgentArg {
    ZeroShot,
    Conversational,
    RuleBased,
}

impl From<AgentArg> for AgentKind {
    fn from(arg: AgentArg) -> Self {
        match arg {
            AgentArg::ZeroShot => AgentKind::ZeroShot,
            AgentArg::Conversational => AgentKind::Conversational,
            AgentArg::RuleBased => AgentKind::RuleBased,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            message,
            agent,
            max_iterations,
            timeout,
            trace,
        } => {
            let overrides = commands::Overrides {
                agent: agent.map(Into::into),
                max_iterations,
                timeout_secs: timeout,
            };
            commands::run::run(&message, overrides, trace).await?
        }
        Commands::Chat { agent } => {
            let overrides = commands::Overrides {
                agent: agent.map(Into::into),
                ..Default::default()
            };
            commands::chat::run(overrides).await?
        }
        Commands::Tools => commands::tools::run()?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show()?,
            ConfigAction::Init { force } => commands::config_cmd::init(force)?,
            ConfigAction::Validate => commands::config_cmd::validate()?,
        },
    }

    Ok(())
}
