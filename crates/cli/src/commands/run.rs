//! `stepwise run`: answer one question and exit.

use stepwise_agent::CancellationToken;
use stepwise_core::Error;
use stepwise_core::schema::Values;

use super::{Overrides, load_executor};

pub async fn run(message: &str, overrides: Overrides, trace: bool) -> Result<(), Box<dyn std::error::Error>> {
    let (_config, executor) = load_executor(overrides)?;

    let [input_key] = executor.input_keys().try_into().map_err(|keys: Vec<String>| {
        format!("agent expects several inputs ({}); use `chat` instead", keys.join(", "))
    })?;
    let inputs = Values::from([(input_key, message.to_string())]);

    // Ctrl+C cancels the running call.
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    match executor.execute(inputs, &cancel).await {
        Ok(report) => {
            for value in report.outputs.values() {
                println!("{value}");
            }
            if trace {
                eprintln!("{}", serde_json::to_string_pretty(&report.steps)?);
            }
            Ok(())
        }
        Err(err) => {
            if trace {
                if let Some(steps) = err.steps() {
                    eprintln!("{}", serde_json::to_string_pretty(steps)?);
                }
            }
            if matches!(err, Error::NotFinished { .. }) {
                eprintln!("  Hint: raise --max-iterations or --timeout.");
            }
            Err(err.into())
        }
    }
}
