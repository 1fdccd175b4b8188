//! `stepwise config`: configuration management commands.

use stepwise_config::{AgentKind, AppConfig};

pub fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    // Debug output redacts the key.
    println!("{config:#?}");
    Ok(())
}

pub fn init(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let dir = AppConfig::config_dir();
    let path = dir.join("config.toml");
    if path.exists() && !force {
        return Err(format!("{} already exists (use --force to overwrite)", path.display()).into());
    }
    std::fs::create_dir_all(&dir)?;
    std::fs::write(&path, AppConfig::default_toml())?;
    println!("Wrote {}", path.display());
    Ok(())
}

pub fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   Config parsed successfully");

            let mut warnings = Vec::new();
            if !config.has_api_key() && config.agent != AgentKind::RuleBased {
                warnings.push("No API key set (set STEPWISE_API_KEY or OPENAI_API_KEY)");
            }
            if config.executor.max_iterations == 0 && config.executor.max_execution_time_secs == 0 {
                warnings.push("Neither an iteration nor a time budget is set; a looping agent never stops");
            }

            if warnings.is_empty() {
                println!("   All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   warning: {w}");
                }
            }

            println!();
            println!("   Agent:      {:?}", config.agent);
            println!("   Model:      {}", config.default_model);
            println!("   Tools:      {}", config.tools.join(", "));
            println!("   Iterations: {}", config.executor.max_iterations);
            Ok(())
        }
        Err(e) => {
            println!("   Config error: {e}");
            Err(e.into())
        }
    }
}
