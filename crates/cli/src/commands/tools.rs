//! `stepwise tools`: list the tools that can be enabled in config.

use stepwise_config::AppConfig;
use stepwise_core::Tool;
use stepwise_tools::ToolCatalog;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().unwrap_or_default();
    let catalog = ToolCatalog::from_config(&config);

    println!();
    for name in catalog.names() {
        let mark = if config.tools.iter().any(|n| n == name) { "*" } else { " " };
        match catalog.build(&[name.to_string()]) {
            Ok(tools) => {
                for tool in tools {
                    println!("  {mark} {:<12} {}", tool.name(), tool.description());
                }
            }
            Err(e) => println!("  {mark} {name:<12} (unavailable: {e})"),
        }
    }
    println!();
    println!("  (* = enabled in config)");
    Ok(())
}
