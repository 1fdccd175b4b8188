//! LLM backend implementations for Stepwise.
//!
//! All backends implement the `stepwise_core::Llm` trait.

pub mod openai_compat;

use std::sync::Arc;

use stepwise_config::AppConfig;
use stepwise_core::error::ProviderError;
use stepwise_core::llm::Llm;

pub use openai_compat::OpenAiCompatLlm;

/// Build the configured backend.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Llm>, ProviderError> {
    let api_key = config.api_key.clone().ok_or_else(|| {
        ProviderError::NotConfigured(format!("no API key for '{}'", config.default_provider))
    })?;

    let llm = OpenAiCompatLlm::new(
        &config.default_provider,
        &config.api_url,
        api_key,
        &config.default_model,
    )?
    .with_temperature(config.default_temperature);

    Ok(Arc::new(llm))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_not_configured() {
        let err = build_from_config(&AppConfig::default()).err().unwrap();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn builds_backend_from_config() {
        let config = AppConfig {
            api_key: Some("sk-test".into()),
            default_model: "gpt-4o".into(),
            ..AppConfig::default()
        };
        let llm = build_from_config(&config).unwrap();
        assert_eq!(llm.name(), "openai");
        assert_eq!(llm.model(), "gpt-4o");
        assert!(llm.is_chat());
    }
}
