pub mod mock;
pub mod openai;

pub use mock::MockProvider;
pub use openai::OpenAiClient;

use crate::llm::LlmClient;
use anyhow::{bail, Result};
use lyra_core::config::LlmConfig;
use std::sync::Arc;

/// Build the client named by `config.provider`.
pub fn from_config(config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    let client: Arc<dyn LlmClient> = match config.provider.as_str() {
        "openai" => Arc::new(OpenAiClient::from_config(config)?),
        "mock" => Arc::new(MockProvider::new(&config.model)),
        other => bail!("Unknown LLM provider: {}", other),
    };
    tracing::info!(provider = %config.provider, model = %config.model, "LLM client ready");
    Ok(client)
}
