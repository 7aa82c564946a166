use crate::llm::{CompletionParams, LlmClient, Message};
use anyhow::{Context, Result};
use lyra_core::config::LlmConfig;
use reqwest::Client;
use serde_json::{json, Value};
use std::env;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat completions client for OpenAI-compatible endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(model: &str, base_url: Option<&str>, timeout: Duration) -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());
        let base_url = base_url
            .map(str::to_string)
            .or_else(|| env::var("OPENAI_BASE_URL").ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .context("Failed to build HTTP client")?,
            api_key,
            base_url,
            model: model.to_string(),
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Self::new(
            &config.model,
            config.base_url.as_deref(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn payload(&self, messages: &[Message], params: &CompletionParams) -> Value {
        json!({
            "model": self.model,
            "messages": messages,
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
        })
    }
}

/// Extract the first choice's text from a chat completions response.
fn parse_completion(body: &Value) -> Result<String> {
    let content = body["choices"][0]["message"]["content"]
        .as_str()
        .context("OpenAI response has no message content")?;
    Ok(content.trim().to_string())
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, messages: Vec<Message>, params: CompletionParams) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .context("OPENAI_API_KEY is not set")?;

        let url = format!("{}/chat/completions", self.base_url);
        tracing::debug!(model = %self.model, "Sending chat completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&self.payload(&messages, &params))
            .send()
            .await
            .context("Failed to send request to OpenAI")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI API Error ({}): {}", status, error_text);
        }

        let body: Value = response
            .json()
            .await
            .context("Failed to decode OpenAI response")?;
        parse_completion(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OpenAiClient {
        OpenAiClient::new("gpt-test", Some("http://localhost:1/v1/"), Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn test_base_url_trimmed() {
        assert_eq!(client().base_url(), "http://localhost:1/v1");
        assert_eq!(client().model(), "gpt-test");
    }

    #[test]
    fn test_payload_shape() {
        let payload = client().payload(&[Message::user("hi")], &CompletionParams::default());
        assert_eq!(payload["model"], "gpt-test");
        assert_eq!(payload["messages"][0]["role"], "user");
        assert_eq!(payload["messages"][0]["content"], "hi");
        assert_eq!(payload["max_tokens"], 150);
        assert!((payload["temperature"].as_f64().unwrap() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_parse_completion() {
        let body = json!({
            "choices": [{"message": {"role": "assistant", "content": "  a quiet answer \n"}}]
        });
        assert_eq!(parse_completion(&body).unwrap(), "a quiet answer");
        assert!(parse_completion(&json!({"choices": []})).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_error() {
        let mut c = client();
        c.api_key = Some("sk-test".into());
        let result = c
            .complete(vec![Message::user("hi")], CompletionParams::default())
            .await;
        assert!(result.is_err());
    }
}
