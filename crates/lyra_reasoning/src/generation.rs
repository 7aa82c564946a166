//! Generation bridge: turns an LLM completion into a scalar amplitude.
//!
//! The amplitude grows with the reply length, `min(chars / 200, 1)`, and feeds
//! the memory and the resonance accumulator under the name `autogenesis`.

use crate::llm::{CompletionParams, LlmClient, Message};
use async_trait::async_trait;
use lyra_core::config::LlmConfig;
use lyra_core::Generator;
use std::sync::Arc;

/// Reply length, in characters, that saturates the amplitude.
const FULL_AMPLITUDE_CHARS: f64 = 200.0;

pub struct GenerationBridge {
    client: Arc<dyn LlmClient>,
    params: CompletionParams,
    amplitude: f64,
    last_text: Option<String>,
}

impl GenerationBridge {
    pub fn new(client: Arc<dyn LlmClient>, params: CompletionParams) -> Self {
        Self {
            client,
            params,
            amplitude: 0.0,
            last_text: None,
        }
    }

    pub fn from_config(client: Arc<dyn LlmClient>, config: &LlmConfig) -> Self {
        Self::new(
            client,
            CompletionParams {
                max_tokens: config.max_tokens,
                temperature: config.temperature,
            },
        )
    }
}

#[async_trait]
impl Generator for GenerationBridge {
    async fn prompt(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        match self
            .client
            .complete(vec![Message::user(text)], self.params.clone())
            .await
        {
            Ok(reply) => {
                let reply = reply.trim().to_string();
                self.amplitude = (reply.chars().count() as f64 / FULL_AMPLITUDE_CHARS).min(1.0);
                tracing::debug!(amplitude = self.amplitude, "generation complete");
                self.last_text = Some(reply);
            }
            Err(e) => {
                tracing::warn!("Generation failed: {:#}", e);
                self.last_text = Some(format!("[GenerationError] {:#}", e));
            }
        }
    }

    fn amplitude(&self) -> f64 {
        self.amplitude
    }

    fn last_text(&self) -> Option<&str> {
        self.last_text.as_deref()
    }

    fn reset(&mut self) {
        self.amplitude = 0.0;
        self.last_text = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        reply: Option<String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmClient for Scripted {
        async fn complete(&self, _m: Vec<Message>, _p: CompletionParams) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Some(r) => Ok(r.clone()),
                None => anyhow::bail!("connection refused"),
            }
        }
    }

    fn bridge(reply: Option<&str>) -> (GenerationBridge, Arc<Scripted>) {
        let client = Arc::new(Scripted {
            reply: reply.map(str::to_string),
            calls: AtomicUsize::new(0),
        });
        (
            GenerationBridge::new(client.clone(), CompletionParams::default()),
            client,
        )
    }

    #[tokio::test]
    async fn test_amplitude_from_length() {
        let (mut g, _) = bridge(Some(&"a".repeat(50)));
        g.prompt("hi").await;
        assert!((g.amplitude() - 0.25).abs() < 1e-12);
        assert_eq!(g.last_text().map(str::len), Some(50));
    }

    #[tokio::test]
    async fn test_amplitude_saturates() {
        let (mut g, _) = bridge(Some(&"é".repeat(500)));
        g.prompt("hi").await;
        assert_eq!(g.amplitude(), 1.0);
    }

    #[tokio::test]
    async fn test_blank_prompt_is_noop() {
        let (mut g, client) = bridge(Some("reply"));
        g.prompt("   ").await;
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
        assert!(g.last_text().is_none());
    }

    #[tokio::test]
    async fn test_failure_keeps_amplitude() {
        let (mut ok, _) = bridge(Some(&"x".repeat(100)));
        ok.prompt("first").await;
        let (mut g, _) = bridge(None);
        g.amplitude = ok.amplitude();
        g.prompt("second").await;

        assert_eq!(g.amplitude(), 0.5);
        let text = g.last_text().unwrap();
        assert!(text.starts_with("[GenerationError]"));
        assert!(text.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_reset() {
        let (mut g, _) = bridge(Some("something"));
        g.prompt("hi").await;
        g.reset();
        assert_eq!(g.amplitude(), 0.0);
        assert!(g.last_text().is_none());
    }
}
