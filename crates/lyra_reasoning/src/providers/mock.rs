//! Mock LLM provider: deterministic responses for testing without API keys.

use crate::llm::{CompletionParams, LlmClient, Message, Role};
use anyhow::Result;

#[derive(Debug, Clone)]
pub struct MockProvider {
    model: String,
}

impl MockProvider {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for MockProvider {
    async fn complete(&self, messages: Vec<Message>, _params: CompletionParams) -> Result<String> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        Ok(format!("(Mock {} Response) I received: {}", self.model, last_user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_complete() {
        let provider = MockProvider::new("test-model");
        let text = provider
            .complete(vec![Message::user("hello")], CompletionParams::default())
            .await
            .unwrap();
        assert!(text.contains("Mock"));
        assert!(text.contains("test-model"));
        assert!(text.ends_with("I received: hello"));
    }

    #[tokio::test]
    async fn test_mock_is_deterministic() {
        let provider = MockProvider::new("m");
        let a = provider
            .complete(vec![Message::user("same")], CompletionParams::default())
            .await
            .unwrap();
        let b = provider
            .complete(vec![Message::user("same")], CompletionParams::default())
            .await
            .unwrap();
        assert_eq!(a, b);
    }
}
