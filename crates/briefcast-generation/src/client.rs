//! Minimal chat-completions HTTP client.
//!
//! One struct covers both wire dialects the pipeline talks to:
//! Anthropic-style messages (generation) and OpenAI-style chat
//! completions (research). They differ only in request body shape,
//! auth header, and where the reply text lives.

use std::time::Duration;

use serde_json::{Value, json};

use briefcast_core::Result;
use briefcast_core::error::BriefcastError;

/// Wire dialect for the messages endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Anthropic messages API: `x-api-key` header, top-level `system`,
    /// reply under `content[0].text`.
    AnthropicMessages,
    /// OpenAI chat completions: Bearer auth, system as first message,
    /// reply under `choices[0].message.content`.
    OpenAiChat,
}

pub struct ChatClient {
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    timeout: Duration,
    dialect: Dialect,
    client: reqwest::Client,
}

impl ChatClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
        timeout: Duration,
        dialect: Dialect,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens,
            timeout,
            dialect,
            client: reqwest::Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one user turn (with an optional system prompt) and return the
    /// reply text. Timeouts and malformed replies both surface as
    /// `Parse` — they are subject to the same retry policy upstream.
    pub async fn chat(&self, system: Option<&str>, user: &str) -> Result<String> {
        let body = self.build_body(system, user);

        let mut req = self.client.post(&self.endpoint).json(&body);
        req = match self.dialect {
            Dialect::AnthropicMessages => req
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01"),
            Dialect::OpenAiChat => req.header("Authorization", format!("Bearer {}", self.api_key)),
        };

        let response = tokio::time::timeout(self.timeout, req.send())
            .await
            .map_err(|_| {
                BriefcastError::parse(format!("Call to {} timed out", self.endpoint))
            })??;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(BriefcastError::parse(format!(
                "Model endpoint returned {status}: {}",
                briefcast_core::types::truncate_chars(&text, 200)
            )));
        }

        let payload: Value = response.json().await?;
        self.extract_text(&payload)
    }

    fn build_body(&self, system: Option<&str>, user: &str) -> Value {
        match self.dialect {
            Dialect::AnthropicMessages => {
                let mut body = json!({
                    "model": self.model,
                    "max_tokens": self.max_tokens,
                    "messages": [{"role": "user", "content": user}],
                });
                if let Some(system) = system {
                    body["system"] = json!(system);
                }
                body
            }
            Dialect::OpenAiChat => {
                let mut messages = Vec::new();
                if let Some(system) = system {
                    messages.push(json!({"role": "system", "content": system}));
                }
                messages.push(json!({"role": "user", "content": user}));
                json!({
                    "model": self.model,
                    "messages": messages,
                })
            }
        }
    }

    fn extract_text(&self, payload: &Value) -> Result<String> {
        let text = match self.dialect {
            Dialect::AnthropicMessages => payload["content"][0]["text"].as_str(),
            Dialect::OpenAiChat => payload["choices"][0]["message"]["content"].as_str(),
        };
        text.map(String::from)
            .ok_or_else(|| BriefcastError::parse("Reply missing text content"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(dialect: Dialect) -> ChatClient {
        ChatClient::new(
            "https://example.invalid/v1",
            "key",
            "test-model",
            100,
            Duration::from_secs(5),
            dialect,
        )
    }

    #[test]
    fn test_anthropic_body_shape() {
        let body = client(Dialect::AnthropicMessages).build_body(Some("sys"), "hello");
        assert_eq!(body["system"], "sys");
        assert_eq!(body["max_tokens"], 100);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn test_openai_body_shape() {
        let body = client(Dialect::OpenAiChat).build_body(Some("sys"), "hello");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hello");
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn test_extract_text_per_dialect() {
        let anthropic = serde_json::json!({"content": [{"type": "text", "text": "hi"}]});
        assert_eq!(
            client(Dialect::AnthropicMessages)
                .extract_text(&anthropic)
                .unwrap(),
            "hi"
        );

        let openai = serde_json::json!({"choices": [{"message": {"content": "yo"}}]});
        assert_eq!(
            client(Dialect::OpenAiChat).extract_text(&openai).unwrap(),
            "yo"
        );

        assert!(
            client(Dialect::OpenAiChat)
                .extract_text(&anthropic)
                .is_err()
        );
    }
}
