//! OpenRouter chat completions (OpenAI-compatible API).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use url::Url;

use super::TextGenerator;
use crate::error::AiError;

const SERVICE: &str = "openrouter";

pub struct OpenRouter {
    http_client: Client,
    endpoint: Url,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenRouter {
    /// `base_url` is the API root, e.g. `https://openrouter.ai/api/v1`.
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, AiError> {
        let endpoint = Url::parse(&format!("{}/chat/completions", base_url.trim_end_matches('/')))?;
        Ok(Self {
            http_client: Client::new(),
            endpoint,
            api_key: api_key.into(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl TextGenerator for OpenRouter {
    async fn generate(&self, persona: &str, prompt: &str) -> Result<String, AiError> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": persona },
                { "role": "user", "content": prompt },
            ],
        });

        let resp = self
            .http_client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AiError::Status {
                service: SERVICE,
                status: status.as_u16(),
                body,
            });
        }

        let completion: CompletionResponse = resp.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(AiError::MissingField {
                service: SERVICE,
                field: "choices[0].message.content",
            })?;
        debug!(model = %self.model, chars = content.chars().count(), "completion received");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn sends_persona_and_prompt() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer key-1")
            .match_body(Matcher::PartialJson(json!({
                "model": "m",
                "messages": [
                    { "role": "system", "content": "персона" },
                    { "role": "user", "content": "вопрос" },
                ],
            })))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"ответ"}}]}"#)
            .create_async()
            .await;

        let client = OpenRouter::new(&server.url(), "key-1", "m").unwrap();
        let text = client.generate("персона", "вопрос").await.unwrap();
        assert_eq!(text, "ответ");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn http_error_carries_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body("rate limited")
            .create_async()
            .await;

        let client = OpenRouter::new(&server.url(), "k", "m").unwrap();
        let err = client.generate("p", "q").await.unwrap_err();
        assert!(matches!(err, AiError::Status { status: 429, .. }));
    }

    #[tokio::test]
    async fn empty_choices_is_missing_field() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let client = OpenRouter::new(&server.url(), "k", "m").unwrap();
        let err = client.generate("p", "q").await.unwrap_err();
        assert!(matches!(err, AiError::MissingField { .. }));
    }
}
