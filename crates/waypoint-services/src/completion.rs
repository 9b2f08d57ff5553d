use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::instrument;
use waypoint_core::{CompletionProvider, ServiceError};
use waypoint_settings::CompletionSettings;

/// OpenAI-compatible chat completion endpoint that also takes a `provider` field.
pub struct ChatCompletionProvider {
    client: Client,
    url: String,
    provider: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    provider: &'a str,
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl ChatCompletionProvider {
    pub fn new(
        base_url: &str,
        provider: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            provider: provider.into(),
            model: model.into(),
        }
    }

    pub fn from_settings(settings: &CompletionSettings) -> Self {
        Self::new(
            &settings.base_url,
            settings.provider.clone(),
            settings.model.clone(),
            Duration::from_secs(settings.timeout_secs),
        )
    }
}

#[async_trait]
impl CompletionProvider for ChatCompletionProvider {
    fn name(&self) -> &str {
        &self.provider
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, prompt), fields(model = %self.model))]
    async fn complete(&self, prompt: &str) -> Result<String, ServiceError> {
        let body = ChatRequest {
            provider: &self.provider,
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::from_status(status.as_u16(), body));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ServiceError::Malformed(e.to_string()))?;
        first_choice_content(&body)
    }
}

/// Extract `choices[0].message.content`.
fn first_choice_content(body: &serde_json::Value) -> Result<String, ServiceError> {
    body.pointer("/choices/0/message/content")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .ok_or(ServiceError::MissingField("choices[0].message.content"))
}
