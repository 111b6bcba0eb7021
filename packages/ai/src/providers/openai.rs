//! `OpenAI` chat-completions provider implementation.

use serde::{Deserialize, Serialize};

use super::{GenerationSettings, TextGenerator, join_parts, read_success_body};
use crate::AiError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// `OpenAI` API provider.
///
/// Also works against any `OpenAI`-compatible server (Ollama, vLLM,
/// llama.cpp) via [`OpenAiProvider::with_base_url`].
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    settings: GenerationSettings,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Creates a new `OpenAI` provider.
    #[must_use]
    pub fn new(api_key: String, model: String, settings: GenerationSettings) -> Self {
        Self {
            api_key,
            model,
            settings,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Points the provider at a different API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiError {
    error: OpenAiErrorDetail,
}

#[derive(Deserialize)]
struct OpenAiErrorDetail {
    message: String,
}

fn build_request<'a>(
    model: &'a str,
    parts: &[String],
    settings: &GenerationSettings,
) -> OpenAiRequest<'a> {
    OpenAiRequest {
        model,
        messages: vec![OpenAiMessage {
            role: "user",
            content: join_parts(parts),
        }],
        temperature: settings.temperature,
        top_p: settings.top_p,
        max_tokens: settings.max_output_tokens,
    }
}

/// Returns the content of the first choice. A choice with `null` content
/// is an empty answer; a response with no choices is an error.
fn response_text(response: OpenAiResponse) -> Result<String, AiError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AiError::Provider {
            message: "No choices in OpenAI response".to_string(),
        })?;

    Ok(choice.message.content.unwrap_or_default())
}

#[async_trait::async_trait]
impl TextGenerator for OpenAiProvider {
    async fn generate(&self, parts: &[String]) -> Result<String, AiError> {
        let request = build_request(&self.model, parts, &self.settings);

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let body = read_success_body(resp, |body| {
            serde_json::from_str::<OpenAiError>(body)
                .ok()
                .map(|e| e.error.message)
        })
        .await?;

        let response: OpenAiResponse = serde_json::from_str(&body)?;
        response_text(response)
    }
}
