//! Anthropic Claude provider implementation.

use serde::{Deserialize, Serialize};

use super::{GenerationSettings, TextGenerator, join_parts, read_success_body};
use crate::AiError;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Anthropic Claude API provider.
pub struct AnthropicProvider {
    api_key: String,
    model: String,
    settings: GenerationSettings,
    base_url: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Creates a new Anthropic provider.
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

/// Anthropic API request body.
#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<AnthropicMessage>,
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: String,
}

/// Anthropic API response body.
#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

/// Anthropic API error response.
#[derive(Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

#[derive(Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

/// Concatenates every text block, skipping other block types.
fn response_text(response: AnthropicResponse) -> String {
    response
        .content
        .into_iter()
        .filter_map(|block| match block {
            AnthropicContentBlock::Text { text } => Some(text),
            AnthropicContentBlock::Other => None,
        })
        .collect()
}

#[async_trait::async_trait]
impl TextGenerator for AnthropicProvider {
    async fn generate(&self, parts: &[String]) -> Result<String, AiError> {
        let request = AnthropicRequest {
            model: &self.model,
            max_tokens: self.settings.max_output_tokens,
            temperature: self.settings.temperature,
            messages: vec![AnthropicMessage {
                role: "user",
                content: join_parts(parts),
            }],
        };

        let resp = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        let body = read_success_body(resp, |body| {
            serde_json::from_str::<AnthropicError>(body)
                .ok()
                .map(|e| e.error.message)
        })
        .await?;

        let response: AnthropicResponse = serde_json::from_str(&body)?;
        Ok(response_text(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_non_text_blocks() {
        let response: AnthropicResponse = serde_json::from_str(
            r#"{"content":[{"type":"thinking","thinking":"..."},{"type":"text","text":"Leo | 3"}]}"#,
        )
        .unwrap();
        assert_eq!(response_text(response), "Leo | 3");
    }

    #[test]
    fn concatenates_text_blocks_in_order() {
        let response: AnthropicResponse = serde_json::from_str(
            r#"{"content":[{"type":"text","text":"Name | Count\n"},{"type":"text","text":"---|---"}]}"#,
        )
        .unwrap();
        assert_eq!(response_text(response), "Name | Count\n---|---");
    }

    #[test]
    fn empty_content_is_empty_text() {
        let response: AnthropicResponse = serde_json::from_str(r#"{"content":[]}"#).unwrap();
        assert_eq!(response_text(response), "");
    }
}
