//! Google Gemini provider implementation.

use serde::{Deserialize, Serialize};

use super::{GenerationSettings, TextGenerator, read_success_body};
use crate::AiError;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini `generateContent` API provider.
pub struct GeminiProvider {
    api_key: String,
    model: String,
    settings: GenerationSettings,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Creates a new Gemini provider.
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

    /// Points the provider at a different API root (proxies, test servers).
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

/// Gemini API request body.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
}

/// Gemini API response body.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

/// Gemini API error response.
#[derive(Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

fn build_request<'a>(parts: &'a [String], settings: &GenerationSettings) -> GeminiRequest<'a> {
    GeminiRequest {
        contents: vec![GeminiContent {
            role: "user",
            parts: parts.iter().map(|text| GeminiPart { text }).collect(),
        }],
        generation_config: GeminiGenerationConfig {
            temperature: settings.temperature,
            top_p: settings.top_p,
            max_output_tokens: settings.max_output_tokens,
        },
    }
}

/// Concatenates the text of the first candidate.
///
/// A response with no candidates at all means the prompt was blocked,
/// which is reported as an error rather than an empty answer.
fn response_text(response: GeminiResponse) -> Result<String, AiError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(AiError::Provider {
            message: format!("Gemini returned no candidates: {reason}"),
        });
    };

    Ok(candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default())
}

#[async_trait::async_trait]
impl TextGenerator for GeminiProvider {
    async fn generate(&self, parts: &[String]) -> Result<String, AiError> {
        let request = build_request(parts, &self.settings);

        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        let body = read_success_body(resp, |body| {
            serde_json::from_str::<GeminiError>(body)
                .ok()
                .map(|e| e.error.message)
        })
        .await?;

        let response: GeminiResponse = serde_json::from_str(&body)?;
        response_text(response)
    }
}
