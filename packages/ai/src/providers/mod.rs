//! Generative model provider abstraction and implementations.
//!
//! Supports Google Gemini, `OpenAI`, and Anthropic via a common trait.

pub mod anthropic;
pub mod gemini;
pub mod openai;

use crate::AiError;

/// Sampling parameters sent with every generation request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus sampling probability mass.
    pub top_p: f32,
    /// Upper bound on generated tokens.
    pub max_output_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.9,
            max_output_tokens: 8192,
        }
    }
}

/// Trait for text-completion providers.
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    /// Sends the prompt parts as one user turn and returns the generated
    /// text.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request fails or the provider rejects it.
    async fn generate(&self, parts: &[String]) -> Result<String, AiError>;
}

/// Joins prompt parts for providers that take a single text message.
pub(crate) fn join_parts(parts: &[String]) -> String {
    parts.join("\n\n")
}

/// Reads the body of `resp`, mapping a non-success status to
/// [`AiError::Provider`] using `extract_message` to pull the API's error
/// message out of the body.
pub(crate) async fn read_success_body(
    resp: reqwest::Response,
    extract_message: fn(&str) -> Option<String>,
) -> Result<String, AiError> {
    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        let message = extract_message(&body).unwrap_or_else(|| format!("HTTP {status}: {body}"));
        return Err(AiError::Provider { message });
    }

    Ok(body)
}
