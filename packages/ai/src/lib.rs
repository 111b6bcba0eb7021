#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Generative model client for the extraction pipeline.
//!
//! Supports Google Gemini, `OpenAI`, and Anthropic Claude behind the
//! [`providers::TextGenerator`] trait: prompt parts in, generated text out.
//! Several credentials for the same provider can be combined into a
//! [`retry::RotatingGenerator`], which retries a failed call on the next
//! credential up to a bounded number of attempts.

pub mod providers;
pub mod retry;

use std::time::Duration;

use thiserror::Error;

use crate::providers::{
    GenerationSettings, TextGenerator, anthropic::AnthropicProvider, gemini::GeminiProvider,
    openai::OpenAiProvider,
};
use crate::retry::{RetryPolicy, RotatingGenerator};

/// Errors that can occur while calling a generative model.
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request to the model provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider-specific error.
    #[error("Provider error: {message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}

/// Default model per provider.
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";

/// Creates a text generator based on environment variables.
///
/// If `AI_PROVIDER` is explicitly set, uses that provider. Otherwise
/// auto-detects from available credentials, in order:
///
/// 1. `GEMINI_API_KEYS` / `GEMINI_API_KEY` -> Google Gemini
/// 2. `OPENAI_API_KEYS` / `OPENAI_API_KEY` -> `OpenAI`
/// 3. `ANTHROPIC_API_KEYS` / `ANTHROPIC_API_KEY` -> Anthropic Claude
///
/// The plural variables hold a comma-separated list of keys; one provider
/// is built per key and they are rotated on failure. `AI_MODEL` overrides
/// the model, `AI_BASE_URL` the API endpoint, and `AI_MAX_ATTEMPTS` the
/// number of attempts per call (default 1, i.e. no retry).
///
/// # Errors
///
/// Returns [`AiError::Config`] if no credentials are found, the
/// requested provider is unknown, or `AI_MAX_ATTEMPTS` is not a positive
/// integer.
pub fn create_generator_from_env() -> Result<Box<dyn TextGenerator>, AiError> {
    create_generator(|name| std::env::var(name).ok())
}

/// Same as [`create_generator_from_env`], reading variables through `var`.
///
/// # Errors
///
/// See [`create_generator_from_env`].
pub fn create_generator(
    var: impl Fn(&str) -> Option<String>,
) -> Result<Box<dyn TextGenerator>, AiError> {
    let provider = var("AI_PROVIDER").unwrap_or_else(|| detect_provider(&var));
    let model = var("AI_MODEL");
    let base_url = var("AI_BASE_URL");
    let settings = GenerationSettings::default();
    let max_attempts = parse_max_attempts(var("AI_MAX_ATTEMPTS").as_deref())?;

    let generators: Vec<Box<dyn TextGenerator>> = match provider.to_lowercase().as_str() {
        "gemini" | "google" => {
            let model = model.unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
            keys(&var, "GEMINI_API_KEYS", "GEMINI_API_KEY")?
                .into_iter()
                .map(|key| {
                    let provider = GeminiProvider::new(key, model.clone(), settings);
                    let provider = match &base_url {
                        Some(url) => provider.with_base_url(url),
                        None => provider,
                    };
                    Box::new(provider) as Box<dyn TextGenerator>
                })
                .collect()
        }
        "openai" | "gpt" => {
            let model = model.unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());
            keys(&var, "OPENAI_API_KEYS", "OPENAI_API_KEY")?
                .into_iter()
                .map(|key| {
                    let provider = OpenAiProvider::new(key, model.clone(), settings);
                    let provider = match &base_url {
                        Some(url) => provider.with_base_url(url),
                        None => provider,
                    };
                    Box::new(provider) as Box<dyn TextGenerator>
                })
                .collect()
        }
        "anthropic" | "claude" => {
            let model = model.unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string());
            keys(&var, "ANTHROPIC_API_KEYS", "ANTHROPIC_API_KEY")?
                .into_iter()
                .map(|key| {
                    let provider = AnthropicProvider::new(key, model.clone(), settings);
                    let provider = match &base_url {
                        Some(url) => provider.with_base_url(url),
                        None => provider,
                    };
                    Box::new(provider) as Box<dyn TextGenerator>
                })
                .collect()
        }
        other => {
            return Err(AiError::Config {
                message: format!(
                    "Unknown AI provider: {other}. Use 'gemini', 'openai', or 'anthropic'."
                ),
            });
        }
    };

    let policy = RetryPolicy {
        max_attempts,
        base_delay: Duration::from_secs(2),
    };

    log::info!(
        "Using {provider} with {} credential(s), max {} attempt(s) per call",
        generators.len(),
        policy.max_attempts
    );

    Ok(Box::new(RotatingGenerator::new(generators, policy)?))
}

/// Auto-detects which provider to use based on available credentials.
///
/// Returns a provider name string that matches the arms in
/// [`create_generator`].
fn detect_provider(var: &impl Fn(&str) -> Option<String>) -> String {
    let has = |plural: &str, singular: &str| var(plural).is_some() || var(singular).is_some();

    if has("GEMINI_API_KEYS", "GEMINI_API_KEY") {
        log::info!("Auto-detected AI provider: Gemini");
        return "gemini".to_string();
    }

    if has("OPENAI_API_KEYS", "OPENAI_API_KEY") {
        log::info!("Auto-detected AI provider: OpenAI");
        return "openai".to_string();
    }

    if has("ANTHROPIC_API_KEYS", "ANTHROPIC_API_KEY") {
        log::info!("Auto-detected AI provider: Anthropic");
        return "anthropic".to_string();
    }

    log::warn!(
        "No AI credentials detected. Set one of: GEMINI_API_KEY, OPENAI_API_KEY, \
         or ANTHROPIC_API_KEY. You can also set AI_PROVIDER explicitly."
    );

    // Fall back to gemini, which will produce a clear error about the missing key
    "gemini".to_string()
}

/// Reads API keys from the comma-separated `plural` variable, falling back
/// to the single-key `singular` variable.
fn keys(
    var: &impl Fn(&str) -> Option<String>,
    plural: &str,
    singular: &str,
) -> Result<Vec<String>, AiError> {
    let raw = var(plural)
        .or_else(|| var(singular))
        .ok_or_else(|| AiError::Config {
            message: format!("{singular} environment variable not set"),
        })?;

    let keys = split_keys(&raw);
    if keys.is_empty() {
        return Err(AiError::Config {
            message: format!("{singular} is set but empty"),
        });
    }
    Ok(keys)
}

/// Splits a comma-separated key list, dropping blanks.
fn split_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

/// Parses `AI_MAX_ATTEMPTS`, defaulting to a single attempt when unset.
fn parse_max_attempts(value: Option<&str>) -> Result<u32, AiError> {
    let Some(value) = value else {
        return Ok(1);
    };

    match value.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(AiError::Config {
            message: format!("AI_MAX_ATTEMPTS must be a positive integer, got '{value}'"),
        }),
    }
}
