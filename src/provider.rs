//! Generation Provider Abstraction
//!
//! The engine consumes text generation through the `DescriptionGenerator`
//! trait; retry policy, if any, belongs to the caller. One concrete
//! implementation ships with the crate: an OpenAI-compatible chat
//! completions client usable against hosted APIs or local servers.

use crate::config::ProviderConfig;
use crate::error::EngineError;
use crate::types::LanguageTag;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Result of one generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedDescription {
    pub text: String,
    /// Language the generator actually produced, as reported by it.
    pub detected_language: String,
}

/// Text-generation collaborator contract.
///
/// Implementations may be slow and may fail; the engine isolates failures
/// per entity and never retries on its own.
#[async_trait]
pub trait DescriptionGenerator: Send + Sync {
    async fn generate(
        &self,
        name: &str,
        language: &LanguageTag,
    ) -> Result<GeneratedDescription, EngineError>;
}

const PROVIDER_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const PROVIDER_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

fn build_provider_http_client() -> Result<Client, EngineError> {
    Client::builder()
        .no_proxy()
        .connect_timeout(PROVIDER_HTTP_CONNECT_TIMEOUT)
        .timeout(PROVIDER_HTTP_REQUEST_TIMEOUT)
        .build()
        .map_err(|e| EngineError::ProviderError(format!("Failed to create HTTP client: {}", e)))
}

fn map_http_error(error: reqwest::Error) -> EngineError {
    if let Some(status) = error.status() {
        match status.as_u16() {
            401 => EngineError::ProviderAuthFailed(format!("Authentication failed: {}", error)),
            429 => EngineError::ProviderRateLimit(format!("Rate limit exceeded: {}", error)),
            _ => EngineError::ProviderRequestFailed(format!(
                "Request failed with status {}: {}",
                status, error
            )),
        }
    } else if error.is_timeout() {
        EngineError::ProviderRequestFailed(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        EngineError::ProviderRequestFailed(format!("Connection error: {}", error))
    } else {
        EngineError::ProviderError(format!("HTTP error: {}", error))
    }
}

// OpenAI-compatible API request/response structures
#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

/// Body the model is instructed to answer with.
#[derive(Deserialize)]
struct DescriptionPayload {
    description: String,
    language: String,
}

/// OpenAI-compatible generator client
pub struct OpenAiGenerator {
    client: Client,
    model: String,
    api_key: String,
    base_url: String,
}

impl OpenAiGenerator {
    pub fn new(config: &ProviderConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let client = build_provider_http_client()?;
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());

        Ok(Self {
            client,
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            base_url,
        })
    }

    fn build_messages(&self, name: &str, language: &LanguageTag) -> Vec<ChatMessage> {
        let language_instruction = match language.as_str() {
            Some(tag) => format!("Write in the language with tag \"{}\".", tag),
            None => "Pick the most natural language for the product name.".to_string(),
        };

        vec![
            ChatMessage {
                role: "system".to_string(),
                content: format!(
                    "You write short, appetizing catalog product descriptions. {} \
                     Answer with a JSON object: {{\"description\": \"...\", \"language\": \"<tag>\"}} \
                     where language is the tag of the language you actually wrote in.",
                    language_instruction
                ),
            },
            ChatMessage {
                role: "user".to_string(),
                content: format!("Write a product description for: {}", name),
            },
        ]
    }
}

#[async_trait]
impl DescriptionGenerator for OpenAiGenerator {
    async fn generate(
        &self,
        name: &str,
        language: &LanguageTag,
    ) -> Result<GeneratedDescription, EngineError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: self.build_messages(name, language),
            temperature: 0.7,
            max_tokens: Some(400),
        };

        debug!(product = name, language = %language, model = %self.model, "Requesting description");

        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(map_http_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(match status.as_u16() {
                401 => EngineError::ProviderAuthFailed(format!(
                    "Authentication failed: {}",
                    error_text
                )),
                429 => {
                    EngineError::ProviderRateLimit(format!("Rate limit exceeded: {}", error_text))
                }
                _ => EngineError::ProviderRequestFailed(format!("Request failed: {}", error_text)),
            });
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| EngineError::ProviderError(format!("Failed to parse response: {}", e)))?;

        let choice = completion
            .choices
            .first()
            .ok_or_else(|| EngineError::ProviderError("No choices in response".to_string()))?;

        parse_payload(&choice.message.content, language)
    }
}

/// Extract the structured payload from the model reply.
///
/// Falls back to treating the whole reply as the description when the
/// model ignored the JSON instruction; detected language then defaults to
/// the requested tag or "en".
fn parse_payload(content: &str, requested: &LanguageTag) -> Result<GeneratedDescription, EngineError> {
    let trimmed = content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    if let Ok(payload) = serde_json::from_str::<DescriptionPayload>(trimmed) {
        if payload.description.is_empty() {
            return Err(EngineError::GenerationFailed(
                "Provider returned an empty description".to_string(),
            ));
        }
        return Ok(GeneratedDescription {
            text: payload.description,
            detected_language: payload.language,
        });
    }

    if trimmed.is_empty() {
        return Err(EngineError::GenerationFailed(
            "Provider returned an empty description".to_string(),
        ));
    }

    Ok(GeneratedDescription {
        text: trimmed.to_string(),
        detected_language: requested.as_str().unwrap_or("en").to_string(),
    })
}
