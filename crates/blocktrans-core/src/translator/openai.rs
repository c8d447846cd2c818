use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn, error};

use crate::config::{Lang, TranslatorConfig};
use crate::error::{Error, Result};
use super::traits::{Translator, TranslatorInfo};

/// OpenAI-compatible API translator
/// Works with: llama.cpp server, Ollama, DeepSeek, OpenAI, etc.
pub struct OpenAiTranslator {
    client: Client,
    /// Base URL for the API (e.g., "http://localhost:8080/v1")
    pub api_base: String,
    /// Optional API key for authentication
    pub api_key: Option<String>,
    /// Model identifier
    pub model: String,
    /// Attempts per block
    pub retry_count: u32,
    /// Delay between retries in milliseconds
    pub retry_delay_ms: u64,
    /// Longest wait honored from a `Retry-After` header
    pub max_wait_secs: u64,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

impl OpenAiTranslator {
    pub fn from_config(config: &TranslatorConfig) -> Result<Self> {
        Ok(Self {
            client: super::http_client(config)?,
            api_base: config.api_base().trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            model: config.model.clone(),
            retry_count: config.retry_count.max(1),
            retry_delay_ms: config.retry_delay_ms,
            max_wait_secs: config.timeout_secs,
        })
    }

    /// Create translation prompt
    fn create_prompt(text: &str, source: &Lang, target: &Lang) -> String {
        let source_hint = if source.is_auto() {
            String::new()
        } else {
            format!(" from {}", language_name(source))
        };
        format!(
            "Translate the following text{} into {}. Keep line breaks. Output only the translation, no explanations.\n\nText: \"{}\"",
            source_hint,
            language_name(target),
            text
        )
    }

    async fn request_once(&self, url: &str, request: &ChatRequest) -> Result<String> {
        let mut req = self.client.post(url).json(request);
        if let Some(ref key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {key}"));
        }

        let response = req.send().await.map_err(|e| super::request_error(&e))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(Error::TranslationRateLimited {
                retry_after: super::retry_after(&response),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::TranslationRequest(format!("HTTP {status}: {body}")));
        }

        let chat_response = response
            .json::<ChatResponse>()
            .await
            .map_err(|e| Error::TranslationInvalidResponse(e.to_string()))?;

        let choice = chat_response
            .choices
            .first()
            .ok_or_else(|| Error::TranslationInvalidResponse("No choices in response".to_string()))?;

        // Remove quotes if the model wrapped the response
        let translated = choice
            .message
            .content
            .trim()
            .trim_start_matches('"')
            .trim_end_matches('"')
            .trim();

        if translated.is_empty() {
            return Err(Error::TranslationInvalidResponse("empty translation".to_string()));
        }

        Ok(translated.to_string())
    }

    /// Make API request with retry logic
    async fn request_with_retry(&self, text: &str, source: &Lang, target: &Lang) -> Result<String> {
        let url = format!("{}/chat/completions", self.api_base);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: Self::create_prompt(text, source, target),
            }],
            temperature: Some(0.3),
        };

        let mut last_error = None;

        for attempt in 0..self.retry_count {
            debug!(
                "Translation request attempt {}/{} to {}",
                attempt + 1,
                self.retry_count,
                url
            );

            match self.request_once(&url, &request).await {
                Ok(translated) => return Ok(translated),
                Err(e) => {
                    warn!("Request failed: {}", e);
                    if attempt + 1 < self.retry_count {
                        let wait = super::retry_wait(&e, self.retry_delay_ms, self.max_wait_secs);
                        tokio::time::sleep(wait).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        error!("Translation failed after {} attempts", self.retry_count);
        Err(last_error.unwrap_or(Error::TranslationMaxRetriesExceeded))
    }
}

#[async_trait]
impl Translator for OpenAiTranslator {
    fn info(&self) -> TranslatorInfo {
        TranslatorInfo {
            name: "OpenAI Compatible",
            requires_api_key: false, // Optional for local servers
            supports_auto_detect: true,
        }
    }

    async fn translate(&self, text: &str, source: &Lang, target: &Lang) -> Result<String> {
        if target.is_auto() {
            return Err(Error::TranslationUnsupportedLanguage(target.to_string()));
        }

        // Same language: nothing to do
        if source.as_str() == target.as_str() {
            return Ok(text.to_string());
        }

        self.request_with_retry(text, source, target).await
    }
}

/// Convert language code to human-readable name for prompts
fn language_name(lang: &Lang) -> &'static str {
    match lang.as_str() {
        "en" => "English",
        "id" => "Indonesian",
        "ms" => "Malay",
        "jw" => "Javanese",
        "su" => "Sundanese",
        "nl" => "Dutch",
        "zh-CN" => "Simplified Chinese",
        "zh-TW" => "Traditional Chinese",
        "ja" => "Japanese",
        "ko" => "Korean",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "it" => "Italian",
        "pt" => "Portuguese",
        "ru" => "Russian",
        "ar" => "Arabic",
        "hi" => "Hindi",
        "th" => "Thai",
        "vi" => "Vietnamese",
        // For unknown languages, the LLM should still understand most ISO codes
        _ => "the specified language",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::Backend;

    #[test]
    fn test_language_name() {
        assert_eq!(language_name(&Lang::new("en")), "English");
        assert_eq!(language_name(&Lang::new("id")), "Indonesian");
        assert_eq!(language_name(&Lang::new("unknown")), "the specified language");
    }

    #[test]
    fn test_prompt_mentions_languages() {
        let prompt = OpenAiTranslator::create_prompt("Hello", &Lang::new("en"), &Lang::new("id"));
        assert!(prompt.contains("from English into Indonesian"));
        assert!(prompt.ends_with("Text: \"Hello\""));

        let auto = OpenAiTranslator::create_prompt("Hello", &Lang::new("auto"), &Lang::new("id"));
        assert!(auto.starts_with("Translate the following text into Indonesian."));
    }

    #[test]
    fn test_from_config_normalizes_settings() {
        let mut config = TranslatorConfig::new(Backend::OpenAi);
        config.api_base = Some("http://llm.local/v1/".to_string());
        config.api_key = Some("  ".to_string());
        config.retry_count = 0;
        let translator = OpenAiTranslator::from_config(&config).unwrap();
        assert_eq!(translator.api_base, "http://llm.local/v1");
        assert!(translator.api_key.is_none());
        assert_eq!(translator.retry_count, 1);
    }

    #[tokio::test]
    async fn test_same_language_is_identity() {
        let translator = OpenAiTranslator::from_config(&TranslatorConfig::new(Backend::OpenAi)).unwrap();
        let out = translator
            .translate("Halo", &Lang::new("id"), &Lang::new("id"))
            .await
            .unwrap();
        assert_eq!(out, "Halo");
    }
}
