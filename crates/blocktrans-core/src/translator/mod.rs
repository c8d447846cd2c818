mod traits;
mod block;
mod google;
mod openai;

pub use traits::{Translator, TranslatorInfo};
pub use block::{BlockOutcome, BlockTranslator, TranslatedBlock};
pub use google::GoogleTranslator;
pub use openai::OpenAiTranslator;

use crate::config::{Backend, TranslatorConfig};
use crate::error::{Error, Result};
use std::sync::Arc;
use std::time::Duration;

/// Wait after a 429 that carries no usable `Retry-After`.
const DEFAULT_RATE_LIMIT_WAIT_SECS: u64 = 5;

/// Create a translator from configuration
pub fn create_translator(config: &TranslatorConfig) -> Result<Arc<dyn Translator>> {
    let translator: Arc<dyn Translator> = match config.backend {
        Backend::Google => Arc::new(GoogleTranslator::from_config(config)?),
        Backend::OpenAi => Arc::new(OpenAiTranslator::from_config(config)?),
    };

    Ok(translator)
}

/// HTTP client with the configured per-request timeout.
fn http_client(config: &TranslatorConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| Error::TranslationRequest(format!("Failed to create HTTP client: {e}")))
}

/// Map a transport error, keeping timeouts distinguishable.
fn request_error(e: &reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::TranslationTimeout
    } else {
        Error::TranslationRequest(e.to_string())
    }
}

/// Seconds from a `Retry-After` header, if present and numeric.
fn retry_after(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// How long to wait before the attempt following `error`.
///
/// A server-supplied `Retry-After` is capped at `max_wait_secs`.
fn retry_wait(error: &Error, retry_delay_ms: u64, max_wait_secs: u64) -> Duration {
    match error {
        Error::TranslationRateLimited { retry_after } => Duration::from_secs(
            retry_after
                .unwrap_or(DEFAULT_RATE_LIMIT_WAIT_SECS)
                .min(max_wait_secs),
        ),
        _ => Duration::from_millis(retry_delay_ms),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_wait_caps_retry_after() {
        let limited = |retry_after| Error::TranslationRateLimited { retry_after };

        assert_eq!(
            retry_wait(&limited(Some(18_446_744_073_709_551)), 1000, 30),
            Duration::from_secs(30)
        );
        assert_eq!(retry_wait(&limited(Some(86_400)), 1000, 30), Duration::from_secs(30));
        assert_eq!(retry_wait(&limited(Some(2)), 1000, 30), Duration::from_secs(2));
        assert_eq!(retry_wait(&limited(None), 1000, 30), Duration::from_secs(5));
        assert_eq!(retry_wait(&limited(None), 1000, 3), Duration::from_secs(3));
    }

    #[test]
    fn test_retry_wait_uses_delay_for_other_errors() {
        assert_eq!(
            retry_wait(&Error::TranslationTimeout, 1500, 30),
            Duration::from_millis(1500)
        );
    }

    #[test]
    fn test_create_default_translator() {
        let translator = create_translator(&TranslatorConfig::default()).unwrap();
        assert_eq!(translator.name(), "Google");
    }

    #[test]
    fn test_create_openai_translator() {
        let translator = create_translator(&TranslatorConfig::new(Backend::OpenAi)).unwrap();
        assert_eq!(translator.name(), "OpenAI Compatible");
        assert!(translator.info().supports_auto_detect);
    }
}
