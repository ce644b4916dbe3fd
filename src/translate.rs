//! Best-effort headline translation.
//!
//! The translation service is an unreliable external dependency. Nothing in
//! here may fail the pipeline: [`translate_or_original`] always returns a
//! string, falling back to the input when the service errors, times out or
//! answers with an unexpected body.
//!
//! # Architecture
//!
//! - [`Translator`]: core trait for one translation call
//! - [`RapidApiTranslator`]: HTTP client for the text translator endpoint
//! - [`RetryTranslate`]: decorator adding exponential backoff with jitter
//! - [`Passthrough`]: used when no API key is configured

use crate::models::MISSING;
use async_trait::async_trait;
use rand::{Rng, rng};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

/// Upper bound for one translation request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Result field names the service is known to use, in preference order.
const RESULT_FIELDS: [&str; 2] = ["trans", "translation"];

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("service returned status {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("no translator configured")]
    Disabled,
}

/// One call to a text translation capability.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String, TranslateError>;
}

/// Translate `text`, or return it unchanged on any failure.
///
/// Empty strings and the missing-field sentinel are returned untouched
/// without calling the service.
#[instrument(level = "debug", skip_all, fields(from, to))]
pub async fn translate_or_original(
    translator: &dyn Translator,
    text: &str,
    from: &str,
    to: &str,
) -> String {
    if text.trim().is_empty() || text == MISSING {
        return text.to_string();
    }
    match translator.translate(text, from, to).await {
        Ok(translated) => translated,
        Err(TranslateError::Disabled) => text.to_string(),
        Err(e) => {
            warn!(error = %e, "Translation failed; keeping original text");
            text.to_string()
        }
    }
}

/// Never translates; every call reports [`TranslateError::Disabled`].
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

#[async_trait]
impl Translator for Passthrough {
    async fn translate(&self, _: &str, _: &str, _: &str) -> Result<String, TranslateError> {
        Err(TranslateError::Disabled)
    }
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    from: &'a str,
    to: &'a str,
    text: &'a str,
}

/// Client for the RapidAPI text translator endpoint.
#[derive(Clone)]
pub struct RapidApiTranslator {
    client: reqwest::Client,
    endpoint: String,
    host: String,
    api_key: String,
}

impl fmt::Debug for RapidApiTranslator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RapidApiTranslator")
            .field("endpoint", &self.endpoint)
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

impl RapidApiTranslator {
    /// Client for `https://{host}/api/v1/translator/text`.
    pub fn new(host: &str, api_key: &str) -> Result<Self, TranslateError> {
        let endpoint = format!("https://{host}/api/v1/translator/text");
        Self::with_endpoint(&endpoint, host, api_key)
    }

    pub fn with_endpoint(
        endpoint: &str,
        host: &str,
        api_key: &str,
    ) -> Result<Self, TranslateError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            host: host.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

/// Pull the translated text out of a response body.
pub fn translated_text(body: &Value) -> Result<String, TranslateError> {
    RESULT_FIELDS
        .iter()
        .find_map(|field| body.get(field).and_then(Value::as_str))
        .map(str::to_string)
        .ok_or_else(|| TranslateError::Malformed(format!("no translation field in {body}")))
}

#[async_trait]
impl Translator for RapidApiTranslator {
    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String, TranslateError> {
        let t0 = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-RapidAPI-Key", &self.api_key)
            .header("X-RapidAPI-Host", &self.host)
            .json(&TranslateRequest { from, to, text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranslateError::Status(status.as_u16()));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| TranslateError::Malformed(e.to_string()))?;
        let translated = translated_text(&body)?;
        debug!(elapsed_ms = t0.elapsed().as_millis() as u64, "Translated");
        Ok(translated)
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`Translator`].
///
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryTranslate<T> {
    inner: T,
    max_retries: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl<T: Translator> RetryTranslate<T> {
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(5),
        }
    }
}

impl<T> fmt::Debug for RetryTranslate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryTranslate")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

#[async_trait]
impl<T: Translator> Translator for RetryTranslate<T> {
    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String, TranslateError> {
        let mut attempt = 0usize;
        loop {
            match self.inner.translate(text, from, to).await {
                Ok(translated) => return Ok(translated),
                // Retrying cannot fix a body we do not understand.
                Err(e @ (TranslateError::Malformed(_) | TranslateError::Disabled)) => return Err(e),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        return Err(e);
                    }
                    let delay = self
                        .base_delay
                        .saturating_mul(1 << (attempt - 1))
                        .min(self.max_delay);
                    let jitter_ms: u64 = if delay.is_zero() {
                        0
                    } else {
                        rng().random_range(0..=250)
                    };
                    let delay = delay + Duration::from_millis(jitter_ms);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        ?delay,
                        error = %e,
                        "Translation attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PATH: &str = "/api/v1/translator/text";

    async fn client(server: &MockServer) -> RapidApiTranslator {
        RapidApiTranslator::with_endpoint(&format!("{}{PATH}", server.uri()), "translate.test", "k")
            .unwrap()
    }

    #[tokio::test]
    async fn test_trans_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PATH))
            .and(header("X-RapidAPI-Key", "k"))
            .and(body_json(json!({ "from": "es", "to": "en", "text": "La crisis" })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "trans": "The crisis" })),
            )
            .mount(&server)
            .await;

        let translator = client(&server).await;
        let out = translate_or_original(&translator, "La crisis", "es", "en").await;
        assert_eq!(out, "The crisis");
    }

    #[tokio::test]
    async fn test_translation_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "translation": "Water policy" })),
            )
            .mount(&server)
            .await;

        let translator = client(&server).await;
        assert_eq!(
            translator.translate("La política del agua", "es", "en").await.unwrap(),
            "Water policy"
        );
    }

    #[tokio::test]
    async fn test_non_2xx_returns_original() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PATH))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let translator = client(&server).await;
        assert!(matches!(
            translator.translate("Hola", "es", "en").await,
            Err(TranslateError::Status(429))
        ));
        assert_eq!(translate_or_original(&translator, "Hola", "es", "en").await, "Hola");
    }

    #[tokio::test]
    async fn test_malformed_body_returns_original() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "?" })))
            .mount(&server)
            .await;

        let translator = client(&server).await;
        assert_eq!(translate_or_original(&translator, "Hola", "es", "en").await, "Hola");
    }

    #[tokio::test]
    async fn test_unreachable_service_returns_original() {
        let translator =
            RapidApiTranslator::with_endpoint("http://127.0.0.1:9/api", "translate.test", "k")
                .unwrap();
        assert_eq!(translate_or_original(&translator, "Hola", "es", "en").await, "Hola");
    }

    #[tokio::test]
    async fn test_sentinel_and_passthrough() {
        assert_eq!(translate_or_original(&Passthrough, "Hola", "es", "en").await, "Hola");
        assert_eq!(translate_or_original(&Passthrough, MISSING, "es", "en").await, MISSING);
        assert_eq!(translate_or_original(&Passthrough, "  ", "es", "en").await, "  ");
    }

    struct Flaky {
        calls: AtomicUsize,
        fail_first: usize,
    }

    #[async_trait]
    impl Translator for Flaky {
        async fn translate(&self, text: &str, _: &str, _: &str) -> Result<String, TranslateError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                Err(TranslateError::Status(503))
            } else {
                Ok(text.to_uppercase())
            }
        }
    }

    #[tokio::test]
    async fn test_retry_recovers() {
        let retry = RetryTranslate::new(
            Flaky { calls: AtomicUsize::new(0), fail_first: 1 },
            1,
            Duration::ZERO,
        );
        assert_eq!(retry.translate("hola", "es", "en").await.unwrap(), "HOLA");
        assert_eq!(retry.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_gives_up() {
        let retry = RetryTranslate::new(
            Flaky { calls: AtomicUsize::new(0), fail_first: 10 },
            2,
            Duration::ZERO,
        );
        assert!(retry.translate("hola", "es", "en").await.is_err());
        assert_eq!(retry.inner.calls.load(Ordering::SeqCst), 3);
        assert_eq!(translate_or_original(&retry, "hola", "es", "en").await, "hola");
    }

    #[test]
    fn test_translated_text_prefers_trans() {
        let body = json!({ "translation": "b", "trans": "a" });
        assert_eq!(translated_text(&body).unwrap(), "a");
        assert!(translated_text(&json!(["a"])).is_err());
    }
}
