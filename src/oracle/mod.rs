pub mod prompts;
pub mod response;

use std::{path::Path, thread, time::Duration};

use base64::Engine as _;
use log::{debug, warn};
use serde_json::{Value, json};

use crate::error::{KycError, Result};
use prompts::PromptSet;

/// The prompt/response contract to the external judgment oracle: a text
/// prompt plus an optional image, answered with free-form text. Everything
/// behind this seam is opaque to the analyzers.
pub trait JudgmentOracle {
    fn call(&self, prompt: &str, image: Option<&Path>) -> Result<String>;
}

/// Oracle transport configuration. Loaded once at startup and injected into
/// the client at construction; immutable afterwards.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
    /// Bounded retry: fixed attempt count with a fixed delay between tries.
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub request_timeout: Duration,
    pub prompts: PromptSet,
}

impl OracleConfig {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
            request_timeout: Duration::from_secs(30),
            prompts: PromptSet::default(),
        }
    }

    /// Reads `GEMINI_API_KEY` and `GEMINI_MODEL` from the environment.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| KycError::MissingConfig("GEMINI_API_KEY".into()))?;
        let model = std::env::var("GEMINI_MODEL")
            .map_err(|_| KycError::MissingConfig("GEMINI_MODEL".into()))?;

        Ok(Self::new(
            "https://generativelanguage.googleapis.com/v1beta",
            model,
            api_key,
        ))
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.endpoint, self.model, self.api_key
        )
    }
}

/// Blocking HTTP client for a Gemini-style `generateContent` endpoint.
pub struct GeminiClient {
    config: OracleConfig,
    http: reqwest::blocking::Client,
}

impl GeminiClient {
    pub fn new(config: OracleConfig) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| KycError::Oracle(e.to_string()))?;

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    fn build_payload(&self, prompt: &str, image: Option<&Path>) -> Result<Value> {
        let mut parts = vec![json!({ "text": prompt })];

        if let Some(path) = image {
            let bytes = std::fs::read(path)?;
            let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
            parts.push(json!({
                "inline_data": { "mime_type": "image/jpeg", "data": encoded }
            }));
        }

        Ok(json!({ "contents": [{ "parts": parts }] }))
    }

    fn attempt(&self, payload: &Value) -> Result<String> {
        let response = self
            .http
            .post(self.config.generate_url())
            .json(payload)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| KycError::Oracle(e.to_string()))?;

        let body: Value = response
            .json()
            .map_err(|e| KycError::Oracle(e.to_string()))?;

        body["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| KycError::Oracle("no text candidate in oracle response".into()))
    }
}

impl JudgmentOracle for GeminiClient {
    fn call(&self, prompt: &str, image: Option<&Path>) -> Result<String> {
        let payload = self.build_payload(prompt, image)?;

        let mut last_error = KycError::Oracle("no attempts made".into());
        for attempt in 1..=self.config.max_retries.max(1) {
            debug!("oracle attempt {}/{}", attempt, self.config.max_retries);
            match self.attempt(&payload) {
                Ok(text) => return Ok(text),
                Err(e) => {
                    warn!("oracle attempt {} failed: {}", attempt, e);
                    last_error = e;
                    if attempt < self.config.max_retries {
                        thread::sleep(self.config.retry_delay);
                    }
                }
            }
        }

        Err(last_error)
    }
}

/// The well-formed channel value substituted when the transport gives up,
/// so downstream consumers never see a half-missing channel.
pub fn fallback_error_object(error: &KycError) -> Value {
    json!({
        "status": "fail",
        "message": format!("API call failed after multiple attempts: {error}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_policy_defaults() {
        let config = OracleConfig::new("https://example.invalid", "test-model", "key");
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delay, Duration::from_secs(2));
    }

    #[test]
    fn generate_url_includes_model_and_key() {
        let config = OracleConfig::new("https://api.test", "gemini-x", "secret");
        assert_eq!(
            config.generate_url(),
            "https://api.test/models/gemini-x:generateContent?key=secret"
        );
    }

    #[test]
    fn payload_without_image_is_text_only() {
        let client = GeminiClient::new(OracleConfig::new("e", "m", "k")).unwrap();
        let payload = client.build_payload("hello", None).unwrap();
        assert_eq!(payload["contents"][0]["parts"][0]["text"], "hello");
        assert!(payload["contents"][0]["parts"].as_array().unwrap().len() == 1);
    }

    #[test]
    fn payload_with_image_embeds_base64() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("img.jpg");
        std::fs::write(&path, b"abc").unwrap();

        let client = GeminiClient::new(OracleConfig::new("e", "m", "k")).unwrap();
        let payload = client.build_payload("p", Some(&path)).unwrap();

        let data = payload["contents"][0]["parts"][1]["inline_data"]["data"]
            .as_str()
            .unwrap();
        assert_eq!(data, base64::engine::general_purpose::STANDARD.encode(b"abc"));
    }

    #[test]
    fn transport_failure_exhausts_bounded_retries() {
        // Port 1 refuses connections immediately, so this exercises the full
        // retry loop without waiting on timeouts.
        let mut config = OracleConfig::new("http://127.0.0.1:1", "m", "k");
        config.max_retries = 2;
        config.retry_delay = Duration::ZERO;
        config.request_timeout = Duration::from_millis(500);

        let client = GeminiClient::new(config).unwrap();
        let err = client.call("prompt", None).unwrap_err();
        assert!(matches!(err, KycError::Oracle(_)));
    }

    #[test]
    fn fallback_object_is_well_formed() {
        let value = fallback_error_object(&KycError::Oracle("boom".into()));
        assert_eq!(value["status"], "fail");
        assert!(value["message"].as_str().unwrap().contains("boom"));
    }
}
