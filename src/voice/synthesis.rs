//! External text-to-speech provider client.
//!
//! The provider contract is deliberately minimal and provider-agnostic:
//! `POST {endpoint}` with `{"text": ...}`, synthesized audio bytes in the
//! response body. Credentials, endpoint, and timeout come from
//! configuration; failures are reported by the caller on the event channel,
//! never as a synchronous request error.

use crate::config::SynthesisConfig;
use anyhow::Result;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

pub struct SynthesisClient {
    endpoint: String,
    api_key: Option<String>,
    http: reqwest::Client,
}

impl SynthesisClient {
    pub fn new(config: &SynthesisConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            http,
        })
    }

    /// Submit text for synthesis and return the audio bytes.
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        debug!("Submitting {} chars to synthesis provider", text.len());

        let mut request = self.http.post(&self.endpoint).json(&json!({ "text": text }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!(
                "synthesis provider returned {}",
                status
            ));
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(anyhow::anyhow!("synthesis provider returned no audio"));
        }

        Ok(audio.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_from_default_config() {
        let config = SynthesisConfig {
            endpoint: "http://127.0.0.1:5002/api/tts".to_string(),
            api_key: Some("secret".to_string()),
            request_timeout_secs: 5,
        };
        assert!(SynthesisClient::new(&config).is_ok());
    }
}
