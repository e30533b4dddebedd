//! # Configuration Management
//!
//! This module handles loading and managing application configuration from
//! multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Environment variables (APP_SERVER_HOST, APP_SERVER_PORT, etc.)
//! 2. Configuration file (config.toml)
//! 3. Default values (defined in the Default impl)
//!
//! The external collaborators the core depends on — the uploaded-audio
//! storage location, the synthesis provider endpoint, and the voice session
//! inactivity window — are all configured here rather than hard-coded, so
//! the core logic stays deployment-agnostic.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Main application configuration that contains all settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub voice: VoiceConfig,
    pub synthesis: SynthesisConfig,
    pub spotify: SpotifyConfig,
}

/// Server-specific configuration settings.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: Only accept connections from localhost (development)
/// - `host = "0.0.0.0"`: Accept connections from any IP address (production)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Where uploaded audio content is stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory that receives uploaded audio files. Created at startup if
    /// it does not exist.
    pub uploads_dir: String,
}

/// Voice announcement ingestion settings.
///
/// ## Fields:
/// - `inactivity_timeout_secs`: a recording session that receives no chunk
///   for this long is auto-closed as if the client had ended it, so a
///   dropped client cannot orphan a session
/// - `max_chunk_bytes`: upper bound on a single decoded voice chunk
/// - `assumed_bytes_per_sec`: rough announcement bitrate used to estimate
///   playback duration, since the audio sink is external and reports no
///   progress back
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    pub inactivity_timeout_secs: u64,
    pub max_chunk_bytes: usize,
    pub assumed_bytes_per_sec: usize,
}

/// External text-to-speech provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// HTTP endpoint that accepts `{"text": ...}` and returns synthesized
    /// audio bytes in the response body.
    pub endpoint: String,

    /// Optional bearer token for the provider.
    pub api_key: Option<String>,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

/// Streaming-service placeholder configuration.
///
/// The real integration is out of scope; these values are served verbatim by
/// `GET /api/spotify/config` so a client can render its connect flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            storage: StorageConfig {
                uploads_dir: "uploads".to_string(),
            },
            voice: VoiceConfig {
                inactivity_timeout_secs: 5,
                max_chunk_bytes: 1024 * 1024,
                assumed_bytes_per_sec: 16_000,
            },
            synthesis: SynthesisConfig {
                endpoint: "http://127.0.0.1:5002/api/tts".to_string(),
                api_key: None,
                request_timeout_secs: 30,
            },
            spotify: SpotifyConfig {
                client_id: "your_spotify_client_id_placeholder".to_string(),
                client_secret: "your_spotify_client_secret_placeholder".to_string(),
                redirect_uri: "http://localhost:3000/callback".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Configuration Loading Process:
    /// 1. Start with built-in defaults
    /// 2. Override with values from config.toml (if it exists)
    /// 3. Override with environment variables prefixed with APP_
    /// 4. Handle special cases for HOST and PORT environment variables
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER_HOST=0.0.0.0`: Override server host
    /// - `APP_STORAGE_UPLOADS_DIR=/var/lib/audio`: Override storage location
    /// - `HOST=0.0.0.0` / `PORT=3000`: Special cases for deployment platforms
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("_"));

        // Deployment platforms commonly inject these without the APP_ prefix
        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - Server port is not 0 (port 0 is reserved and can't be used)
    /// - Uploads directory is not blank
    /// - The voice inactivity window and bitrate estimate are nonzero
    /// - The synthesis endpoint is not blank
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.storage.uploads_dir.trim().is_empty() {
            return Err(anyhow::anyhow!("Uploads directory cannot be empty"));
        }

        if self.voice.inactivity_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "Voice inactivity timeout must be greater than 0"
            ));
        }

        if self.voice.max_chunk_bytes == 0 {
            return Err(anyhow::anyhow!("Max voice chunk size must be greater than 0"));
        }

        if self.voice.assumed_bytes_per_sec == 0 {
            return Err(anyhow::anyhow!(
                "Assumed announcement bitrate must be greater than 0"
            ));
        }

        if self.synthesis.endpoint.trim().is_empty() {
            return Err(anyhow::anyhow!("Synthesis endpoint cannot be empty"));
        }

        Ok(())
    }

    /// Update configuration from a JSON string (used for runtime config
    /// updates via `PUT /api/config`).
    ///
    /// ## Partial updates:
    /// Only the fields present in the JSON are changed. For example,
    /// `{"voice": {"inactivity_timeout_secs": 10}}` widens the inactivity
    /// window and touches nothing else. The updated configuration is
    /// re-validated before it is accepted.
    pub fn update_from_json(&mut self, json_str: &str) -> Result<()> {
        let partial: serde_json::Value = serde_json::from_str(json_str)?;

        if let Some(server) = partial.get("server") {
            if let Some(host) = server.get("host").and_then(|v| v.as_str()) {
                self.server.host = host.to_string();
            }
            if let Some(port) = server.get("port").and_then(|v| v.as_u64()) {
                self.server.port = port as u16;
            }
        }

        if let Some(storage) = partial.get("storage") {
            if let Some(dir) = storage.get("uploads_dir").and_then(|v| v.as_str()) {
                self.storage.uploads_dir = dir.to_string();
            }
        }

        if let Some(voice) = partial.get("voice") {
            if let Some(timeout) = voice
                .get("inactivity_timeout_secs")
                .and_then(|v| v.as_u64())
            {
                self.voice.inactivity_timeout_secs = timeout;
            }
            if let Some(max) = voice.get("max_chunk_bytes").and_then(|v| v.as_u64()) {
                self.voice.max_chunk_bytes = max as usize;
            }
            if let Some(rate) = voice.get("assumed_bytes_per_sec").and_then(|v| v.as_u64()) {
                self.voice.assumed_bytes_per_sec = rate as usize;
            }
        }

        if let Some(synthesis) = partial.get("synthesis") {
            if let Some(endpoint) = synthesis.get("endpoint").and_then(|v| v.as_str()) {
                self.synthesis.endpoint = endpoint.to_string();
            }
            if let Some(timeout) = synthesis
                .get("request_timeout_secs")
                .and_then(|v| v.as_u64())
            {
                self.synthesis.request_timeout_secs = timeout;
            }
        }

        self.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The default configuration must be valid and carry the documented
    /// 5-second inactivity window.
    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.voice.inactivity_timeout_secs, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.voice.inactivity_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.storage.uploads_dir = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_update() {
        let mut config = AppConfig::default();
        let json = r#"{"voice": {"inactivity_timeout_secs": 12}}"#;
        assert!(config.update_from_json(json).is_ok());
        assert_eq!(config.voice.inactivity_timeout_secs, 12);
        // Other fields should remain unchanged
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_config_update_rejects_invalid_result() {
        let mut config = AppConfig::default();
        let json = r#"{"voice": {"inactivity_timeout_secs": 0}}"#;
        assert!(config.update_from_json(json).is_err());
    }
}
