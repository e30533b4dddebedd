//! # Application State Management
//!
//! Shared state that every HTTP request handler and WebSocket actor can
//! reach through `web::Data<AppState>`.
//!
//! ## Ownership Layout:
//! - **config**: `Arc<RwLock<AppConfig>>` — many readers, runtime updates
//!   through one writer
//! - **metrics**: `Arc<RwLock<AppMetrics>>` — updated by the metrics
//!   middleware on every request
//! - **hub / library / controller / voice**: handles to the core
//!   components; each component owns its own data and does its own locking,
//!   so `AppState` itself stays a cheap bag of `Arc`s that clones per
//!   worker without copying anything
//!
//! PlaybackState deliberately does *not* live here: the playback controller
//! is its single owner and everything else only ever sees snapshots.

use crate::audio::AudioLibrary;
use crate::config::AppConfig;
use crate::events::EventHub;
use crate::playback::PlaybackController;
use crate::voice::VoiceIngest;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

/// The main application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration (can be updated at runtime)
    pub config: Arc<RwLock<AppConfig>>,

    /// Performance metrics (constantly being updated by requests)
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// When the server started
    pub start_time: Instant,

    /// Observer registry for the event channel
    pub hub: Arc<EventHub>,

    /// Uploaded audio catalog
    pub library: Arc<AudioLibrary>,

    /// The one owner of playback state
    pub controller: Arc<PlaybackController>,

    /// Voice announcement ingestion and synthesis
    pub voice: Arc<VoiceIngest>,
}

/// Request metrics collected across all HTTP requests.
#[derive(Debug, Default)]
pub struct AppMetrics {
    /// Total number of HTTP requests processed since server start
    pub request_count: u64,

    /// Total number of errors encountered since server start
    pub error_count: u64,

    /// Detailed metrics for each API endpoint
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// Detailed performance metrics for a specific API endpoint.
#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    pub total_duration_ms: u64,
    pub error_count: u64,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        hub: Arc<EventHub>,
        library: Arc<AudioLibrary>,
        controller: Arc<PlaybackController>,
        voice: Arc<VoiceIngest>,
    ) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            start_time: Instant::now(),
            hub,
            library,
            controller,
            voice,
        }
    }

    /// Get a copy of the current configuration.
    ///
    /// Cloning releases the read lock immediately, so other threads aren't
    /// blocked while the caller works with the snapshot.
    pub fn get_config(&self) -> AppConfig {
        self.config.read().unwrap().clone()
    }

    /// Replace the configuration after validating it.
    pub fn update_config(&self, new_config: AppConfig) -> Result<(), String> {
        match new_config.validate() {
            Ok(_) => {
                *self.config.write().unwrap() = new_config;
                Ok(())
            }
            Err(e) => Err(e.to_string()),
        }
    }

    /// Increment the total request counter (called by middleware for every
    /// request).
    pub fn increment_request_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.request_count += 1;
    }

    /// Increment the total error counter (called when any request fails).
    pub fn increment_error_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.error_count += 1;
    }

    /// Record detailed metrics for a specific endpoint.
    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics.write().unwrap();

        let endpoint_metric = metrics.endpoint_metrics.entry(endpoint.to_string()).or_default();
        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;

        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    /// Get a snapshot of current metrics (used for the /metrics endpoint).
    ///
    /// Clones under a read lock so metrics don't change while they are being
    /// serialized into the HTTP response.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        let metrics = self.metrics.read().unwrap();
        AppMetrics {
            request_count: metrics.request_count,
            error_count: metrics.error_count,
            endpoint_metrics: metrics.endpoint_metrics.clone(),
        }
    }

    /// Get server uptime in seconds.
    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl EndpointMetric {
    /// Average response time for this endpoint in milliseconds.
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    /// Error rate for this endpoint as a fraction (0.0 to 1.0).
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
impl AppState {
    /// Fully wired state on a fresh temp uploads directory, for handler
    /// tests.
    pub fn for_tests() -> Self {
        let config = AppConfig::default();
        let hub = Arc::new(EventHub::new());
        let root =
            std::env::temp_dir().join(format!("handler-test-{}", uuid::Uuid::new_v4()));
        let library = Arc::new(AudioLibrary::new(
            crate::audio::DiskStore::new(root),
            hub.clone(),
        ));
        let controller =
            PlaybackController::new(hub.clone(), config.voice.assumed_bytes_per_sec, 50);
        let synthesizer = crate::voice::SynthesisClient::new(&config.synthesis).unwrap();
        let voice = VoiceIngest::new(
            std::time::Duration::from_secs(config.voice.inactivity_timeout_secs),
            config.voice.max_chunk_bytes,
            controller.clone(),
            synthesizer,
            hub.clone(),
        );
        Self::new(config, hub, library, controller, voice)
    }
}
