//! # Source Adapters
//!
//! One uniform capability wrapper per audio source kind. Each adapter knows
//! how to start and stop its source against the external sink and reports
//! whether it currently considers itself started; everything else (which
//! source is allowed to play, volume baseline, event publication) belongs to
//! the playback controller.
//!
//! ## Adapter Kinds:
//! - **StreamingAdapter**: placeholder for the streaming-service
//!   integration. It accepts any track URI and reports success; no OAuth or
//!   playback protocol is assumed.
//! - **LocalFileAdapter**: plays a stored upload. Start fails with
//!   `SourceUnavailable` when the stored content has gone missing.
//! - **VoiceAdapter**: one-shot announcement playback. Since the sink is
//!   external and reports no progress, the adapter estimates the
//!   announcement duration from its byte length and signals completion
//!   through a oneshot channel.

use crate::error::{AppError, AppResult};
use crate::playback::types::{SourceKind, TrackRef};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Coarse adapter status used to verify mutual exclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterStatus {
    Idle,
    Started,
}

/// Uniform control surface over one audio source kind.
///
/// `start` returns a completion receiver for sources that finish on their
/// own (voice announcements); sources that play until stopped return `None`.
/// `stop` is best-effort: the controller logs failures but never lets them
/// block starting the next source.
pub trait SourceAdapter: Send + Sync {
    fn kind(&self) -> SourceKind;

    fn start(&self, track: &TrackRef) -> AppResult<Option<oneshot::Receiver<()>>>;

    fn stop(&self) -> AppResult<()>;

    fn status(&self) -> AdapterStatus;

    /// Apply a new output level to the running sink. Default is a no-op for
    /// sources whose sink has no level control of its own.
    fn set_volume(&self, _volume: u8) {}
}

fn status_from_flag(flag: &AtomicBool) -> AdapterStatus {
    if flag.load(Ordering::SeqCst) {
        AdapterStatus::Started
    } else {
        AdapterStatus::Idle
    }
}

/// Placeholder control interface for the streaming service.
pub struct StreamingAdapter {
    started: AtomicBool,
}

impl StreamingAdapter {
    pub fn new() -> Self {
        Self {
            started: AtomicBool::new(false),
        }
    }
}

impl SourceAdapter for StreamingAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Streaming
    }

    fn start(&self, track: &TrackRef) -> AppResult<Option<oneshot::Receiver<()>>> {
        let TrackRef::Streaming { track_uri } = track else {
            return Err(AppError::SourceUnavailable(
                "streaming adapter received a non-streaming track".to_string(),
            ));
        };

        info!("Streaming playback requested (placeholder): {}", track_uri);
        self.started.store(true, Ordering::SeqCst);
        Ok(None)
    }

    fn stop(&self) -> AppResult<()> {
        if self.started.swap(false, Ordering::SeqCst) {
            info!("Streaming playback stopped (placeholder)");
        }
        Ok(())
    }

    fn status(&self) -> AdapterStatus {
        status_from_flag(&self.started)
    }

    fn set_volume(&self, volume: u8) {
        debug!("Streaming volume set to {} (placeholder)", volume);
    }
}

/// Plays uploaded files from the disk store through the external sink.
pub struct LocalFileAdapter {
    started: AtomicBool,
}

impl LocalFileAdapter {
    pub fn new() -> Self {
        Self {
            started: AtomicBool::new(false),
        }
    }
}

impl SourceAdapter for LocalFileAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Local
    }

    fn start(&self, track: &TrackRef) -> AppResult<Option<oneshot::Receiver<()>>> {
        let TrackRef::Local { filename, path, .. } = track else {
            return Err(AppError::SourceUnavailable(
                "local adapter received a non-local track".to_string(),
            ));
        };

        // The stored content is the one sink precondition we can check:
        // a missing file means the sink would have nothing to play.
        if !path.is_file() {
            warn!("Stored content missing for {}: {}", filename, path.display());
            return Err(AppError::SourceUnavailable(format!(
                "stored content missing for {}",
                filename
            )));
        }

        info!("Local playback started: {} ({})", filename, path.display());
        self.started.store(true, Ordering::SeqCst);
        Ok(None)
    }

    fn stop(&self) -> AppResult<()> {
        if self.started.swap(false, Ordering::SeqCst) {
            info!("Local playback stopped");
        }
        Ok(())
    }

    fn status(&self) -> AdapterStatus {
        status_from_flag(&self.started)
    }

    fn set_volume(&self, volume: u8) {
        debug!("Local sink volume set to {}", volume);
    }
}

/// One-shot announcement playback.
pub struct VoiceAdapter {
    started: AtomicBool,

    /// Rough announcement bitrate used to estimate playback duration.
    assumed_bytes_per_sec: usize,
}

impl VoiceAdapter {
    pub fn new(assumed_bytes_per_sec: usize) -> Self {
        Self {
            started: AtomicBool::new(false),
            assumed_bytes_per_sec: assumed_bytes_per_sec.max(1),
        }
    }

    /// Estimated playback duration, floored at one second so very short
    /// announcements still get an audible window.
    fn estimate_duration(&self, byte_len: usize) -> Duration {
        let secs = (byte_len / self.assumed_bytes_per_sec).max(1);
        Duration::from_secs(secs as u64)
    }
}

impl SourceAdapter for VoiceAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::Voice
    }

    fn start(&self, track: &TrackRef) -> AppResult<Option<oneshot::Receiver<()>>> {
        let TrackRef::Voice { audio, label } = track else {
            return Err(AppError::SourceUnavailable(
                "voice adapter received a non-voice track".to_string(),
            ));
        };

        if audio.is_empty() {
            return Err(AppError::SourceUnavailable(
                "announcement carries no audio".to_string(),
            ));
        }

        let duration = self.estimate_duration(audio.len());
        info!(
            "Announcement playback started: {} ({} bytes, ~{}s)",
            label,
            audio.len(),
            duration.as_secs()
        );
        self.started.store(true, Ordering::SeqCst);

        // Completion signal fires after the estimated duration. If the
        // announcement is preempted or stopped first, the controller's
        // generation guard discards the late signal.
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let _ = tx.send(());
        });

        Ok(Some(rx))
    }

    fn stop(&self) -> AppResult<()> {
        if self.started.swap(false, Ordering::SeqCst) {
            info!("Announcement playback stopped");
        }
        Ok(())
    }

    fn status(&self) -> AdapterStatus {
        status_from_flag(&self.started)
    }

    fn set_volume(&self, volume: u8) {
        debug!("Announcement sink volume set to {}", volume);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;
    use uuid::Uuid;

    #[test]
    fn test_streaming_adapter_accepts_any_uri() {
        let adapter = StreamingAdapter::new();
        assert_eq!(adapter.status(), AdapterStatus::Idle);

        let track = TrackRef::Streaming {
            track_uri: "spotify:track:4uLU6hMCjMI75M1A2tKUQC".to_string(),
        };
        assert!(adapter.start(&track).unwrap().is_none());
        assert_eq!(adapter.status(), AdapterStatus::Started);

        adapter.stop().unwrap();
        assert_eq!(adapter.status(), AdapterStatus::Idle);
    }

    #[test]
    fn test_local_adapter_rejects_missing_content() {
        let adapter = LocalFileAdapter::new();
        let track = TrackRef::Local {
            file_id: Uuid::new_v4(),
            filename: "gone.mp3".to_string(),
            path: PathBuf::from("/nonexistent/gone.mp3"),
        };

        let err = adapter.start(&track).unwrap_err();
        assert!(matches!(err, AppError::SourceUnavailable(_)));
        assert_eq!(adapter.status(), AdapterStatus::Idle);
    }

    #[test]
    fn test_local_adapter_starts_on_existing_content() {
        let path = std::env::temp_dir().join(format!("adapter-test-{}.mp3", Uuid::new_v4()));
        std::fs::write(&path, b"abc").unwrap();

        let adapter = LocalFileAdapter::new();
        let track = TrackRef::Local {
            file_id: Uuid::new_v4(),
            filename: "present.mp3".to_string(),
            path: path.clone(),
        };
        assert!(adapter.start(&track).is_ok());
        assert_eq!(adapter.status(), AdapterStatus::Started);

        std::fs::remove_file(path).ok();
    }

    #[tokio::test(start_paused = true)]
    async fn test_voice_adapter_signals_completion() {
        let adapter = VoiceAdapter::new(16_000);
        let track = TrackRef::Voice {
            audio: Arc::new(vec![0u8; 32_000]),
            label: "Test announcement".to_string(),
        };

        let rx = adapter.start(&track).unwrap().expect("voice completes on its own");
        assert_eq!(adapter.status(), AdapterStatus::Started);

        // 32000 bytes at 16000 B/s: completion after ~2 virtual seconds
        rx.await.unwrap();
    }

    #[tokio::test]
    async fn test_voice_adapter_rejects_empty_announcement() {
        let adapter = VoiceAdapter::new(16_000);
        let track = TrackRef::Voice {
            audio: Arc::new(Vec::new()),
            label: "Empty".to_string(),
        };
        assert!(matches!(
            adapter.start(&track),
            Err(AppError::SourceUnavailable(_))
        ));
    }

    #[test]
    fn test_duration_estimate_has_floor() {
        let adapter = VoiceAdapter::new(16_000);
        assert_eq!(adapter.estimate_duration(100), Duration::from_secs(1));
        assert_eq!(adapter.estimate_duration(48_000), Duration::from_secs(3));
    }
}
