//! # Voice Ingestion
//!
//! Reconstructs a continuous announcement from the chunked voice data a
//! client records live, and drives text-to-speech announcements through the
//! same playback path.
//!
//! ## Session Lifecycle:
//! 1. **Open**: `begin_session` creates the one allowed in-flight session
//!    and arms its inactivity watchdog
//! 2. **Recording**: `append_chunk` appends fragments in receipt order and
//!    pushes the inactivity deadline out
//! 3. **Closed**: `end_session` (or the watchdog firing) assembles the
//!    fragments and hands them to the playback controller as a voice-kind
//!    play request; the session object is destroyed
//!
//! A closed session can never receive further chunks: late appends fail with
//! `UnknownSession` instead of being silently swallowed. Chunk ordering
//! within a session is the transport's responsibility (one WebSocket
//! connection per session); this module preserves whatever order it
//! receives.

use crate::error::{AppError, AppResult};
use crate::events::{Event, EventHub};
use crate::playback::PlaybackController;
use crate::voice::synthesis::SynthesisClient;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// One in-progress announcement recording.
struct VoiceSession {
    id: Uuid,
    /// Fragments in receipt order; assembled on close
    chunks: Vec<Vec<u8>>,
    started_at: DateTime<Utc>,
    /// Tokio clock so the watchdog cooperates with paused-time tests
    last_activity: tokio::time::Instant,
}

/// Snapshot of the active session for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct VoiceSessionInfo {
    pub id: Uuid,
    pub chunk_count: usize,
    pub byte_count: usize,
    pub started_at: DateTime<Utc>,
}

pub struct VoiceIngest {
    /// At most one recording session exists at a time
    active: Mutex<Option<VoiceSession>>,
    inactivity_timeout: Duration,
    max_chunk_bytes: usize,
    controller: Arc<PlaybackController>,
    synthesizer: SynthesisClient,
    hub: Arc<EventHub>,
}

impl VoiceIngest {
    pub fn new(
        inactivity_timeout: Duration,
        max_chunk_bytes: usize,
        controller: Arc<PlaybackController>,
        synthesizer: SynthesisClient,
        hub: Arc<EventHub>,
    ) -> Arc<Self> {
        Arc::new(Self {
            active: Mutex::new(None),
            inactivity_timeout,
            max_chunk_bytes,
            controller,
            synthesizer,
            hub,
        })
    }

    /// Open a new recording session and return its id.
    pub fn begin_session(self: &Arc<Self>) -> AppResult<Uuid> {
        let mut active = self.active.lock().unwrap();
        if active.is_some() {
            return Err(AppError::SessionAlreadyActive);
        }

        let id = Uuid::new_v4();
        *active = Some(VoiceSession {
            id,
            chunks: Vec::new(),
            started_at: Utc::now(),
            last_activity: tokio::time::Instant::now(),
        });
        drop(active);

        info!("Voice session {} opened", id);
        self.spawn_watchdog(id);
        Ok(id)
    }

    /// Append one chunk to the session and reset its inactivity deadline.
    pub fn append_chunk(&self, id: Uuid, bytes: Vec<u8>) -> AppResult<()> {
        if bytes.len() > self.max_chunk_bytes {
            return Err(AppError::BadRequest(format!(
                "voice chunk of {} bytes exceeds the {} byte limit",
                bytes.len(),
                self.max_chunk_bytes
            )));
        }

        let mut active = self.active.lock().unwrap();
        match active.as_mut() {
            Some(session) if session.id == id => {
                session.chunks.push(bytes);
                session.last_activity = tokio::time::Instant::now();
                Ok(())
            }
            _ => Err(AppError::UnknownSession(id.to_string())),
        }
    }

    /// Close the session and hand the assembled announcement to playback.
    pub fn end_session(self: &Arc<Self>, id: Uuid) -> AppResult<()> {
        self.close_and_play(id, "client ended recording")
    }

    /// Shared close path for explicit ends and watchdog timeouts.
    fn close_and_play(self: &Arc<Self>, id: Uuid, cause: &str) -> AppResult<()> {
        let session = {
            let mut active = self.active.lock().unwrap();
            match active.as_ref() {
                Some(current) if current.id == id => active.take().unwrap(),
                _ => return Err(AppError::UnknownSession(id.to_string())),
            }
        };

        let byte_count: usize = session.chunks.iter().map(Vec::len).sum();
        info!(
            "Voice session {} closed ({}): {} chunk(s), {} bytes",
            id,
            cause,
            session.chunks.len(),
            byte_count
        );

        if byte_count == 0 {
            // Nothing was ever recorded; there is no announcement to play
            return Ok(());
        }

        let mut audio = Vec::with_capacity(byte_count);
        for chunk in &session.chunks {
            audio.extend_from_slice(chunk);
        }

        // Chunks were accepted; a failure to start playback is shared with
        // every observer rather than returned to whoever happened to close
        // the session.
        if let Err(err) = self
            .controller
            .play_announcement(Arc::new(audio), "Live announcement".to_string())
        {
            warn!("Announcement playback failed: {}", err);
            self.hub.publish(&Event::AnnouncementFailed {
                reason: err.to_string(),
            });
        }

        Ok(())
    }

    /// Submit text to the synthesis provider and play the result.
    ///
    /// Returns as soon as the text is validated and submitted; synthesis and
    /// playback proceed in the background, and failures surface as one
    /// `announcement_failed` event.
    pub fn synthesize_and_play(self: &Arc<Self>, text: &str) -> AppResult<()> {
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(AppError::EmptyText);
        }

        let ingest = Arc::clone(self);
        tokio::spawn(async move {
            match ingest.synthesizer.synthesize(&text).await {
                Ok(audio) => {
                    let label = announcement_label(&text);
                    if let Err(err) = ingest
                        .controller
                        .play_announcement(Arc::new(audio), label)
                    {
                        warn!("Synthesized announcement failed to start: {}", err);
                        ingest.hub.publish(&Event::AnnouncementFailed {
                            reason: err.to_string(),
                        });
                    }
                }
                Err(err) => {
                    warn!("Synthesis failed: {}", err);
                    ingest.hub.publish(&Event::AnnouncementFailed {
                        reason: format!("synthesis failed: {}", err),
                    });
                }
            }
        });

        Ok(())
    }

    /// Snapshot of the active session, if any.
    pub fn active_session(&self) -> Option<VoiceSessionInfo> {
        self.active.lock().unwrap().as_ref().map(|session| VoiceSessionInfo {
            id: session.id,
            chunk_count: session.chunks.len(),
            byte_count: session.chunks.iter().map(Vec::len).sum(),
            started_at: session.started_at,
        })
    }

    /// Auto-close the session after the configured inactivity window, so a
    /// dropped client cannot orphan it.
    fn spawn_watchdog(self: &Arc<Self>, id: Uuid) {
        let ingest = Arc::clone(self);
        let timeout = self.inactivity_timeout;

        tokio::spawn(async move {
            let mut wait = timeout;
            loop {
                tokio::time::sleep(wait).await;

                let idle_for = {
                    let active = ingest.active.lock().unwrap();
                    match active.as_ref() {
                        Some(session) if session.id == id => session.last_activity.elapsed(),
                        // Session already closed; the watchdog retires
                        _ => return,
                    }
                };

                if idle_for >= timeout {
                    info!(
                        "Voice session {} idle for {:.1}s, auto-closing",
                        id,
                        idle_for.as_secs_f64()
                    );
                    let _ = ingest.close_and_play(id, "inactivity timeout");
                    return;
                }

                wait = timeout - idle_for;
            }
        });
    }
}

/// Short display label for a synthesized announcement.
fn announcement_label(text: &str) -> String {
    const MAX_LABEL_CHARS: usize = 40;
    if text.chars().count() <= MAX_LABEL_CHARS {
        text.to_string()
    } else {
        let prefix: String = text.chars().take(MAX_LABEL_CHARS).collect();
        format!("{}…", prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SynthesisConfig;
    use crate::playback::types::SourceKind;

    fn test_ingest() -> (Arc<VoiceIngest>, Arc<PlaybackController>) {
        let hub = Arc::new(EventHub::new());
        let controller = PlaybackController::new(hub.clone(), 16_000, 50);
        let synthesizer = SynthesisClient::new(&SynthesisConfig {
            endpoint: "http://127.0.0.1:5002/api/tts".to_string(),
            api_key: None,
            request_timeout_secs: 5,
        })
        .unwrap();
        let ingest = VoiceIngest::new(
            Duration::from_secs(5),
            1024 * 1024,
            controller.clone(),
            synthesizer,
            hub,
        );
        (ingest, controller)
    }

    #[tokio::test]
    async fn test_only_one_session_at_a_time() {
        let (ingest, _) = test_ingest();

        let id = ingest.begin_session().unwrap();
        assert!(matches!(
            ingest.begin_session().unwrap_err(),
            AppError::SessionAlreadyActive
        ));

        ingest.end_session(id).unwrap();
        // A fresh session is allowed once the first closed
        assert!(ingest.begin_session().is_ok());
    }

    #[tokio::test]
    async fn test_append_to_unknown_or_closed_session_fails() {
        let (ingest, _) = test_ingest();

        assert!(matches!(
            ingest.append_chunk(Uuid::new_v4(), vec![1, 2, 3]).unwrap_err(),
            AppError::UnknownSession(_)
        ));

        let id = ingest.begin_session().unwrap();
        ingest.append_chunk(id, vec![1, 2, 3]).unwrap();
        ingest.end_session(id).unwrap();

        // Late chunks are dropped and reported, never appended
        assert!(matches!(
            ingest.append_chunk(id, vec![4, 5, 6]).unwrap_err(),
            AppError::UnknownSession(_)
        ));
    }

    #[tokio::test]
    async fn test_end_session_plays_assembled_announcement() {
        let (ingest, controller) = test_ingest();

        let id = ingest.begin_session().unwrap();
        ingest.append_chunk(id, vec![1u8; 8_000]).unwrap();
        ingest.append_chunk(id, vec![2u8; 8_000]).unwrap();
        ingest.end_session(id).unwrap();

        let state = controller.current_state();
        assert!(state.playing);
        assert_eq!(state.source, SourceKind::Voice);
        assert_eq!(state.track.as_ref().unwrap().origin, "Announcement");
    }

    #[tokio::test]
    async fn test_empty_session_is_discarded() {
        let (ingest, controller) = test_ingest();

        let id = ingest.begin_session().unwrap();
        ingest.end_session(id).unwrap();

        assert!(!controller.current_state().playing);
        assert!(ingest.active_session().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_inactivity_timeout_auto_closes_session() {
        let (ingest, controller) = test_ingest();

        let id = ingest.begin_session().unwrap();
        ingest.append_chunk(id, vec![1u8; 16_000]).unwrap();

        // No further chunks: the watchdog closes the session as if the
        // client had ended it, and the announcement plays. Checked just
        // past the 5s window, before the announcement itself completes.
        tokio::time::sleep(Duration::from_millis(5_100)).await;
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }

        assert!(ingest.active_session().is_none());
        assert!(matches!(
            ingest.append_chunk(id, vec![2u8; 100]).unwrap_err(),
            AppError::UnknownSession(_)
        ));
        assert_eq!(controller.current_state().source, SourceKind::Voice);
    }

    #[tokio::test(start_paused = true)]
    async fn test_appends_push_the_deadline_out() {
        let (ingest, _) = test_ingest();

        let id = ingest.begin_session().unwrap();
        for _ in 0..3 {
            tokio::time::sleep(Duration::from_secs(3)).await;
            ingest.append_chunk(id, vec![0u8; 100]).unwrap();
        }

        // 9 seconds of wall time, but never 5 idle ones in a row
        assert!(ingest.active_session().is_some());
    }

    #[tokio::test]
    async fn test_oversized_chunk_is_rejected() {
        let hub = Arc::new(EventHub::new());
        let controller = PlaybackController::new(hub.clone(), 16_000, 50);
        let synthesizer = SynthesisClient::new(&SynthesisConfig {
            endpoint: "http://127.0.0.1:5002/api/tts".to_string(),
            api_key: None,
            request_timeout_secs: 5,
        })
        .unwrap();
        let ingest = VoiceIngest::new(Duration::from_secs(5), 8, controller, synthesizer, hub);

        let id = ingest.begin_session().unwrap();
        assert!(matches!(
            ingest.append_chunk(id, vec![0u8; 9]).unwrap_err(),
            AppError::BadRequest(_)
        ));
    }

    #[tokio::test]
    async fn test_blank_text_is_rejected_synchronously() {
        let (ingest, _) = test_ingest();
        assert!(matches!(
            ingest.synthesize_and_play("   ").unwrap_err(),
            AppError::EmptyText
        ));
    }

    #[test]
    fn test_announcement_label_truncates() {
        assert_eq!(announcement_label("Achtung"), "Achtung");
        let long = "x".repeat(60);
        let label = announcement_label(&long);
        assert_eq!(label.chars().count(), 41);
        assert!(label.ends_with('…'));
    }
}
