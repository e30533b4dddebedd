//! # Playback Controller
//!
//! Single source of truth for the "now playing" state and the only component
//! permitted to transition it.
//!
//! ## State Machine:
//! `Idle → Playing(source) → Idle`, where `Playing(A) → Playing(B)` always
//! passes through an implicit stop-of-A before start-of-B, so no two sources
//! are ever audible at once.
//!
//! ## Serialization:
//! All transitions happen behind one mutex. Adapter start/stop calls run
//! under that lock, which is exactly what makes "stop old, start new" atomic
//! with respect to concurrent play/stop/volume requests; the lock is never
//! held across anything but the transition itself, so reads contend with at
//! most one in-flight transition.
//!
//! ## Arbitration:
//! A voice announcement preempts streaming/local playback. A second
//! announcement arriving while one is playing is queued, not dropped, and
//! starts when the current one completes. Voice playback is fire-and-play:
//! its completion signal returns the controller to Idle (or starts the next
//! queued announcement) without an explicit stop. Every transition bumps a
//! generation counter, and completion signals carry the generation they
//! belong to, so a signal that arrives after the world has moved on is
//! discarded instead of clobbering newer state.

use crate::error::{AppError, AppResult};
use crate::events::{Event, EventHub};
use crate::playback::adapters::{
    AdapterStatus, LocalFileAdapter, SourceAdapter, StreamingAdapter, VoiceAdapter,
};
use crate::playback::types::{PlaybackState, SourceKind, TrackRef};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Everything guarded by the transition lock.
struct ControllerInner {
    state: PlaybackState,

    /// Bumped on every transition; stale completion signals are recognized
    /// by a generation mismatch.
    generation: u64,

    /// Announcements waiting behind the one currently playing.
    queue: VecDeque<TrackRef>,
}

/// Owns the one mutable [`PlaybackState`] per process.
pub struct PlaybackController {
    inner: Mutex<ControllerInner>,
    streaming: StreamingAdapter,
    local: LocalFileAdapter,
    voice: VoiceAdapter,
    hub: Arc<EventHub>,
}

impl PlaybackController {
    pub fn new(hub: Arc<EventHub>, assumed_bytes_per_sec: usize, initial_volume: u8) -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(ControllerInner {
                state: PlaybackState::idle(initial_volume.min(100)),
                generation: 0,
                queue: VecDeque::new(),
            }),
            streaming: StreamingAdapter::new(),
            local: LocalFileAdapter::new(),
            voice: VoiceAdapter::new(assumed_bytes_per_sec),
            hub,
        })
    }

    fn adapter_for(&self, kind: SourceKind) -> Option<&dyn SourceAdapter> {
        match kind {
            SourceKind::Streaming => Some(&self.streaming),
            SourceKind::Local => Some(&self.local),
            SourceKind::Voice => Some(&self.voice),
            SourceKind::None => None,
        }
    }

    /// Request playback of the given track, stopping whatever else is
    /// audible first.
    ///
    /// A voice request while another announcement is playing is queued and
    /// the current state is returned unchanged. On adapter failure the state
    /// reverts to Idle and the caller receives the adapter's
    /// `SourceUnavailable` error.
    pub fn request_play(self: &Arc<Self>, track: TrackRef) -> AppResult<PlaybackState> {
        let mut inner = self.inner.lock().unwrap();

        if track.kind() == SourceKind::Voice
            && inner.state.playing
            && inner.state.source == SourceKind::Voice
        {
            inner.queue.push_back(track);
            info!(
                "Announcement queued behind the current one ({} waiting)",
                inner.queue.len()
            );
            return Ok(inner.state.clone());
        }

        self.start_locked(&mut inner, track)
    }

    /// Stop-old / start-new under the already-held transition lock.
    fn start_locked(
        self: &Arc<Self>,
        inner: &mut ControllerInner,
        track: TrackRef,
    ) -> AppResult<PlaybackState> {
        let kind = track.kind();
        let was_playing = inner.state.playing;

        // Best-effort stop of the current source; a failing stop is logged
        // but never blocks starting the new source.
        if was_playing {
            if let Some(current) = self.adapter_for(inner.state.source) {
                if let Err(err) = current.stop() {
                    warn!(
                        "Failed to stop {} source: {}",
                        inner.state.source.as_str(),
                        err
                    );
                }
            }
        }

        inner.generation += 1;
        let generation = inner.generation;

        let adapter = self.adapter_for(kind).ok_or_else(|| {
            AppError::SourceUnavailable("cannot start the 'none' source".to_string())
        })?;

        match adapter.start(&track) {
            Ok(completion) => {
                adapter.set_volume(inner.state.volume);
                inner.state = PlaybackState {
                    source: kind,
                    track: Some(track.track_info()),
                    playing: true,
                    volume: inner.state.volume,
                };
                let snapshot = inner.state.clone();
                self.hub.publish(&Event::StateChanged {
                    state: snapshot.clone(),
                });

                if let Some(rx) = completion {
                    self.spawn_completion_watcher(generation, rx);
                }

                Ok(snapshot)
            }
            Err(err) => {
                // The old source is already stopped; the last known-good
                // state is Idle.
                inner.state = PlaybackState::idle(inner.state.volume);
                if was_playing {
                    self.hub.publish(&Event::StateChanged {
                        state: inner.state.clone(),
                    });
                }
                Err(err)
            }
        }
    }

    fn spawn_completion_watcher(self: &Arc<Self>, generation: u64, rx: oneshot::Receiver<()>) {
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            let _ = rx.await;
            controller.on_voice_complete(generation);
        });
    }

    /// Called when a voice announcement ran to its natural end.
    fn on_voice_complete(self: &Arc<Self>, generation: u64) {
        let mut inner = self.inner.lock().unwrap();
        if inner.generation != generation {
            debug!("Ignoring stale voice completion (generation {})", generation);
            return;
        }

        if let Err(err) = self.voice.stop() {
            warn!("Failed to release voice source after completion: {}", err);
        }

        if let Some(next) = inner.queue.pop_front() {
            info!(
                "Announcement finished; starting next queued one ({} still waiting)",
                inner.queue.len()
            );
            if let Err(err) = self.start_locked(&mut inner, next) {
                self.hub.publish(&Event::AnnouncementFailed {
                    reason: err.to_string(),
                });
            }
        } else {
            inner.generation += 1;
            inner.state = PlaybackState::idle(inner.state.volume);
            self.hub.publish(&Event::StateChanged {
                state: inner.state.clone(),
            });
        }
    }

    /// Stop whatever is playing. Safe to call in any state; a second stop in
    /// a row is a no-op. Explicit stop also drops queued announcements —
    /// stop means silence.
    pub fn stop(&self) -> PlaybackState {
        let mut inner = self.inner.lock().unwrap();

        if !inner.state.playing {
            return inner.state.clone();
        }

        if let Some(adapter) = self.adapter_for(inner.state.source) {
            if let Err(err) = adapter.stop() {
                warn!(
                    "Failed to stop {} source: {}",
                    inner.state.source.as_str(),
                    err
                );
            }
        }

        inner.generation += 1;
        let dropped = inner.queue.len();
        inner.queue.clear();
        if dropped > 0 {
            info!("Dropped {} queued announcement(s) on stop", dropped);
        }

        inner.state = PlaybackState::idle(inner.state.volume);
        self.hub.publish(&Event::StateChanged {
            state: inner.state.clone(),
        });
        inner.state.clone()
    }

    /// Clamp and apply a volume level. Always succeeds; the clamped value is
    /// observable in the returned state and the published event.
    pub fn set_volume(&self, requested: i64) -> PlaybackState {
        let clamped = requested.clamp(0, 100) as u8;
        let mut inner = self.inner.lock().unwrap();

        inner.state.volume = clamped;
        if inner.state.playing {
            if let Some(adapter) = self.adapter_for(inner.state.source) {
                adapter.set_volume(clamped);
            }
        }

        self.hub.publish(&Event::StateChanged {
            state: inner.state.clone(),
        });
        inner.state.clone()
    }

    /// Immutable snapshot of the current state.
    pub fn current_state(&self) -> PlaybackState {
        self.inner.lock().unwrap().state.clone()
    }

    /// Number of announcements waiting behind the current one.
    pub fn queued_announcements(&self) -> usize {
        self.inner.lock().unwrap().queue.len()
    }

    /// Adapter status per source kind, for health reporting and the mutual
    /// exclusion invariant.
    pub fn adapter_statuses(&self) -> [(SourceKind, AdapterStatus); 3] {
        [
            (SourceKind::Streaming, self.streaming.status()),
            (SourceKind::Local, self.local.status()),
            (SourceKind::Voice, self.voice.status()),
        ]
    }

    /// Convenience wrapper used by the voice ingestion path.
    pub fn play_announcement(
        self: &Arc<Self>,
        audio: Arc<Vec<u8>>,
        label: String,
    ) -> AppResult<PlaybackState> {
        self.request_play(TrackRef::Voice { audio, label })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;
    use uuid::Uuid;

    fn test_controller() -> Arc<PlaybackController> {
        PlaybackController::new(Arc::new(EventHub::new()), 16_000, 50)
    }

    fn temp_audio_file() -> PathBuf {
        let path = std::env::temp_dir().join(format!("controller-test-{}.mp3", Uuid::new_v4()));
        std::fs::write(&path, b"ID3 fake audio").unwrap();
        path
    }

    fn local_track(path: &PathBuf) -> TrackRef {
        TrackRef::Local {
            file_id: Uuid::new_v4(),
            filename: "party.mp3".to_string(),
            path: path.clone(),
        }
    }

    fn started_count(controller: &PlaybackController) -> usize {
        controller
            .adapter_statuses()
            .iter()
            .filter(|(_, status)| *status == AdapterStatus::Started)
            .count()
    }

    /// Let spawned watcher tasks and paused-clock timers run.
    async fn settle() {
        tokio::time::sleep(Duration::from_secs(10)).await;
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_mutual_exclusion_across_sources() {
        let controller = test_controller();
        let path = temp_audio_file();

        controller.request_play(local_track(&path)).unwrap();
        assert_eq!(started_count(&controller), 1);
        assert_eq!(controller.current_state().source, SourceKind::Local);

        controller
            .request_play(TrackRef::Streaming {
                track_uri: "spotify:track:abc".to_string(),
            })
            .unwrap();
        assert_eq!(started_count(&controller), 1);
        assert_eq!(controller.current_state().source, SourceKind::Streaming);

        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let controller = test_controller();
        let path = temp_audio_file();

        controller.request_play(local_track(&path)).unwrap();
        let after_first = controller.stop();
        assert!(!after_first.playing);
        assert_eq!(after_first.source, SourceKind::None);

        // Second stop is a no-op, never an error
        let after_second = controller.stop();
        assert_eq!(after_first, after_second);
        assert_eq!(started_count(&controller), 0);

        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_volume_is_clamped() {
        let controller = test_controller();

        assert_eq!(controller.set_volume(-5).volume, 0);
        assert_eq!(controller.set_volume(150).volume, 100);
        assert_eq!(controller.set_volume(42).volume, 42);
        assert_eq!(controller.current_state().volume, 42);
    }

    #[tokio::test]
    async fn test_volume_survives_transitions() {
        let controller = test_controller();
        let path = temp_audio_file();

        controller.set_volume(73);
        controller.request_play(local_track(&path)).unwrap();
        assert_eq!(controller.current_state().volume, 73);
        controller.stop();
        assert_eq!(controller.current_state().volume, 73);

        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_adapter_failure_reverts_to_idle() {
        let controller = test_controller();

        controller
            .request_play(TrackRef::Streaming {
                track_uri: "spotify:track:abc".to_string(),
            })
            .unwrap();

        let err = controller
            .request_play(TrackRef::Local {
                file_id: Uuid::new_v4(),
                filename: "gone.mp3".to_string(),
                path: PathBuf::from("/nonexistent/gone.mp3"),
            })
            .unwrap_err();
        assert!(matches!(err, AppError::SourceUnavailable(_)));

        // The old source was stopped and the failed start left us Idle
        let state = controller.current_state();
        assert!(!state.playing);
        assert_eq!(state.source, SourceKind::None);
        assert_eq!(started_count(&controller), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_voice_preempts_local_and_returns_to_idle() {
        let controller = test_controller();
        let path = temp_audio_file();

        controller.request_play(local_track(&path)).unwrap();

        controller
            .play_announcement(Arc::new(vec![0u8; 16_000]), "Achtung".to_string())
            .unwrap();
        let state = controller.current_state();
        assert_eq!(state.source, SourceKind::Voice);
        assert_eq!(state.track.as_ref().unwrap().name, "Achtung");
        assert_eq!(started_count(&controller), 1);

        // After the announcement completes, playback returns to Idle, not
        // back to the preempted local file.
        settle().await;
        let state = controller.current_state();
        assert!(!state.playing);
        assert_eq!(state.source, SourceKind::None);
        assert_eq!(started_count(&controller), 0);

        std::fs::remove_file(path).ok();
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_announcement_is_queued_then_played() {
        let controller = test_controller();

        controller
            .play_announcement(Arc::new(vec![0u8; 160_000]), "First".to_string())
            .unwrap();
        controller
            .play_announcement(Arc::new(vec![0u8; 80_000]), "Second".to_string())
            .unwrap();

        // Still playing the first; the second waits its turn
        let state = controller.current_state();
        assert_eq!(state.track.as_ref().unwrap().name, "First");
        assert_eq!(controller.queued_announcements(), 1);

        // First one runs ~10 virtual seconds; afterwards the queued one plays
        tokio::time::sleep(Duration::from_secs(11)).await;
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        let state = controller.current_state();
        assert!(state.playing);
        assert_eq!(state.track.as_ref().unwrap().name, "Second");
        assert_eq!(controller.queued_announcements(), 0);

        // And once the second completes, Idle
        settle().await;
        assert!(!controller.current_state().playing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_drops_queued_announcements() {
        let controller = test_controller();

        controller
            .play_announcement(Arc::new(vec![0u8; 160_000]), "First".to_string())
            .unwrap();
        controller
            .play_announcement(Arc::new(vec![0u8; 16_000]), "Second".to_string())
            .unwrap();
        assert_eq!(controller.queued_announcements(), 1);

        controller.stop();
        assert_eq!(controller.queued_announcements(), 0);

        // The first announcement's completion timer eventually fires, but its
        // generation is stale and must not resurrect anything.
        settle().await;
        assert!(!controller.current_state().playing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_completion_does_not_clobber_newer_state() {
        let controller = test_controller();
        let path = temp_audio_file();

        controller
            .play_announcement(Arc::new(vec![0u8; 16_000]), "Brief".to_string())
            .unwrap();

        // Preempt the announcement with local playback before it completes
        controller.request_play(local_track(&path)).unwrap();
        assert_eq!(controller.current_state().source, SourceKind::Local);

        // The announcement's completion fires into a newer generation and
        // must leave local playback untouched.
        settle().await;
        let state = controller.current_state();
        assert!(state.playing);
        assert_eq!(state.source, SourceKind::Local);

        std::fs::remove_file(path).ok();
    }
}
