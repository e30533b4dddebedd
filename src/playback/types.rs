//! Core playback types shared between the controller, adapters, handlers,
//! and the event channel.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Which source kind is (or should become) audible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Nothing is playing
    None,
    /// Streaming-service playback (placeholder integration)
    Streaming,
    /// Locally uploaded audio file
    Local,
    /// Voice announcement (recorded or synthesized)
    Voice,
}

impl SourceKind {
    /// String form used in log lines and API responses.
    pub fn as_str(&self) -> &str {
        match self {
            SourceKind::None => "none",
            SourceKind::Streaming => "streaming",
            SourceKind::Local => "local",
            SourceKind::Voice => "voice",
        }
    }
}

/// What is currently playing, for display purposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackInfo {
    /// Track name (filename, track URI, or announcement label)
    pub name: String,
    /// Origin label shown to clients ("Spotify", "Local File", "Announcement")
    pub origin: String,
}

/// The single "now playing" snapshot.
///
/// Exactly one mutable instance exists per server process, owned by the
/// playback controller. Everything outside the controller only ever sees
/// cloned snapshots of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub source: SourceKind,
    pub track: Option<TrackInfo>,
    pub playing: bool,
    /// Output volume in [0, 100]
    pub volume: u8,
}

impl PlaybackState {
    /// Idle state: no source, nothing playing, volume retained.
    pub fn idle(volume: u8) -> Self {
        Self {
            source: SourceKind::None,
            track: None,
            playing: false,
            volume,
        }
    }

    /// Playing state for the given source and track description.
    pub fn playing(source: SourceKind, name: &str, origin: &str, volume: u8) -> Self {
        Self {
            source,
            track: Some(TrackInfo {
                name: name.to_string(),
                origin: origin.to_string(),
            }),
            playing: true,
            volume,
        }
    }
}

/// Everything an adapter needs to start its source.
///
/// Voice audio is held behind an `Arc` so queued announcements and adapter
/// calls can share the assembled bytes without copying them.
#[derive(Debug, Clone)]
pub enum TrackRef {
    /// Streaming-service track reference (URI passed through verbatim)
    Streaming { track_uri: String },

    /// A file from the audio library, resolved to its stored content
    Local {
        file_id: Uuid,
        filename: String,
        path: PathBuf,
    },

    /// An assembled announcement ready for one-shot playback
    Voice { audio: Arc<Vec<u8>>, label: String },
}

impl TrackRef {
    /// The source kind this reference belongs to.
    pub fn kind(&self) -> SourceKind {
        match self {
            TrackRef::Streaming { .. } => SourceKind::Streaming,
            TrackRef::Local { .. } => SourceKind::Local,
            TrackRef::Voice { .. } => SourceKind::Voice,
        }
    }

    /// Display description for the playback state snapshot.
    pub fn track_info(&self) -> TrackInfo {
        match self {
            TrackRef::Streaming { track_uri } => TrackInfo {
                name: track_uri.clone(),
                origin: "Spotify".to_string(),
            },
            TrackRef::Local { filename, .. } => TrackInfo {
                name: filename.clone(),
                origin: "Local File".to_string(),
            },
            TrackRef::Voice { label, .. } => TrackInfo {
                name: label.clone(),
                origin: "Announcement".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&SourceKind::Voice).unwrap(), "\"voice\"");
        assert_eq!(serde_json::to_string(&SourceKind::None).unwrap(), "\"none\"");
    }

    #[test]
    fn test_track_ref_kind_and_info() {
        let track = TrackRef::Local {
            file_id: Uuid::new_v4(),
            filename: "song.mp3".to_string(),
            path: PathBuf::from("/tmp/song.mp3"),
        };
        assert_eq!(track.kind(), SourceKind::Local);
        let info = track.track_info();
        assert_eq!(info.name, "song.mp3");
        assert_eq!(info.origin, "Local File");
    }
}
