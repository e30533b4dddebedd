//! # Voice Announcement Module
//!
//! Everything that turns announcements into playback:
//! - **Ingest**: reassembles the chunked voice data a client records live,
//!   with an explicit open/close lifecycle and an inactivity timeout that
//!   cleans up after dropped clients
//! - **Synthesis**: the external text-to-speech provider client; synthesized
//!   audio flows into the same voice-kind playback path as recorded
//!   announcements

pub mod ingest;
pub mod synthesis;

pub use ingest::{VoiceIngest, VoiceSessionInfo};
pub use synthesis::SynthesisClient;
