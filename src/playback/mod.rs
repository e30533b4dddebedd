//! # Playback Module
//!
//! The arbitration core: exactly one audio source may be audible at a time.
//!
//! ## Key Components:
//! - **Types**: the shared `PlaybackState` snapshot, source kinds, and track
//!   references handed to adapters
//! - **Adapters**: one uniform `{start, stop, status}` wrapper per source
//!   kind (streaming placeholder, local file, voice announcement)
//! - **Controller**: the state machine that owns the single `PlaybackState`,
//!   serializes transitions, and publishes every change to the event hub
//!
//! All mutation of "what is currently audible" funnels through
//! [`controller::PlaybackController`]; nothing else in the crate touches
//! playback state.

pub mod adapters;
pub mod controller;
pub mod types;

pub use controller::PlaybackController;
pub use types::{PlaybackState, SourceKind, TrackInfo, TrackRef};
