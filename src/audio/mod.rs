//! # Audio Library Module
//!
//! The durable catalog of uploaded audio files.
//!
//! ## Key Components:
//! - **Library**: metadata catalog with validation, ordered listing, and
//!   lookup by id; publishes `audio_uploaded` events so connected clients
//!   can refresh their view
//! - **Store**: the disk collaborator that holds uploaded content under the
//!   configured uploads directory
//!
//! ## Accepted Formats:
//! `.mp3`, `.wav`, `.m4a`, `.ogg` — matched case-insensitively on the file
//! extension. Anything else is rejected before any bytes hit the disk.

pub mod library;
pub mod store;

pub use library::{AudioFile, AudioFileMeta, AudioLibrary};
pub use store::DiskStore;
