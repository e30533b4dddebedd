//! # Audio Library
//!
//! Catalog of uploaded audio files: validation on ingest, deterministic
//! listing, lookup by id. Records are immutable once created and ids are
//! never reused (fresh v4 UUID per upload; the disk store additionally
//! refuses to overwrite content, which would expose any reuse).
//!
//! ## Thread Safety:
//! The catalog is append-mostly: many concurrent readers, serialized writes
//! behind an `RwLock`. Content is written to disk *before* the catalog lock
//! is taken, so the lock is never held across I/O.

use crate::audio::store::DiskStore;
use crate::error::{AppError, AppResult};
use crate::events::{Event, EventHub};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::info;
use uuid::Uuid;

/// Extensions accepted for upload, matched case-insensitively.
const ACCEPTED_EXTENSIONS: [&str; 4] = ["mp3", "wav", "m4a", "ogg"];

/// A cataloged audio file.
#[derive(Debug, Clone)]
pub struct AudioFile {
    pub id: Uuid,
    /// Original filename as the client supplied it
    pub filename: String,
    /// Content handle: where the bytes live on disk (never exposed to clients)
    pub stored_path: PathBuf,
    pub uploaded_at: DateTime<Utc>,
}

/// Client-facing summary of a cataloged file.
#[derive(Debug, Clone, Serialize)]
pub struct AudioFileMeta {
    pub id: Uuid,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
}

impl AudioFile {
    pub fn meta(&self) -> AudioFileMeta {
        AudioFileMeta {
            id: self.id,
            filename: self.filename.clone(),
            uploaded_at: self.uploaded_at,
        }
    }
}

/// Extract the lowercase extension, if any.
fn extension_of(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

pub struct AudioLibrary {
    /// Insertion-ordered catalog; upload time is monotone per process, so
    /// insertion order *is* uploaded-at ascending order.
    files: RwLock<Vec<AudioFile>>,
    store: DiskStore,
    hub: Arc<EventHub>,
}

impl AudioLibrary {
    pub fn new(store: DiskStore, hub: Arc<EventHub>) -> Self {
        Self {
            files: RwLock::new(Vec::new()),
            store,
            hub,
        }
    }

    /// Validate and ingest an upload.
    ///
    /// ## Validation:
    /// - the filename must carry an accepted audio extension
    ///   (`UnsupportedFormat`)
    /// - the content must be non-empty (`EmptyUpload`)
    ///
    /// On success the content is stored, the catalog records the new file,
    /// and an `audio_uploaded` event is published.
    pub async fn upload(&self, filename: &str, content: &[u8]) -> AppResult<AudioFileMeta> {
        let ext = match extension_of(filename) {
            Some(ext) if ACCEPTED_EXTENSIONS.contains(&ext.as_str()) => ext,
            Some(ext) => return Err(AppError::UnsupportedFormat(format!(".{}", ext))),
            None => {
                return Err(AppError::UnsupportedFormat(format!(
                    "{} (no extension)",
                    filename
                )))
            }
        };

        if content.is_empty() {
            return Err(AppError::EmptyUpload);
        }

        let id = Uuid::new_v4();
        let stored_path = self.store.save(&format!("{}.{}", id, ext), content).await?;

        let file = AudioFile {
            id,
            filename: filename.to_string(),
            stored_path,
            uploaded_at: Utc::now(),
        };
        let meta = file.meta();

        self.files.write().unwrap().push(file);
        info!("Cataloged upload {} as {}", filename, id);

        self.hub.publish(&Event::AudioUploaded { file: meta.clone() });
        Ok(meta)
    }

    /// All files, ordered by upload time ascending.
    pub fn list(&self) -> Vec<AudioFileMeta> {
        self.files.read().unwrap().iter().map(AudioFile::meta).collect()
    }

    /// Look up a file by id.
    pub fn get(&self, id: Uuid) -> AppResult<AudioFile> {
        self.files
            .read()
            .unwrap()
            .iter()
            .find(|f| f.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("audio file {}", id)))
    }

    pub fn file_count(&self) -> usize {
        self.files.read().unwrap().len()
    }
}
