// Upload validation and the display-handle cache for binary media.
use bytes::Bytes;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::MediaConfig;
use crate::error::{ClientError, ClientResult};

pub const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    ProfilePhoto,
    CoverPhoto,
    PostMedia,
}

impl MediaKind {
    pub fn limit(&self, limits: &MediaConfig) -> u64 {
        match self {
            MediaKind::ProfilePhoto | MediaKind::CoverPhoto => limits.photo_max_bytes,
            MediaKind::PostMedia => limits.post_media_max_bytes,
        }
    }
}

fn too_large(limit: u64) -> ClientError {
    if limit % MIB == 0 {
        ClientError::validation(format!("File size must be less than {}MB", limit / MIB))
    } else {
        ClientError::validation(format!("File size must be less than {} bytes", limit))
    }
}

/// Bytes accepted for upload, with their MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUpload {
    pub kind: MediaKind,
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl MediaUpload {
    /// Reject a payload of `len` bytes that exceeds the limit for `kind`.
    pub fn check_size(kind: MediaKind, len: u64, limits: &MediaConfig) -> ClientResult<()> {
        let limit = kind.limit(limits);
        if len > limit {
            tracing::warn!(?kind, len, limit, "Rejected oversized media");
            return Err(too_large(limit));
        }
        Ok(())
    }

    pub fn new(
        kind: MediaKind,
        bytes: Vec<u8>,
        mime_type: impl Into<String>,
        limits: &MediaConfig,
    ) -> ClientResult<Self> {
        Self::check_size(kind, bytes.len() as u64, limits)?;
        Ok(Self {
            kind,
            bytes,
            mime_type: mime_type.into(),
        })
    }

    /// Read a file, checking its size before loading any bytes. The MIME
    /// type is guessed from the extension.
    pub fn from_path(kind: MediaKind, path: &Path, limits: &MediaConfig) -> ClientResult<Self> {
        let len = std::fs::metadata(path)?.len();
        Self::check_size(kind, len, limits)?;

        let bytes = std::fs::read(path)?;
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self::new(kind, bytes, mime_type, limits)
    }
}

/// Content identity of a media payload (blake3, hex encoded).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MediaKey(String);

impl MediaKey {
    pub fn of(bytes: &[u8]) -> Self {
        Self(hex::encode(blake3::hash(bytes).as_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A displayable resource reconstructed from returned bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaHandle {
    pub key: MediaKey,
    pub mime_type: Option<String>,
    pub data: Bytes,
}

impl MediaHandle {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

struct CacheEntry {
    handle: MediaHandle,
    refs: usize,
}

/// Reference-counted handle cache keyed by content hash. Identical payloads
/// share one handle; a handle is dropped when its last holder releases it.
#[derive(Clone, Default)]
pub struct MediaCache {
    entries: Arc<Mutex<HashMap<MediaKey, CacheEntry>>>,
}

impl MediaCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self, bytes: &[u8], mime_type: Option<&str>) -> MediaHandle {
        let key = MediaKey::of(bytes);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.entry(key.clone()).or_insert_with(|| CacheEntry {
            handle: MediaHandle {
                key,
                mime_type: mime_type.map(str::to_string),
                data: Bytes::copy_from_slice(bytes),
            },
            refs: 0,
        });
        entry.refs += 1;
        entry.handle.clone()
    }

    /// Drop one reference. Returns true when the handle itself was freed.
    pub fn release(&self, key: &MediaKey) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(entry) = entries.get_mut(key) else {
            return false;
        };
        entry.refs = entry.refs.saturating_sub(1);
        if entry.refs == 0 {
            entries.remove(key);
            return true;
        }
        false
    }

    pub fn refs(&self, key: &MediaKey) -> usize {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).map_or(0, |entry| entry.refs)
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The handles one view acquired. Single handles are released when their
/// holder goes away; whatever is left is released together on teardown.
pub struct MediaLeases {
    cache: MediaCache,
    keys: Vec<MediaKey>,
}

impl MediaLeases {
    pub fn new(cache: MediaCache) -> Self {
        Self {
            cache,
            keys: Vec::new(),
        }
    }

    pub fn acquire(&mut self, bytes: &[u8], mime_type: Option<&str>) -> MediaHandle {
        let handle = self.cache.acquire(bytes, mime_type);
        self.keys.push(handle.key.clone());
        handle
    }

    pub fn held(&self) -> usize {
        self.keys.len()
    }

    /// Give back one lease on `key`. False when this view held none.
    pub fn release(&mut self, key: &MediaKey) -> bool {
        let Some(pos) = self.keys.iter().position(|held| held == key) else {
            return false;
        };
        self.keys.swap_remove(pos);
        self.cache.release(key);
        true
    }

    pub fn release_all(&mut self) {
        for key in self.keys.drain(..) {
            self.cache.release(&key);
        }
    }
}

impl Drop for MediaLeases {
    fn drop(&mut self) {
        self.release_all();
    }
}
