// src/services/preview_store.rs
use crate::models::ImageInput;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

/// Handle to a displayable copy of a selected image. Must be released once it
/// is superseded or cleared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PreviewRef {
    pub id: Uuid,
}

impl PreviewRef {
    pub fn url(&self) -> String {
        format!("/api/v1/previews/{}", self.id)
    }
}

#[derive(Debug, Clone)]
pub struct PreviewEntry {
    pub media_type: String,
    pub data: Bytes,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct PreviewStore {
    entries: DashMap<Uuid, PreviewEntry>,
    created: AtomicUsize,
    released: AtomicUsize,
}

impl PreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, image: &ImageInput) -> PreviewRef {
        let id = Uuid::new_v4();
        self.entries.insert(
            id,
            PreviewEntry {
                media_type: image.media_type.clone(),
                data: image.data.clone(),
                created_at: Utc::now(),
            },
        );
        self.created.fetch_add(1, Ordering::SeqCst);
        debug!("Created preview {}", id);
        PreviewRef { id }
    }

    /// Idempotent: returns false if the preview was already gone.
    pub fn release(&self, preview: &PreviewRef) -> bool {
        let removed = self.entries.remove(&preview.id).is_some();
        if removed {
            self.released.fetch_add(1, Ordering::SeqCst);
            debug!("Released preview {}", preview.id);
        }
        removed
    }

    pub fn get(&self, id: &Uuid) -> Option<PreviewEntry> {
        self.entries.get(id).map(|entry| entry.value().clone())
    }

    pub fn live_count(&self) -> usize {
        self.entries.len()
    }

    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn released_count(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_is_idempotent() {
        let store = PreviewStore::new();
        let preview = store.create(&ImageInput::new("image/png", vec![7u8]));
        assert_eq!(store.live_count(), 1);
        assert_eq!(&store.get(&preview.id).unwrap().data[..], &[7u8]);

        assert!(store.release(&preview));
        assert!(!store.release(&preview));
        assert_eq!(store.live_count(), 0);
        assert_eq!(store.created_count(), 1);
        assert_eq!(store.released_count(), 1);
        assert!(store.get(&preview.id).is_none());
    }

    #[test]
    fn url_points_at_preview_route() {
        let preview = PreviewRef { id: Uuid::nil() };
        assert_eq!(
            preview.url(),
            "/api/v1/previews/00000000-0000-0000-0000-000000000000"
        );
    }
}
