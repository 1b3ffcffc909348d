use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use tracing::debug;

use crate::artifact::ArtifactKind;
use crate::error::{EngineError, Result};

/// Identifier of one materialized media handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandleId(pub u64);

impl Display for HandleId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "media:{}", self.0)
    }
}

/// Transient binary response for one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMedia {
    pub content_type: String,
    pub bytes: Arc<[u8]>,
}

impl From<analysis_http::ArtifactPayload> for FetchedMedia {
    fn from(value: analysis_http::ArtifactPayload) -> Self {
        Self {
            content_type: value.content_type,
            bytes: value.bytes,
        }
    }
}

/// Owned, revocable reference to fetched media.
///
/// Deliberately not `Clone`: [`MediaStore::revoke`] takes the handle by
/// value, so one handle can be revoked at most once.
#[derive(Debug, PartialEq, Eq)]
pub struct MediaHandle {
    id: HandleId,
    kind: ArtifactKind,
    content_type: String,
    bytes: Arc<[u8]>,
}

impl MediaHandle {
    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Read-only view handed to renderers.
    pub fn view(&self) -> MediaView {
        MediaView {
            id: self.id,
            kind: self.kind,
            content_type: self.content_type.clone(),
            bytes: Arc::clone(&self.bytes),
        }
    }
}

/// Cloneable view of a live handle's media.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaView {
    pub id: HandleId,
    pub kind: ArtifactKind,
    pub content_type: String,
    pub bytes: Arc<[u8]>,
}

impl MediaView {
    pub fn is_video(&self) -> bool {
        self.content_type.starts_with("video/")
    }

    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Creates and revokes media handles.
pub trait MediaStore {
    /// Materializes a handle for `media`.
    fn create(&mut self, kind: ArtifactKind, media: FetchedMedia) -> MediaHandle;

    /// Invalidates a handle.
    fn revoke(&mut self, handle: MediaHandle) -> Result<()>;

    /// Number of handles created and not yet revoked.
    fn live_count(&self) -> usize;
}

/// Process-local handle store.
#[derive(Debug, Default)]
pub struct InMemoryMediaStore {
    next_id: u64,
    live: HashSet<HandleId>,
}

impl InMemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_live(&self, id: HandleId) -> bool {
        self.live.contains(&id)
    }
}

impl MediaStore for InMemoryMediaStore {
    fn create(&mut self, kind: ArtifactKind, media: FetchedMedia) -> MediaHandle {
        self.next_id += 1;
        let id = HandleId(self.next_id);
        self.live.insert(id);
        debug!(%id, %kind, content_type = %media.content_type, len = media.bytes.len(), "media handle created");
        MediaHandle {
            id,
            kind,
            content_type: media.content_type,
            bytes: media.bytes,
        }
    }

    fn revoke(&mut self, handle: MediaHandle) -> Result<()> {
        if !self.live.remove(&handle.id) {
            return Err(EngineError::HandleNotLive {
                handle_id: handle.id.0,
            });
        }
        debug!(id = %handle.id, kind = %handle.kind, "media handle revoked");
        Ok(())
    }

    fn live_count(&self) -> usize {
        self.live.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{FetchedMedia, InMemoryMediaStore, MediaHandle, MediaStore};
    use crate::artifact::ArtifactKind;
    use crate::error::EngineError;

    fn media(content_type: &str) -> FetchedMedia {
        FetchedMedia {
            content_type: content_type.to_owned(),
            bytes: Arc::from(vec![1_u8, 2, 3]),
        }
    }

    #[test]
    fn create_allocates_distinct_live_handles() {
        let mut store = InMemoryMediaStore::new();

        let first = store.create(ArtifactKind::Video, media("video/mp4"));
        let second = store.create(ArtifactKind::Ecg, media("image/png"));

        assert_ne!(first.id(), second.id());
        assert_eq!(store.live_count(), 2);
        assert!(first.view().is_video());
        assert!(second.view().is_image());
    }

    #[test]
    fn revoke_releases_the_handle() {
        let mut store = InMemoryMediaStore::new();
        let handle = store.create(ArtifactKind::Mask, media("image/png"));
        let id = handle.id();

        store.revoke(handle).expect("revoke should succeed");

        assert!(!store.is_live(id));
        assert_eq!(store.live_count(), 0);
    }

    #[test]
    fn revoking_a_foreign_handle_is_reported() {
        let mut owner = InMemoryMediaStore::new();
        let mut other = InMemoryMediaStore::new();
        let handle: MediaHandle = owner.create(ArtifactKind::Video, media("video/mp4"));

        let result = other.revoke(handle);

        assert!(matches!(result, Err(EngineError::HandleNotLive { handle_id: 1 })));
    }
}
