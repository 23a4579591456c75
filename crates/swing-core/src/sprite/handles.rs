//! Ephemeral resource handles.
//!
//! Generated sprite images and cue files live in memory behind opaque
//! handles until the caller releases them. A handle that was never
//! released is a leak; [`HandleRegistry::live_count`] makes that observable.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use uuid::Uuid;

/// Opaque reference to a registered blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceHandle(Uuid);

impl ResourceHandle {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blob:{}", self.0)
    }
}

/// A registered blob and its media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub bytes: Arc<[u8]>,
    pub mime: String,
}

/// Shared store of live handles.
#[derive(Debug, Clone, Default)]
pub struct HandleRegistry {
    entries: Arc<RwLock<HashMap<ResourceHandle, Resource>>>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register bytes and hand out a new handle.
    pub fn create(&self, bytes: Vec<u8>, mime: impl Into<String>) -> ResourceHandle {
        let handle = ResourceHandle::new();
        let resource = Resource {
            bytes: bytes.into(),
            mime: mime.into(),
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle, resource);
        handle
    }

    pub fn get(&self, handle: ResourceHandle) -> Option<Resource> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&handle)
            .cloned()
    }

    /// Release a handle. Releasing twice is harmless; returns whether it was live.
    pub fn release(&self, handle: ResourceHandle) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle)
            .is_some()
    }

    pub fn is_live(&self, handle: ResourceHandle) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&handle)
    }

    pub fn live_count(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_get_release() {
        let registry = HandleRegistry::new();
        let handle = registry.create(b"WEBVTT\n".to_vec(), "text/vtt");
        assert!(handle.to_string().starts_with("blob:"));
        assert_eq!(registry.live_count(), 1);

        let resource = registry.get(handle).unwrap();
        assert_eq!(&*resource.bytes, b"WEBVTT\n");
        assert_eq!(resource.mime, "text/vtt");

        assert!(registry.release(handle));
        assert!(!registry.release(handle));
        assert!(registry.get(handle).is_none());
        assert_eq!(registry.live_count(), 0);
    }
}
