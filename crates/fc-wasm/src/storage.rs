//! `window.localStorage` as snapshot storage.

use fc_editor::{SnapshotError, SnapshotStorage};

/// Browser storage; text only, so snapshots must use the JSON format.
///
/// When storage is unavailable (private mode, sandboxed iframe) every call
/// fails with `SnapshotError::Storage` and the canvas runs unsaved.
pub struct LocalStorage {
    inner: Option<web_sys::Storage>,
}

impl LocalStorage {
    pub fn open() -> Self {
        let inner = web_sys::window().and_then(|w| w.local_storage().ok().flatten());
        if inner.is_none() {
            log::warn!("localStorage is unavailable; snapshots will not be saved");
        }
        Self { inner }
    }

    fn storage(&self) -> Result<&web_sys::Storage, SnapshotError> {
        self.inner
            .as_ref()
            .ok_or_else(|| SnapshotError::Storage("localStorage is unavailable".into()))
    }
}

impl SnapshotStorage for LocalStorage {
    fn name(&self) -> &str {
        "LocalStorage"
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), SnapshotError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| SnapshotError::Storage("localStorage only holds text snapshots".into()))?;
        self.storage()?
            .set_item(key, text)
            .map_err(|e| SnapshotError::Storage(format!("{e:?}")))
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SnapshotError> {
        let value = self
            .storage()?
            .get_item(key)
            .map_err(|e| SnapshotError::Storage(format!("{e:?}")))?;
        Ok(value.map(String::into_bytes))
    }
}
