//! Storage Adapters
//!
//! [`FileStore`] is the durable store the desk runs on: one file per key
//! under a single directory, shared by every client process on the
//! machine. [`MemoryStore`] backs tests.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;
use uuid::Uuid;

use crate::application::ports::{KeyValueStore, StoreKey};

// =============================================================================
// File Store
// =============================================================================

/// Durable storage under a single directory, one file per key.
///
/// Filenames are the percent-encoded key string, which keeps separator
/// and identity characters filesystem-safe. Writes land in a temp file
/// first and are renamed into place, so a reader sees either the old
/// bytes or the new bytes, never a torn mix.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open the store directory, creating it if needed.
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &StoreKey) -> PathBuf {
        self.root
            .join(urlencoding::encode(&key.to_string()).as_ref())
    }

    fn write_atomic(&self, path: &Path, value: &[u8]) -> io::Result<()> {
        // unique temp name, so concurrent writers never clobber each
        // other's in-flight file
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(format!(".{}.tmp", Uuid::new_v4()));
        let tmp = PathBuf::from(tmp);

        let written = File::create(&tmp).and_then(|mut file| {
            file.write_all(value)?;
            file.sync_all()
        });
        match written {
            Ok(()) => fs::rename(&tmp, path),
            Err(error) => {
                let _ = fs::remove_file(&tmp);
                Err(error)
            }
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &StoreKey) -> Option<Vec<u8>> {
        let path = self.path_for(key);
        match fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(error) if error.kind() == ErrorKind::NotFound => None,
            Err(error) => {
                warn!(%key, %error, "store read failed, treating the key as absent");
                None
            }
        }
    }

    fn put(&self, key: &StoreKey, value: &[u8]) {
        let path = self.path_for(key);
        if let Err(error) = self.write_atomic(&path, value) {
            warn!(%key, %error, "store write failed, keeping the previous value");
        }
    }

    fn remove(&self, key: &StoreKey) {
        if let Err(error) = fs::remove_file(self.path_for(key)) {
            if error.kind() != ErrorKind::NotFound {
                warn!(%key, %error, "store delete failed");
            }
        }
    }
}

// =============================================================================
// Memory Store
// =============================================================================

/// In-memory store for tests. Clones share the map, which is how one
/// test points several clients at the same "disk".
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &StoreKey) -> Option<Vec<u8>> {
        self.entries.read().get(&key.to_string()).cloned()
    }

    fn put(&self, key: &StoreKey, value: &[u8]) {
        self.entries.write().insert(key.to_string(), value.to_vec());
    }

    fn remove(&self, key: &StoreKey) {
        self.entries.write().remove(&key.to_string());
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::domain::identity::Identity;

    fn subs_key() -> StoreKey {
        StoreKey::Subscriptions(Identity::new("u@x.com"))
    }

    #[test]
    fn file_store_round_trips_bytes() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        assert_eq!(store.get(&subs_key()), None);
        store.put(&subs_key(), br#"["GOOG"]"#);
        assert_eq!(store.get(&subs_key()), Some(br#"["GOOG"]"#.to_vec()));
    }

    #[test]
    fn file_store_overwrites_whole_values() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        store.put(&subs_key(), br#"["GOOG","TSLA"]"#);
        store.put(&subs_key(), br"[]");
        assert_eq!(store.get(&subs_key()), Some(br"[]".to_vec()));
    }

    #[test]
    fn file_store_remove_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();

        store.put(&subs_key(), b"x");
        store.remove(&subs_key());
        store.remove(&subs_key());
        assert_eq!(store.get(&subs_key()), None);
    }

    #[test]
    fn file_store_encodes_key_separators() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.put(&subs_key(), b"x");

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(!names[0].contains(':'));
        assert!(names[0].starts_with("subscriptions%3A"));
    }

    #[test]
    fn file_store_leaves_no_temp_files_behind() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        for _ in 0..5 {
            store.put(&subs_key(), br#"["GOOG"]"#);
        }

        let leftovers = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn file_stores_share_state_through_the_directory() {
        let dir = tempdir().unwrap();
        let writer = FileStore::open(dir.path()).unwrap();
        let reader = FileStore::open(dir.path()).unwrap();

        writer.put(&StoreKey::LastIdentity, b"u@x.com");
        assert_eq!(
            reader.get(&StoreKey::LastIdentity),
            Some(b"u@x.com".to_vec())
        );
    }

    #[test]
    fn memory_store_clones_share_entries() {
        let store = MemoryStore::default();
        let clone = store.clone();

        store.put(&StoreKey::LastIdentity, b"u@x.com");
        assert_eq!(
            clone.get(&StoreKey::LastIdentity),
            Some(b"u@x.com".to_vec())
        );

        clone.remove(&StoreKey::LastIdentity);
        assert_eq!(store.get(&StoreKey::LastIdentity), None);
    }
}
