use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::{lock_file, write_atomic};

/// String-keyed persistence for serialized values.
pub trait KeyValueStore: Send + Sync {
    fn load(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn save(&self, key: &str, value: &str) -> anyhow::Result<()>;
    /// Removing a missing key is not an error.
    fn clear(&self, key: &str) -> anyhow::Result<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn load(&self, key: &str) -> anyhow::Result<Option<String>> {
        (**self).load(key)
    }

    fn save(&self, key: &str, value: &str) -> anyhow::Result<()> {
        (**self).save(key, value)
    }

    fn clear(&self, key: &str) -> anyhow::Result<()> {
        (**self).clear(key)
    }
}

/// One `<key>.json` file per key under `dir`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> anyhow::Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            anyhow::bail!("invalid store key: {key:?}");
        }
        Ok(self.dir.join(format!("{key}.json")))
    }

    fn lock_path(&self) -> PathBuf {
        self.dir.join(".lock")
    }
}

impl KeyValueStore for FileStore {
    fn load(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        let _lock = lock_file(&self.lock_path())?;
        write_atomic(&path, value.as_bytes())?;
        tracing::debug!(key, path = %path.display(), bytes = value.len(), "store saved");
        Ok(())
    }

    fn clear(&self, key: &str) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        let _lock = lock_file(&self.lock_path())?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> anyhow::Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self, key: &str) -> anyhow::Result<()> {
        self.entries()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(store: &dyn KeyValueStore) {
        assert_eq!(store.load("k").unwrap(), None);
        store.save("k", "[1,2]").unwrap();
        assert_eq!(store.load("k").unwrap().as_deref(), Some("[1,2]"));
        store.save("k", "[3]").unwrap();
        assert_eq!(store.load("k").unwrap().as_deref(), Some("[3]"));
        store.clear("k").unwrap();
        assert_eq!(store.load("k").unwrap(), None);
        store.clear("k").unwrap();
    }

    #[test]
    fn file_store_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::new(tmp.path().join("cache"));
        exercise(&store);
    }

    #[test]
    fn memory_store_roundtrip() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn file_store_writes_one_file_per_key() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::new(tmp.path());
        store.save("analyzed_clients", "[]").unwrap();
        assert!(tmp.path().join("analyzed_clients.json").is_file());
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileStore::new(tmp.path());
        assert!(store.save("../escape", "x").is_err());
        assert!(store.load("").is_err());
    }
}
