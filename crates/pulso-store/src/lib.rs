use fs2::FileExt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub mod cache;
pub mod kv;

pub use cache::{ClientsCache, CLIENTS_KEY, CUSTOM_CSV_KEY};
pub use kv::{FileStore, KeyValueStore, MemoryStore};

/// Deterministic dataset id for a CSV path.
/// dataset_id = blake3(normalize_path(path)) → hex string (first 32 chars).
pub fn dataset_id(path: &Path) -> String {
    let normalized = normalize_path(path);
    let hash = blake3::hash(normalized.as_bytes());
    hash.to_hex()[..32].to_string()
}

/// Canonicalize when possible, forward slashes.
fn normalize_path(p: &Path) -> String {
    let abs = p
        .canonicalize()
        .unwrap_or_else(|_| p.to_path_buf())
        .to_string_lossy()
        .to_string();
    #[cfg(windows)]
    let abs = abs.to_lowercase();
    abs.replace('\\', "/")
}

/// Per-user store root: `<data_dir>/pulso/`, falling back to `~/.pulso/`.
pub fn store_root() -> PathBuf {
    if let Some(data_dir) = dirs::data_dir() {
        data_dir.join("pulso")
    } else if let Some(home) = dirs::home_dir() {
        home.join(".pulso")
    } else {
        PathBuf::from(".pulso-store")
    }
}

/// Cache directory for one dataset: `store_root/datasets/<dataset_id>/`
pub fn dataset_dir(root: &Path, csv_path: &Path) -> PathBuf {
    root.join("datasets").join(dataset_id(csv_path))
}

/// Atomic write: write to temp file in same dir, then rename.
pub fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("no parent dir for {}", path.display()))?;
    fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(data)?;
    tmp.flush()?;
    tmp.persist(path)?;
    Ok(())
}

/// Held for the duration of a write; released on drop.
pub struct LockGuard {
    _file: fs::File,
}

pub fn lock_file(path: &Path) -> anyhow::Result<LockGuard> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)?;
    file.lock_exclusive()?;
    Ok(LockGuard { _file: file })
}
