//! Atomic flat-file persistence primitives
//!
//! Every store in the system shares two behaviors: corrupted or missing
//! content degrades to a default instead of an error, and writes go through
//! a temporary sibling file renamed over the target so a concurrent reader
//! never observes a partial document.

use crate::error::NidsResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Read and deserialize `path`, falling back to `T::default()` when the file
/// is missing, unreadable, or does not parse as a `T`.
pub fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => return T::default(),
    };
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "ignoring unparseable store content");
            T::default()
        }
    }
}

/// Serialize `value` and atomically replace `path` with it.
///
/// The temporary file lives next to the target so the rename stays on one
/// filesystem.
pub fn atomic_write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> NidsResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let serialized = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, serialized)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_default() {
        let dir = tempdir().unwrap();
        let v: Vec<String> = read_json_or_default(&dir.path().join("absent.json"));
        assert!(v.is_empty());
    }

    #[test]
    fn corrupt_file_yields_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();
        let v: Vec<u32> = read_json_or_default(&path);
        assert!(v.is_empty());
    }

    #[test]
    fn non_list_content_yields_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("object.json");
        fs::write(&path, r#"{"k": 1}"#).unwrap();
        let v: Vec<u32> = read_json_or_default(&path);
        assert!(v.is_empty());
    }

    #[test]
    fn write_is_atomic_and_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        atomic_write_json(&path, &vec![1u32, 2, 3]).unwrap();
        assert!(!path.with_extension("tmp").exists());
        let v: Vec<u32> = read_json_or_default(&path);
        assert_eq!(v, vec![1, 2, 3]);
    }
}
