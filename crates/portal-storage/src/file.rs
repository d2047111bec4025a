//! JSON file storage backend.
//!
//! The whole key/value map lives in one JSON object on disk. Every write
//! re-reads the file, applies the change, and replaces the file through a
//! temp file + rename, so readers never observe a half-written map.

use crate::{ClientStorage, StorageError, StorageResult};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

type Entries = BTreeMap<String, String>;

/// File-backed client storage.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStorage {
    /// Open storage at `path`, creating parent directories as needed.
    ///
    /// The file itself is created lazily on first write.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Self {
            path: path.to_path_buf(),
            lock: Mutex::new(()),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> StorageResult<Entries> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Entries::new()),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Entries::new());
        }

        match serde_json::from_str(&content) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Storage file is corrupt, treating as empty"
                );
                Ok(Entries::new())
            }
        }
    }

    fn write_entries(&self, entries: &Entries) -> StorageResult<()> {
        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| StorageError::Encoding(e.to_string()))?;

        let tmp_path = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp_path)?;
            restrict_permissions(&file)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(file: &fs::File) -> StorageResult<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &fs::File) -> StorageResult<()> {
    Ok(())
}

impl ClientStorage for FileStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let _guard = self.lock.lock();
        let mut entries = self.read_entries()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_entries(&entries)
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let _guard = self.lock.lock();
        Ok(self.read_entries()?.remove(key))
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        let _guard = self.lock.lock();
        let mut entries = self.read_entries()?;
        let existed = entries.remove(key).is_some();
        if existed {
            self.write_entries(&entries)?;
        }
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_set_get_delete() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::open(&dir.path().join("storage.json")).unwrap();

        assert_eq!(storage.get("authTokens").unwrap(), None);

        storage.set("authTokens", r#"{"access":"A","refresh":"R"}"#).unwrap();
        assert_eq!(
            storage.get("authTokens").unwrap().as_deref(),
            Some(r#"{"access":"A","refresh":"R"}"#)
        );

        assert!(storage.delete("authTokens").unwrap());
        assert!(!storage.delete("authTokens").unwrap());
        assert!(!storage.has("authTokens").unwrap());
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        FileStorage::open(&path).unwrap().set("userInfo", "{}").unwrap();

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get("userInfo").unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_corrupt_file_reads_as_empty_and_is_replaced_on_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "{not json").unwrap();

        let storage = FileStorage::open(&path).unwrap();
        assert_eq!(storage.get("authTokens").unwrap(), None);

        storage.set("access_token", "legacy").unwrap();
        assert_eq!(
            storage.get("access_token").unwrap().as_deref(),
            Some("legacy")
        );

        let on_disk: Entries = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk.len(), 1);
    }

    #[test]
    fn test_other_keys_untouched_by_writes() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::open(&dir.path().join("storage.json")).unwrap();

        storage.set("a", "1").unwrap();
        storage.set("b", "2").unwrap();
        storage.delete("a").unwrap();

        assert_eq!(storage.get("b").unwrap().as_deref(), Some("2"));
        assert!(!dir.path().join("storage.json.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("storage.json");
        FileStorage::open(&path).unwrap().set("k", "v").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
