use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::Builder;

use super::{Error, Snapshot, SnapshotStore};

const CACHE_FILE_NAME: &str = "available_models.json";

/// Stores the snapshot as `available_models.json` inside a cache directory.
pub(crate) struct JsonFileStore {
    dir: PathBuf,
    path: PathBuf,
}

impl JsonFileStore {
    /// Opens the store rooted at `dir`, creating the directory (and its
    /// parents) if it does not exist.
    pub(crate) fn new(dir: impl Into<PathBuf>) -> Result<JsonFileStore, Error> {
        let dir = dir.into();

        std::fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;

        let path = dir.join(CACHE_FILE_NAME);

        Ok(JsonFileStore { dir, path })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for JsonFileStore {
    fn read(&self) -> Result<Option<Snapshot>, Error> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(Error::io(&self.path, err)),
        };

        let snapshot = serde_json::from_str(&raw).map_err(Error::Corrupt)?;

        Ok(Some(snapshot))
    }

    fn write(&self, snapshot: &Snapshot) -> Result<(), Error> {
        let contents = serde_json::to_string_pretty(snapshot).map_err(Error::Serialize)?;

        // Written next to the target so the rename stays on one filesystem.
        let mut staged = Builder::new()
            .prefix(".available_models-")
            .suffix(".json")
            .tempfile_in(&self.dir)
            .map_err(|e| Error::io(&self.dir, e))?;

        staged
            .write_all(contents.as_bytes())
            .map_err(|e| Error::io(staged.path(), e))?;
        staged
            .as_file_mut()
            .sync_all()
            .map_err(|e| Error::io(staged.path(), e))?;

        staged
            .persist(&self.path)
            .map(|_| ())
            .map_err(|e| Error::io(&self.path, e.error))
    }

    fn clear(&self) -> Result<(), Error> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::io(&self.path, err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ModelEntry;
    use chrono::{TimeZone, Utc};

    fn snapshot() -> Snapshot {
        Snapshot::ranked(
            Utc.with_ymd_and_hms(2024, 11, 2, 10, 0, 0).unwrap(),
            vec![
                ModelEntry::unranked("gpt-4o", "openai"),
                ModelEntry::unranked("llama3:latest", "ollama"),
            ],
        )
    }

    #[test]
    fn test_missing_directory_is_created() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("xavail").join("model_availability");

        let store = JsonFileStore::new(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(store.path(), dir.join("available_models.json"));

        // Opening an existing directory is not an error.
        JsonFileStore::new(&dir).unwrap();
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();

        assert!(store.read().unwrap().is_none());

        store.write(&snapshot()).unwrap();

        assert_eq!(store.read().unwrap(), Some(snapshot()));
    }

    #[test]
    fn test_write_replaces_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();

        store.write(&snapshot()).unwrap();

        let smaller = Snapshot::ranked(Utc::now(), vec![ModelEntry::unranked("m", "s")]);
        store.write(&smaller).unwrap();

        assert_eq!(store.read().unwrap(), Some(smaller));

        // No staged files are left behind.
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("available_models.json")]);
    }

    #[test]
    fn test_failed_replace_leaves_no_staged_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();

        // A non-empty directory in place of the cache file cannot be replaced.
        std::fs::create_dir(store.path()).unwrap();
        std::fs::write(store.path().join("keep"), "").unwrap();

        assert!(matches!(store.write(&snapshot()), Err(Error::Io { .. })));

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("available_models.json")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_cache_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();

        store.write(&snapshot()).unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();

        std::fs::write(store.path(), r#"{ "timestamp": "2024-11-02T10:00:00Z" "#).unwrap();

        assert!(matches!(store.read(), Err(Error::Corrupt(_))));
    }

    #[test]
    fn test_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();

        store.write(&snapshot()).unwrap();
        store.clear().unwrap();

        assert!(!store.path().exists());

        // Clearing twice is fine.
        store.clear().unwrap();
    }
}
