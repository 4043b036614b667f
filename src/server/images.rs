//! Image file storage.
//!
//! The registry only ever holds opaque filenames; the bytes live here, under
//! `<data_dir>/images/`. Files keep their uploaded names, so names are
//! validated against path traversal before any write.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::ApiError;

/// Stores uploaded images under a single directory.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Rejects filenames that could escape the image directory.
    fn validate_filename(name: &str) -> Result<(), ApiError> {
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name.contains("..")
            || name.starts_with('.')
        {
            return Err(ApiError::Validation(format!(
                "Invalid image filename '{}'",
                name
            )));
        }
        Ok(())
    }

    /// Saves image bytes under `filename`, replacing any existing file.
    ///
    /// Writes via temp file + rename so a crash never leaves a truncated
    /// image behind. The temp name carries a fresh uuid, so concurrent
    /// uploads of the same filename each write their own temp file and the
    /// last rename wins.
    pub fn save(&self, filename: &str, bytes: &[u8]) -> Result<(), ApiError> {
        Self::validate_filename(filename)?;

        fs::create_dir_all(&self.dir).map_err(storage_err)?;

        let path = self.dir.join(filename);
        let temp_path = self.dir.join(format!("{}.{}.tmp", filename, Uuid::new_v4()));

        fs::write(&temp_path, bytes).map_err(storage_err)?;
        fs::rename(&temp_path, &path).map_err(storage_err)?;

        Ok(())
    }

    /// Lists stored image filenames, sorted for stable output.
    ///
    /// Temp files from interrupted writes are not images and are skipped.
    pub fn list(&self) -> Result<Vec<String>, ApiError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(storage_err(e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(storage_err)?;
            if let Ok(name) = entry.file_name().into_string() {
                if name.ends_with(".tmp") {
                    continue;
                }
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}

fn storage_err(e: io::Error) -> ApiError {
    ApiError::Storage(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (ImageStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = ImageStore::new(temp_dir.path().join("images"));
        (store, temp_dir)
    }

    #[test]
    fn test_save_and_list() {
        let (store, _temp) = setup();

        store.save("home-v1.png", b"png bytes").unwrap();
        store.save("home-v2.png", b"more bytes").unwrap();

        assert_eq!(store.list().unwrap(), vec!["home-v1.png", "home-v2.png"]);
        assert_eq!(
            fs::read(store.dir().join("home-v1.png")).unwrap(),
            b"png bytes"
        );
    }

    #[test]
    fn test_list_empty_before_first_save() {
        let (store, _temp) = setup();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_save_overwrites() {
        let (store, _temp) = setup();

        store.save("a.png", b"one").unwrap();
        store.save("a.png", b"two").unwrap();

        assert_eq!(fs::read(store.dir().join("a.png")).unwrap(), b"two");
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_list_skips_leftover_temp_files() {
        let (store, _temp) = setup();

        store.save("a.png", b"bytes").unwrap();
        // simulate a write interrupted before its rename
        fs::write(store.dir().join("b.png.1234.tmp"), b"partial").unwrap();

        assert_eq!(store.list().unwrap(), vec!["a.png"]);
    }

    #[test]
    fn test_concurrent_saves_of_same_filename() {
        let (store, _temp) = setup();
        let store = std::sync::Arc::new(store);

        let mut handles = Vec::new();
        for i in 0..8u8 {
            let store = std::sync::Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                store.save("contested.png", &[i; 16]).unwrap();
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // one winner, no temp debris in the listing
        assert_eq!(store.list().unwrap(), vec!["contested.png"]);
        assert_eq!(fs::read(store.dir().join("contested.png")).unwrap().len(), 16);
    }

    #[test]
    fn test_rejects_traversal_filenames() {
        let (store, _temp) = setup();

        for name in ["", "../evil.png", "a/b.png", "a\\b.png", ".hidden"] {
            let result = store.save(name, b"x");
            assert!(
                matches!(result, Err(ApiError::Validation(_))),
                "accepted {:?}",
                name
            );
        }
    }
}
