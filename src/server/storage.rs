//! Project snapshot persistence.
//!
//! In-memory state is authoritative; this store writes each project to
//! `<data_dir>/projects/<id>.json` after mutations and reloads everything at
//! startup. Writes go through a temp file + rename so a crash mid-write
//! never corrupts a snapshot.

use std::fs;
use std::io;
use std::path::PathBuf;

use crate::error::ApiError;
use crate::models::Project;

/// Persists projects as one JSON file each.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    dir: PathBuf,
}

impl ProjectStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn project_path(&self, project: &Project) -> PathBuf {
        self.dir.join(format!("{}.json", project.id))
    }

    /// Writes one project's snapshot, replacing any previous one.
    pub fn save(&self, project: &Project) -> Result<(), ApiError> {
        fs::create_dir_all(&self.dir).map_err(storage_err)?;

        let path = self.project_path(project);
        let temp_path = path.with_extension("json.tmp");

        let bytes = serde_json::to_vec_pretty(project).map_err(|e| {
            ApiError::Storage(format!("Failed to serialize project {}: {}", project.id, e))
        })?;

        fs::write(&temp_path, bytes).map_err(storage_err)?;
        fs::rename(&temp_path, &path).map_err(storage_err)?;

        Ok(())
    }

    /// Loads all persisted projects, oldest first.
    ///
    /// Ordering by creation time reproduces the original project listing
    /// order after a restart. Unparseable files fail the load rather than
    /// being skipped silently.
    pub fn load_all(&self) -> Result<Vec<Project>, ApiError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(storage_err(e)),
        };

        let mut projects = Vec::new();
        for entry in entries {
            let entry = entry.map_err(storage_err)?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let contents = fs::read_to_string(&path).map_err(storage_err)?;
            let project: Project = serde_json::from_str(&contents).map_err(|e| {
                ApiError::Storage(format!("Failed to parse {}: {}", path.display(), e))
            })?;
            projects.push(project);
        }

        projects.sort_by_key(|p| p.created_at);
        Ok(projects)
    }
}

fn storage_err(e: io::Error) -> ApiError {
    ApiError::Storage(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use tempfile::TempDir;

    fn setup() -> (ProjectStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = ProjectStore::new(temp_dir.path().join("projects"));
        (store, temp_dir)
    }

    #[test]
    fn test_load_all_empty_dir() {
        let (store, _temp) = setup();
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_save_and_reload_roundtrip() {
        let (store, _temp) = setup();

        let mut registry = Registry::new();
        let id = registry.create_project("Homepage", "home-v1.png").unwrap();
        registry.append_revision(id, "home-v2.png").unwrap();
        registry
            .add_or_merge_comment(id, 1, 10.0, 10.0, "alice", "too dark")
            .unwrap();

        store.save(registry.get_project(id).unwrap()).unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, id);
        assert_eq!(loaded[0].name, "Homepage");
        assert_eq!(loaded[0].revisions.len(), 2);
        assert_eq!(loaded[0].revisions[1].points.len(), 1);
    }

    #[test]
    fn test_load_all_sorted_by_creation_time() {
        let (store, _temp) = setup();

        let mut registry = Registry::new();
        let first = registry.create_project("First", "a.png").unwrap();
        let second = registry.create_project("Second", "b.png").unwrap();

        // Save in reverse to prove ordering comes from created_at, not the
        // directory listing.
        store.save(registry.get_project(second).unwrap()).unwrap();
        store.save(registry.get_project(first).unwrap()).unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded[0].id, first);
        assert_eq!(loaded[1].id, second);
    }

    #[test]
    fn test_save_overwrites_previous_snapshot() {
        let (store, _temp) = setup();

        let mut registry = Registry::new();
        let id = registry.create_project("Homepage", "a.png").unwrap();
        store.save(registry.get_project(id).unwrap()).unwrap();

        registry.append_revision(id, "b.png").unwrap();
        store.save(registry.get_project(id).unwrap()).unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].revisions.len(), 2);
    }

    #[test]
    fn test_corrupt_snapshot_fails_load() {
        let (store, temp) = setup();
        let dir = temp.path().join("projects");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("bad.json"), "{ not json").unwrap();

        assert!(matches!(store.load_all(), Err(ApiError::Storage(_))));
    }
}
