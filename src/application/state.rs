//! # Project State
//!
//! The shadow state: which folders and files the service believes exist under
//! the project root. It is consulted before touching the filesystem, written
//! through to a JSON snapshot after every mutation, and can be rebuilt from
//! disk at any time to repair drift.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::paths::normalize_key;
use crate::domain::types::EntryKind;

/// On-disk shape of the snapshot file.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub folders: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
}

/// Folder and file sets keyed by normalized root-relative path.
///
/// A key is never in both sets: recording one kind evicts the other.
#[derive(Debug)]
pub struct ShadowState {
    folders: BTreeSet<String>,
    files: BTreeSet<String>,
    snapshot_path: PathBuf,
}

pub type SharedShadowState = Arc<Mutex<ShadowState>>;

impl ShadowState {
    pub fn empty(snapshot_path: impl Into<PathBuf>) -> Self {
        Self {
            folders: BTreeSet::new(),
            files: BTreeSet::new(),
            snapshot_path: snapshot_path.into(),
        }
    }

    /// Loads the snapshot, or starts empty if the file is missing or corrupt.
    pub async fn load(snapshot_path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let mut state = Self::empty(snapshot_path);
        let content = match tokio::fs::read_to_string(&state.snapshot_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No project state snapshot at {}, starting empty", state.snapshot_path.display());
                return Ok(state);
            }
            Err(e) => return Err(e),
        };

        let snapshot: Snapshot = match serde_json::from_str(&content) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Unreadable project state snapshot at {}, starting empty",
                    state.snapshot_path.display()
                );
                return Ok(state);
            }
        };
        for folder in snapshot.folders {
            state.insert(normalize(&folder), EntryKind::Folder);
        }
        for file in snapshot.files {
            state.insert(normalize(&file), EntryKind::File);
        }
        tracing::info!(
            folders = state.folders.len(),
            files = state.files.len(),
            "Project state loaded"
        );
        Ok(state)
    }

    /// Rewrites the whole snapshot file.
    pub async fn save(&self) -> std::io::Result<()> {
        if let Some(parent) = self.snapshot_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let content = serde_json::to_string_pretty(&self.snapshot())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        tokio::fs::write(&self.snapshot_path, content).await?;
        tracing::debug!("Saved project state to {}", self.snapshot_path.display());
        Ok(())
    }

    /// Replaces both sets with exactly what is on disk under `root`, then saves.
    pub async fn rebuild(&mut self, root: &Path) -> std::io::Result<()> {
        let root = root.to_path_buf();
        let (folders, files) = tokio::task::spawn_blocking(move || walk(&root))
            .await
            .map_err(std::io::Error::other)??;
        self.folders = folders;
        self.files = files;
        tracing::info!(
            folders = self.folders.len(),
            files = self.files.len(),
            "Project state rebuilt from disk"
        );
        self.save().await
    }

    pub fn exists(&self, path: &str, kind: EntryKind) -> bool {
        let key = normalize(path);
        match kind {
            EntryKind::Folder => self.folders.contains(&key),
            EntryKind::File => self.files.contains(&key),
        }
    }

    /// Which set, if any, holds `path`.
    pub fn kind_of(&self, path: &str) -> Option<EntryKind> {
        let key = normalize(path);
        if self.folders.contains(&key) {
            Some(EntryKind::Folder)
        } else if self.files.contains(&key) {
            Some(EntryKind::File)
        } else {
            None
        }
    }

    /// Adds an entry and persists.
    pub async fn record(&mut self, path: &str, kind: EntryKind) -> std::io::Result<()> {
        self.insert(normalize(path), kind);
        self.save().await
    }

    /// Removes an entry and persists.
    pub async fn forget(&mut self, path: &str, kind: EntryKind) -> std::io::Result<()> {
        let key = normalize(path);
        match kind {
            EntryKind::Folder => self.folders.remove(&key),
            EntryKind::File => self.files.remove(&key),
        };
        self.save().await
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            folders: self.folders.iter().cloned().collect(),
            files: self.files.iter().cloned().collect(),
        }
    }

    fn insert(&mut self, key: String, kind: EntryKind) {
        if key.is_empty() {
            return;
        }
        match kind {
            EntryKind::Folder => {
                self.files.remove(&key);
                self.folders.insert(key);
            }
            EntryKind::File => {
                self.folders.remove(&key);
                self.files.insert(key);
            }
        }
    }
}

fn normalize(path: &str) -> String {
    normalize_key(Path::new(&path.replace('\\', "/")))
}

/// Unreadable directories are skipped, not fatal.
fn walk(root: &Path) -> std::io::Result<(BTreeSet<String>, BTreeSet<String>)> {
    let mut folders = BTreeSet::new();
    let mut files = BTreeSet::new();

    for entry in walkdir::WalkDir::new(root).min_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable entry during rebuild");
                continue;
            }
        };
        let Ok(rel) = entry.path().strip_prefix(root) else {
            continue;
        };
        let key = normalize_key(rel);
        if entry.file_type().is_dir() {
            folders.insert(key);
        } else {
            files.insert(key);
        }
    }
    Ok((folders, files))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_snapshot_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let state = ShadowState::load(tmp.path().join("nope.json")).await.unwrap();
        assert_eq!(state.snapshot(), Snapshot::default());
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state.json");
        std::fs::write(&path, r#"{"folders": ["a"], "fil"#).unwrap();

        let mut state = ShadowState::load(&path).await.unwrap();
        assert_eq!(state.snapshot(), Snapshot::default());

        let root = tmp.path().join("projects");
        std::fs::create_dir_all(root.join("a")).unwrap();
        state.rebuild(&root).await.unwrap();
        let reloaded = ShadowState::load(&path).await.unwrap();
        assert!(reloaded.exists("a", EntryKind::Folder));
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data/project_state.json");

        let mut state = ShadowState::empty(&path);
        state.record("app", EntryKind::Folder).await.unwrap();
        state.record("app/src", EntryKind::Folder).await.unwrap();
        state.record("app/src/main.py", EntryKind::File).await.unwrap();
        state.record("README.md", EntryKind::File).await.unwrap();

        let loaded = ShadowState::load(&path).await.unwrap();
        let original: BTreeSet<_> = state.snapshot().folders.into_iter().collect();
        let reloaded: BTreeSet<_> = loaded.snapshot().folders.into_iter().collect();
        assert_eq!(original, reloaded);
        let original: BTreeSet<_> = state.snapshot().files.into_iter().collect();
        let reloaded: BTreeSet<_> = loaded.snapshot().files.into_iter().collect();
        assert_eq!(original, reloaded);
    }

    #[tokio::test]
    async fn test_snapshot_file_shape() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state.json");
        let mut state = ShadowState::empty(&path);
        state.record("a", EntryKind::Folder).await.unwrap();
        state.record("a/b.txt", EntryKind::File).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({"folders": ["a"], "files": ["a/b.txt"]}));
    }

    #[tokio::test]
    async fn test_record_keeps_sets_disjoint() {
        let tmp = TempDir::new().unwrap();
        let mut state = ShadowState::empty(tmp.path().join("s.json"));
        state.record("thing", EntryKind::File).await.unwrap();
        state.record("thing", EntryKind::Folder).await.unwrap();

        assert!(state.exists("thing", EntryKind::Folder));
        assert!(!state.exists("thing", EntryKind::File));
        assert_eq!(state.kind_of("thing"), Some(EntryKind::Folder));
    }

    #[tokio::test]
    async fn test_keys_are_normalized() {
        let tmp = TempDir::new().unwrap();
        let mut state = ShadowState::empty(tmp.path().join("s.json"));
        state.record("/app/./src/", EntryKind::Folder).await.unwrap();
        assert!(state.exists("app/src", EntryKind::Folder));
        assert_eq!(state.snapshot().folders, vec!["app/src".to_string()]);

        state.forget("app/src", EntryKind::Folder).await.unwrap();
        assert_eq!(state.kind_of("app/src"), None);
    }

    #[tokio::test]
    async fn test_rebuild_mirrors_disk() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("projects");
        std::fs::create_dir_all(root.join("app/src")).unwrap();
        std::fs::write(root.join("app/src/main.py"), "print('hi')").unwrap();
        std::fs::write(root.join("notes.txt"), "").unwrap();

        let mut state = ShadowState::empty(tmp.path().join("s.json"));
        state.record("stale", EntryKind::Folder).await.unwrap();
        state.rebuild(&root).await.unwrap();

        let snapshot = state.snapshot();
        assert_eq!(snapshot.folders, vec!["app".to_string(), "app/src".to_string()]);
        assert_eq!(
            snapshot.files,
            vec!["app/src/main.py".to_string(), "notes.txt".to_string()]
        );
        assert!(!state.exists("stale", EntryKind::Folder));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_rebuild_skips_unreadable_directory() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("projects");
        std::fs::create_dir_all(root.join("locked/inner")).unwrap();
        std::fs::create_dir_all(root.join("open")).unwrap();
        std::fs::write(root.join("open/readme.md"), "hi").unwrap();
        let locked = root.join("locked");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        let mut state = ShadowState::empty(tmp.path().join("s.json"));
        let outcome = state.rebuild(&root).await;
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        outcome.unwrap();
        assert!(state.exists("locked", EntryKind::Folder));
        assert!(state.exists("open", EntryKind::Folder));
        assert!(state.exists("open/readme.md", EntryKind::File));
    }
}
