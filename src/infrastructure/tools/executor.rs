//! # Tool Executor
//!
//! Runs the file and search tools. Every path goes through [`ProjectRoot::resolve`],
//! preconditions are checked against the shadow state before touching disk, and
//! every successful mutation is flushed and written through to the snapshot.
//!
//! [`ToolExecutor::execute`] never fails: errors come back as a `ToolResult`.

use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

use crate::application::state::{SharedShadowState, ShadowState, Snapshot};
use crate::domain::paths::{ProjectRoot, UPLOADS_DIR, parent_key};
use crate::domain::traits::SearchProvider;
use crate::domain::types::{EntryKind, FileEntry, ToolCall, ToolError, ToolResult};
use crate::infrastructure::llm::ToolSchema;
use crate::strings::messages;

/// Executes tools against the sandboxed project root.
pub struct ToolExecutor {
    root: ProjectRoot,
    state: SharedShadowState,
    search: Arc<dyn SearchProvider>,
}

pub type SharedToolExecutor = Arc<ToolExecutor>;

impl ToolExecutor {
    pub fn new(root: ProjectRoot, state: SharedShadowState, search: Arc<dyn SearchProvider>) -> Self {
        Self {
            root,
            state,
            search,
        }
    }

    pub fn root(&self) -> &ProjectRoot {
        &self.root
    }

    #[cfg(test)]
    pub fn state(&self) -> &SharedShadowState {
        &self.state
    }

    /// Name of the configured search backend, e.g. `SEARXNG`.
    pub fn search_provider(&self) -> &str {
        self.search.name()
    }

    /// Tool definitions to send with every model request.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        super::schema::tool_schemas(self.search.name())
    }

    /// Validates and runs one named tool call.
    pub async fn execute(&self, name: &str, input: Value) -> ToolResult {
        tracing::debug!(tool = name, input = %input, "Executing tool");
        let outcome = match ToolCall::parse(name, input) {
            Ok(call) => self.dispatch(call).await,
            Err(e) => Err(e),
        };
        if let Err(e) = &outcome {
            tracing::warn!(tool = name, error = %e, "Tool failed");
        }
        ToolResult::from(outcome)
    }

    /// Runs a validated call and renders its text result.
    pub async fn dispatch(&self, call: ToolCall) -> Result<String, ToolError> {
        tracing::trace!(tool = call.name(), "Dispatching tool");
        match call {
            ToolCall::CreateFolder(input) => self.create_folder(&input.path).await,
            ToolCall::CreateFile(input) => self.create_file(&input.path, &input.content).await,
            ToolCall::WriteToFile(input) => self.write_to_file(&input.path, &input.content).await,
            ToolCall::ReadFile(input) => {
                let content = self.read_file(&input.path).await?;
                if content.is_empty() {
                    Ok(messages::EMPTY_FILE.to_string())
                } else {
                    Ok(content)
                }
            }
            ToolCall::ListFiles(input) => {
                let entries = self.list_files(&input.path).await?;
                Ok(format_listing(&entries))
            }
            ToolCall::DeleteFile(input) => self.delete_file(&input.path).await,
            ToolCall::Search(input) => self.search(&input.query).await,
        }
    }

    /// Creates a folder (and missing parents). Known folders short-circuit without I/O.
    pub async fn create_folder(&self, path: &str) -> Result<String, ToolError> {
        let (abs, key) = self.root.locate(path)?;
        let mut state = self.state.lock().await;

        if key.is_empty() || state.exists(&key, EntryKind::Folder) {
            return Ok(messages::folder_exists(&key));
        }

        tokio::fs::create_dir_all(&abs).await?;
        sync_parent_dir(&abs).await;
        // Intermediate folders made by create_dir_all are tracked too.
        let mut ancestor = parent_key(&key);
        while !ancestor.is_empty() {
            if !state.exists(ancestor, EntryKind::Folder) {
                state.record(ancestor, EntryKind::Folder).await?;
            }
            ancestor = parent_key(ancestor);
        }
        state.record(&key, EntryKind::Folder).await?;
        tracing::info!(path = %key, "Folder created");
        Ok(messages::folder_created(&key))
    }

    /// Creates a file whose parent folder is known. Known files short-circuit without I/O.
    pub async fn create_file(&self, path: &str, content: &str) -> Result<String, ToolError> {
        let (abs, key) = self.root.locate(path)?;
        if key.is_empty() {
            return Err(ToolError::InvalidInput(messages::not_a_file(&key)));
        }
        let mut state = self.state.lock().await;

        let parent = parent_key(&key);
        if !parent.is_empty() && !state.exists(parent, EntryKind::Folder) {
            return Err(ToolError::NotFound(messages::folder_missing(parent)));
        }
        if state.exists(&key, EntryKind::File) {
            return Ok(messages::file_exists(&key));
        }

        if let Some(dir) = abs.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        write_synced(&abs, content).await?;
        state.record(&key, EntryKind::File).await?;
        tracing::info!(path = %key, bytes = content.len(), "File created");
        Ok(messages::file_created(&key))
    }

    /// Overwrites a known file, or one that exists on disk but was not tracked yet.
    pub async fn write_to_file(&self, path: &str, content: &str) -> Result<String, ToolError> {
        let (abs, key) = self.root.locate(path)?;
        let mut state = self.state.lock().await;

        ensure_known_file(&mut state, &abs, &key).await?;
        write_synced(&abs, content).await?;
        tracing::info!(path = %key, bytes = content.len(), "File written");
        Ok(messages::file_written(&key))
    }

    /// Returns the raw content of a known (or discoverable) file.
    pub async fn read_file(&self, path: &str) -> Result<String, ToolError> {
        let (abs, key) = self.root.locate(path)?;
        {
            let mut state = self.state.lock().await;
            ensure_known_file(&mut state, &abs, &key).await?;
        }

        match tokio::fs::read(&abs).await {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ToolError::NotFound(messages::file_missing(&key)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Lists the immediate children of a directory, directories first.
    pub async fn list_files(&self, path: &str) -> Result<Vec<FileEntry>, ToolError> {
        let (abs, key) = self.root.locate(path)?;
        let mut dir = match tokio::fs::read_dir(&abs).await {
            Ok(dir) => dir,
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
                ) =>
            {
                return Err(ToolError::NotFound(messages::directory_missing(&key)));
            }
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let meta = entry.metadata().await?;
            let modified = meta
                .modified()
                .ok()
                .map(|t| chrono::DateTime::<chrono::Utc>::from(t).to_rfc3339());
            entries.push(FileEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_directory: meta.is_dir(),
                size: meta.len(),
                modified,
            });
        }
        entries.sort_by(|a, b| b.is_directory.cmp(&a.is_directory).then(a.name.cmp(&b.name)));
        Ok(entries)
    }

    /// Deletes a known file, or a known folder if it is empty.
    pub async fn delete_file(&self, path: &str) -> Result<String, ToolError> {
        let (abs, key) = self.root.locate(path)?;
        if key.is_empty() {
            return Err(ToolError::InvalidInput(messages::ROOT_DELETE_DENIED.to_string()));
        }
        let mut state = self.state.lock().await;

        let Some(kind) = state.kind_of(&key) else {
            return Err(ToolError::NotFound(messages::path_missing(&key)));
        };

        let removal = match kind {
            EntryKind::File => tokio::fs::remove_file(&abs).await,
            EntryKind::Folder => {
                let mut children = match tokio::fs::read_dir(&abs).await {
                    Ok(children) => Some(children),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                    Err(e) => return Err(e.into()),
                };
                if let Some(children) = children.as_mut() {
                    if children.next_entry().await?.is_some() {
                        return Err(ToolError::NotEmpty(key));
                    }
                }
                tokio::fs::remove_dir(&abs).await
            }
        };

        match removal {
            Ok(()) => {
                sync_parent_dir(&abs).await;
                state.forget(&key, kind).await?;
                tracing::info!(path = %key, kind = kind.as_str(), "Deleted");
                Ok(messages::deleted(&key))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %key, "Shadow entry had no file on disk, dropping it");
                state.forget(&key, kind).await?;
                Err(ToolError::NotFound(messages::path_missing(&key)))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn search(&self, query: &str) -> Result<String, ToolError> {
        self.search.search(query).await.map_err(ToolError::Upstream)
    }

    /// Stores an uploaded file under the uploads folder and tracks it.
    pub async fn store_upload(&self, filename: &str, bytes: &[u8]) -> Result<String, ToolError> {
        let name = Path::new(filename)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ToolError::InvalidInput(format!("Invalid file name: '{}'", filename)))?;

        let (dir_abs, dir_key) = self.root.locate(UPLOADS_DIR)?;
        let (abs, key) = self.root.locate(&format!("{}/{}", UPLOADS_DIR, name))?;
        let mut state = self.state.lock().await;

        tokio::fs::create_dir_all(&dir_abs).await?;
        if !state.exists(&dir_key, EntryKind::Folder) {
            state.record(&dir_key, EntryKind::Folder).await?;
        }
        let mut file = tokio::fs::File::create(&abs).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        state.record(&key, EntryKind::File).await?;
        tracing::info!(path = %key, bytes = bytes.len(), "Upload stored");
        Ok(key)
    }

    /// Re-walks the project root and returns the fresh snapshot.
    pub async fn rebuild_state(&self) -> Result<Snapshot, ToolError> {
        let mut state = self.state.lock().await;
        state.rebuild(self.root.path()).await?;
        Ok(state.snapshot())
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.state.lock().await.snapshot()
    }
}

/// Passes if `key` is a tracked file; adopts it if it only exists on disk.
async fn ensure_known_file(state: &mut ShadowState, abs: &Path, key: &str) -> Result<(), ToolError> {
    if state.exists(key, EntryKind::File) {
        return Ok(());
    }
    match tokio::fs::metadata(abs).await {
        Ok(meta) if meta.is_file() => {
            tracing::info!(path = %key, "File found on disk but not in project state, adopting it");
            state.record(key, EntryKind::File).await?;
            Ok(())
        }
        Ok(_) => Err(ToolError::InvalidInput(messages::not_a_file(key))),
        Err(_) => Err(ToolError::NotFound(messages::file_missing(key))),
    }
}

async fn write_synced(path: &Path, content: &str) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(content.as_bytes()).await?;
    file.sync_all().await?;
    sync_parent_dir(path).await;
    Ok(())
}

/// Best-effort flush of the directory entry for `path`.
async fn sync_parent_dir(path: &Path) {
    let Some(parent) = path.parent() else {
        return;
    };
    // Opening a directory fails on some platforms; nothing to flush there.
    if let Ok(dir) = tokio::fs::File::open(parent).await {
        let _ = dir.sync_all().await;
    }
}

fn format_listing(entries: &[FileEntry]) -> String {
    if entries.is_empty() {
        return messages::EMPTY_DIRECTORY.to_string();
    }
    entries
        .iter()
        .map(|e| {
            if e.is_directory {
                format!("{}/", e.name)
            } else {
                format!("{} ({} bytes)", e.name, e.size)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
