//! # Domain Types
//!
//! Tool calls, tool results and the error taxonomy shared by the executor,
//! the automode engine and the HTTP layer.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Names of the tools the model may call, in catalogue order.
#[cfg(test)]
pub const TOOL_NAMES: [&str; 7] = [
    "create_folder",
    "create_file",
    "write_to_file",
    "read_file",
    "list_files",
    "delete_file",
    "search",
];

/// Which shadow set an entry lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Folder,
    File,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Folder => "folder",
            EntryKind::File => "file",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Access denied: '{0}' is outside the project directory")]
    PathEscape(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Folder is not empty: {0}")]
    NotEmpty(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("{0}")]
    Upstream(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct PathInput {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateFileInput {
    pub path: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WriteFileInput {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListFilesInput {
    #[serde(default = "default_list_path")]
    pub path: String,
}

fn default_list_path() -> String {
    ".".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchInput {
    pub query: String,
}

/// A validated tool invocation.
#[derive(Debug, Clone)]
pub enum ToolCall {
    CreateFolder(PathInput),
    CreateFile(CreateFileInput),
    WriteToFile(WriteFileInput),
    ReadFile(PathInput),
    ListFiles(ListFilesInput),
    DeleteFile(PathInput),
    Search(SearchInput),
}

impl ToolCall {
    /// Validates a raw `(name, input)` pair coming from the model.
    pub fn parse(name: &str, input: Value) -> Result<Self, ToolError> {
        fn typed<T: serde::de::DeserializeOwned>(name: &str, input: Value) -> Result<T, ToolError> {
            serde_json::from_value(input)
                .map_err(|e| ToolError::InvalidInput(format!("Invalid input for {}: {}", name, e)))
        }

        match name {
            "create_folder" => Ok(ToolCall::CreateFolder(typed(name, input)?)),
            "create_file" => Ok(ToolCall::CreateFile(typed(name, input)?)),
            "write_to_file" => Ok(ToolCall::WriteToFile(typed(name, input)?)),
            "read_file" => Ok(ToolCall::ReadFile(typed(name, input)?)),
            "list_files" => Ok(ToolCall::ListFiles(typed(name, input)?)),
            "delete_file" => Ok(ToolCall::DeleteFile(typed(name, input)?)),
            "search" => Ok(ToolCall::Search(typed(name, input)?)),
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::CreateFolder(_) => "create_folder",
            ToolCall::CreateFile(_) => "create_file",
            ToolCall::WriteToFile(_) => "write_to_file",
            ToolCall::ReadFile(_) => "read_file",
            ToolCall::ListFiles(_) => "list_files",
            ToolCall::DeleteFile(_) => "delete_file",
            ToolCall::Search(_) => "search",
        }
    }
}

/// Uniform outcome of a tool call. Never an exception.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn ok(result: impl Into<String>) -> Self {
        Self {
            success: true,
            result: Some(result.into()),
            error: None,
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }
}

impl From<Result<String, ToolError>> for ToolResult {
    fn from(outcome: Result<String, ToolError>) -> Self {
        match outcome {
            Ok(text) => ToolResult::ok(text),
            Err(e) => ToolResult::err(e.to_string()),
        }
    }
}

impl fmt::Display for ToolResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.result, &self.error) {
            (Some(result), _) if self.success => write!(f, "{}", result),
            (_, Some(error)) => write!(f, "Error: {}", error),
            _ => write!(f, "Error: unknown failure"),
        }
    }
}

/// One row of a directory listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileEntry {
    pub name: String,
    #[serde(rename = "isDirectory")]
    pub is_directory: bool,
    pub size: u64,
    pub modified: Option<String>,
}
