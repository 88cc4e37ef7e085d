//! # Messages
//!
//! Contains constant strings and format functions for user-facing messages.
//! These end up in tool results, HTTP bodies and model transcripts.

pub const EMPTY_FILE: &str = "File is empty";
pub const EMPTY_DIRECTORY: &str = "Directory is empty";
pub const ROOT_DELETE_DENIED: &str = "Cannot delete the project root";

/// Marker the model includes once an automode task is finished.
pub const AUTOMODE_COMPLETE: &str = "AUTOMODE_COMPLETE";

pub const AUTOMODE_CONTINUE: &str =
    "Continue with the next step if necessary or reply with AUTOMODE_COMPLETE if finished.";

/// Stands in for an assistant turn that produced no text.
pub const EMPTY_TURN: &str = "(no response)";

pub const ANALYZE_IMAGE: &str = "Analyze this image and describe what you see.";

pub const EMPTY_FILE_FOLLOW_UP: &str =
    "\nIt seems the file is empty. Would you like to add some content to it?";

pub const WRITE_FOLLOW_UP: &str = "\nI have successfully written the content to the file. Is there anything else you would like to do?";

pub fn folder_created(path: &str) -> String {
    format!("Folder created: {path}")
}

pub fn folder_exists(path: &str) -> String {
    format!("Folder already exists: {}", display(path))
}

pub fn folder_missing(path: &str) -> String {
    format!("Folder does not exist: {path}")
}

pub fn file_created(path: &str) -> String {
    format!("File created: {path}")
}

pub fn file_exists(path: &str) -> String {
    format!("File already exists: {path}")
}

pub fn file_missing(path: &str) -> String {
    format!("File does not exist: {}", display(path))
}

pub fn not_a_file(path: &str) -> String {
    format!("Path is not a file: {}", display(path))
}

pub fn file_written(path: &str) -> String {
    format!("Content written to file: {path}")
}

pub fn directory_missing(path: &str) -> String {
    format!("Directory not found: {}", display(path))
}

pub fn path_missing(path: &str) -> String {
    format!("Path does not exist: {}", display(path))
}

pub fn deleted(path: &str) -> String {
    format!("Deleted: {path}")
}

pub fn uploaded(name: &str) -> String {
    format!("File {name} uploaded successfully to uploads directory")
}

pub fn project_created(template: &str, path: &str) -> String {
    format!("{template} project created successfully at {path}")
}

pub fn unknown_template(template: &str) -> String {
    format!("Unknown project template: {template}")
}

/// Transcript line for a tool call made during automode.
pub fn automode_tool_used(name: &str, result: &str) -> String {
    format!("Used tool: {name}\nResult: {result}\n\n")
}

/// Transcript line for a tool call made during a chat turn.
pub fn chat_tool_used(name: &str, result: &str) -> String {
    format!("\nTool used: {name}\nTool result: {result}\n")
}

/// The root key is empty; show it as `.`.
fn display(path: &str) -> &str {
    if path.is_empty() { "." } else { path }
}
