//! Tool definitions advertised to the model.

use serde_json::json;

use crate::infrastructure::llm::ToolSchema;

fn tool(name: &str, description: &str, input_schema: serde_json::Value) -> ToolSchema {
    ToolSchema {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

fn path_only(description: &str) -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "path": {"type": "string", "description": description}
        },
        "required": ["path"]
    })
}

/// The seven file/search tools, in catalogue order.
pub fn tool_schemas(search_provider: &str) -> Vec<ToolSchema> {
    vec![
        tool(
            "create_folder",
            "Create a new folder at the specified path.",
            path_only("The path where the folder should be created"),
        ),
        tool(
            "create_file",
            "Create a new file at the specified path with optional content.",
            json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "The path where the file should be created"},
                    "content": {"type": "string", "description": "The initial content of the file (optional)"}
                },
                "required": ["path"]
            }),
        ),
        tool(
            "write_to_file",
            "Write content to an existing file at the specified path, replacing its content.",
            json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "The path of the file to write to"},
                    "content": {"type": "string", "description": "The full content to write to the file"}
                },
                "required": ["path", "content"]
            }),
        ),
        tool(
            "read_file",
            "Read the contents of a file at the specified path.",
            path_only("The path of the file to read"),
        ),
        tool(
            "list_files",
            "List all files and directories in the specified path.",
            path_only("The path of the folder to list"),
        ),
        tool(
            "delete_file",
            "Delete a file or an empty folder at the specified path.",
            path_only("The path of the file or folder to delete"),
        ),
        tool(
            "search",
            &format!("Perform a web search using the {} search provider.", search_provider),
            json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "The search query"}
                },
                "required": ["query"]
            }),
        ),
    ]
}
