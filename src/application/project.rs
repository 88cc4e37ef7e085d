//! # Project Manager
//!
//! Scaffolds starter projects from the built-in templates. Everything goes
//! through the tool executor so the sandbox and the shadow state apply.

use crate::domain::paths::parent_key;
use crate::domain::types::ToolError;
use crate::infrastructure::tools::executor::SharedToolExecutor;
use crate::strings::{messages, templates};

pub struct ProjectManager {
    tools: SharedToolExecutor,
}

impl ProjectManager {
    pub fn new(tools: SharedToolExecutor) -> Self {
        Self { tools }
    }

    /// Creates `<template>_project` under `parent_dir` with the template's starter files.
    pub async fn create_project(&self, template: &str, parent_dir: &str) -> Result<String, ToolError> {
        let files = templates::starter_files(template)
            .ok_or_else(|| ToolError::InvalidInput(messages::unknown_template(template)))?;

        let (_, parent) = self.tools.root().locate(parent_dir)?;
        let name = format!("{}_project", template.to_ascii_lowercase());
        let project = if parent.is_empty() {
            name
        } else {
            format!("{}/{}", parent, name)
        };

        self.tools.create_folder(&project).await?;
        for (relative, content) in files {
            let path = format!("{}/{}", project, relative);
            let dir = parent_key(&path);
            if dir != project {
                self.tools.create_folder(dir).await?;
            }
            self.tools.create_file(&path, content).await?;
        }

        tracing::info!(template, path = %project, files = files.len(), "Project created");
        Ok(messages::project_created(template, &project))
    }
}
