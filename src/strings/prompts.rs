use crate::strings::messages::AUTOMODE_COMPLETE;

/// A builder for rendering prompts with context.
pub struct PromptRenderer<'a> {
    template: &'a str,
    replacements: Vec<(&'a str, String)>,
}

impl<'a> PromptRenderer<'a> {
    pub fn new(template: &'a str) -> Self {
        Self {
            template,
            replacements: Vec::new(),
        }
    }

    pub fn set(mut self, key: &'a str, value: impl Into<String>) -> Self {
        self.replacements.push((key, value.into()));
        self
    }

    pub fn render(self) -> String {
        let mut result = self.template.to_string();
        for (key, value) in self.replacements {
            result = result.replace(key, &value);
        }

        // Any `{{VAR}}` left over means a caller forgot a `.set(...)`.
        if let Some(start) = result.find("{{") {
            if let Some(end) = result[start..].find("}}") {
                let placeholder = &result[start..start + end + 2];
                tracing::error!("Unreplaced placeholder found in rendered prompt: {}", placeholder);
            }
        }

        result
    }
}

pub const AUTOMODE_TEMPLATE: &str = include_str!("../../prompts/automode.md");
pub const CHAT_TEMPLATE: &str = include_str!("../../prompts/chat.md");

/// System instructions for an automode run.
pub fn automode_system(max_iterations: usize, search_provider: &str) -> String {
    PromptRenderer::new(AUTOMODE_TEMPLATE)
        .set("{{MAX_ITERATIONS}}", max_iterations.to_string())
        .set("{{SEARCH_PROVIDER}}", search_provider)
        .set("{{COMPLETE_MARKER}}", AUTOMODE_COMPLETE)
        .render()
}

/// System instructions for chat turns and image analysis.
pub fn chat_system(search_provider: &str) -> String {
    PromptRenderer::new(CHAT_TEMPLATE)
        .set("{{SEARCH_PROVIDER}}", search_provider)
        .render()
}
