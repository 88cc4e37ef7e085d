//! # Chat Service
//!
//! Single-turn chat with tool use, plus image analysis. Transcripts are kept
//! per session id instead of one process-wide history.

use anyhow::Result;
use base64::Engine as _;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::traits::LlmProvider;
use crate::infrastructure::llm::{Context, Message, ResponseBlock};
use crate::infrastructure::tools::executor::SharedToolExecutor;
use crate::strings::{messages, prompts};

pub const DEFAULT_SESSION: &str = "default";

/// Token budget for image descriptions.
const ANALYZE_MAX_TOKENS: u32 = 1000;

pub struct ChatService {
    llm: Arc<dyn LlmProvider>,
    tools: SharedToolExecutor,
    sessions: Mutex<HashMap<String, Vec<Message>>>,
    system: String,
}

impl ChatService {
    pub fn new(llm: Arc<dyn LlmProvider>, tools: SharedToolExecutor, search_provider: &str) -> Self {
        Self {
            llm,
            tools,
            sessions: Mutex::new(HashMap::new()),
            system: prompts::chat_system(search_provider),
        }
    }

    /// Runs one chat turn and returns the assembled assistant reply.
    ///
    /// The transcript only grows when the model call succeeds.
    pub async fn send(&self, session_id: &str, message: &str) -> Result<String> {
        let mut history = self
            .sessions
            .lock()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default();
        history.push(Message::user(message));

        tracing::info!(session = session_id, turns = history.len(), "Sending chat message");
        let context = Context::new()
            .with_system(self.system.clone())
            .with_messages(history.clone())
            .with_tools(self.tools.schemas());
        let response = self.llm.complete(context).await?;

        let mut reply = String::new();
        for block in response.blocks {
            match block {
                ResponseBlock::Text(text) => reply.push_str(&text),
                ResponseBlock::ToolUse { name, input, .. } => {
                    let result = self.tools.execute(&name, input).await;
                    tracing::info!(session = session_id, tool = %name, success = result.success, "Chat tool used");
                    reply.push_str(&messages::chat_tool_used(&name, &result.to_string()));

                    if name == "read_file" && result.result.as_deref() == Some(messages::EMPTY_FILE) {
                        reply.push_str(messages::EMPTY_FILE_FOLLOW_UP);
                    } else if name == "write_to_file" && result.success {
                        reply.push_str(messages::WRITE_FOLLOW_UP);
                    }
                }
            }
        }

        if reply.is_empty() {
            history.push(Message::assistant(messages::EMPTY_TURN));
        } else {
            history.push(Message::assistant(reply.clone()));
        }
        self.sessions
            .lock()
            .await
            .insert(session_id.to_string(), history);
        Ok(reply)
    }

    /// Drops a session's transcript. Returns whether it existed.
    pub async fn clear(&self, session_id: &str) -> bool {
        self.sessions.lock().await.remove(session_id).is_some()
    }

    #[cfg(test)]
    pub async fn history(&self, session_id: &str) -> Vec<Message> {
        self.sessions
            .lock()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Asks the model to describe an image. Does not touch any transcript.
    pub async fn analyze_image(&self, media_type: &str, bytes: &[u8]) -> Result<String> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        tracing::debug!(media_type, bytes = bytes.len(), encoded = encoded.len(), "Analyzing image");

        let context = Context::new()
            .with_system(self.system.clone())
            .with_messages(vec![Message::user_with_image(
                media_type,
                encoded,
                messages::ANALYZE_IMAGE,
            )])
            .with_max_tokens(ANALYZE_MAX_TOKENS);
        let response = self.llm.complete(context).await?;
        Ok(response.text())
    }
}
