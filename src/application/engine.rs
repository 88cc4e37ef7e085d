//! # Automode Engine
//!
//! The bounded loop that lets the model act without per-step confirmation.
//! Each iteration sends the transcript to the model, runs every tool it asks
//! for, folds the results into one assistant turn and reports progress.
//! A run stops when the model says `AUTOMODE_COMPLETE` or the iteration
//! budget is spent.
//!
//! Runs are kept in a [`RunRegistry`] keyed by run id, so concurrent runs do
//! not overwrite each other's progress.

use anyhow::Result;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{RwLock, mpsc};

use crate::domain::traits::LlmProvider;
use crate::infrastructure::llm::{Context, Message, ResponseBlock};
use crate::infrastructure::tools::executor::SharedToolExecutor;
use crate::strings::{messages, prompts};

/// Events pushed to the client while a run progresses.
#[derive(Debug, Clone, PartialEq)]
pub enum AutomodeEvent {
    Message { content: String },
    End,
    Error { content: String },
}

impl AutomodeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AutomodeEvent::Message { .. } => "message",
            AutomodeEvent::End => "end",
            AutomodeEvent::Error { .. } => "error",
        }
    }

    /// JSON payload; carries the event name too for clients reading only `data:`.
    pub fn data(&self) -> Value {
        match self {
            AutomodeEvent::Message { content } | AutomodeEvent::Error { content } => {
                json!({"event": self.name(), "content": content})
            }
            AutomodeEvent::End => json!({"event": self.name()}),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMessage {
    pub role: String,
    pub content: String,
}

impl RunMessage {
    fn new(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: content.into(),
        }
    }
}

/// Visible state of one automode run.
#[derive(Debug, Clone, Serialize)]
pub struct AutomodeRun {
    pub run_id: u64,
    pub status: RunStatus,
    /// 0 to 100.
    pub progress: u32,
    pub messages: Vec<RunMessage>,
}

/// Finished runs beyond this many are dropped, oldest first.
const MAX_RETAINED_RUNS: usize = 32;

/// Recent runs of this process, newest last. Running runs are never pruned.
#[derive(Debug, Default)]
pub struct RunRegistry {
    next_id: AtomicU64,
    runs: RwLock<BTreeMap<u64, AutomodeRun>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    async fn start(&self) -> u64 {
        let run_id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let run = AutomodeRun {
            run_id,
            status: RunStatus::Running,
            progress: 0,
            messages: Vec::new(),
        };
        let mut runs = self.runs.write().await;
        runs.insert(run_id, run);

        let excess = runs.len().saturating_sub(MAX_RETAINED_RUNS);
        if excess > 0 {
            let stale: Vec<u64> = runs
                .iter()
                .filter(|(_, run)| run.status != RunStatus::Running)
                .map(|(id, _)| *id)
                .take(excess)
                .collect();
            for id in &stale {
                runs.remove(id);
            }
            tracing::debug!(pruned = stale.len(), retained = runs.len(), "Pruned finished automode runs");
        }
        run_id
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.runs.read().await.len()
    }

    async fn update(&self, run_id: u64, f: impl FnOnce(&mut AutomodeRun)) {
        if let Some(run) = self.runs.write().await.get_mut(&run_id) {
            f(run);
        }
    }

    pub async fn get(&self, run_id: u64) -> Option<AutomodeRun> {
        self.runs.read().await.get(&run_id).cloned()
    }

    /// The most recently started run.
    pub async fn latest(&self) -> Option<AutomodeRun> {
        self.runs.read().await.values().next_back().cloned()
    }
}

#[derive(Clone)]
pub struct AutomodeEngine {
    llm: Arc<dyn LlmProvider>,
    tools: SharedToolExecutor,
    runs: Arc<RunRegistry>,
    max_iterations: usize,
    system: String,
}

impl AutomodeEngine {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        tools: SharedToolExecutor,
        runs: Arc<RunRegistry>,
        max_iterations: usize,
        search_provider: &str,
    ) -> Self {
        let max_iterations = max_iterations.max(1);
        Self {
            llm,
            tools,
            runs,
            max_iterations,
            system: prompts::automode_system(max_iterations, search_provider),
        }
    }

    pub fn runs(&self) -> &Arc<RunRegistry> {
        &self.runs
    }

    /// Registers a run and drives it on its own task.
    ///
    /// The run keeps going if the receiver is dropped.
    pub async fn start(&self, message: String) -> (u64, mpsc::Receiver<AutomodeEvent>) {
        let (tx, rx) = mpsc::channel(16);
        let run_id = self.runs.start().await;
        let engine = self.clone();
        tokio::spawn(async move {
            engine.run(run_id, message, tx).await;
        });
        (run_id, rx)
    }

    /// Drives a registered run to completion or failure.
    pub async fn run(&self, run_id: u64, message: String, tx: mpsc::Sender<AutomodeEvent>) {
        tracing::info!(run_id, max_iterations = self.max_iterations, "Automode run started");

        match self.iterate(run_id, message, &tx).await {
            Ok(iterations) => {
                self.runs
                    .update(run_id, |run| {
                        run.status = RunStatus::Completed;
                        run.progress = 100;
                    })
                    .await;
                tracing::info!(run_id, iterations, "Automode run completed");
                let _ = tx.send(AutomodeEvent::End).await;
            }
            Err(e) => {
                let content = e.to_string();
                tracing::error!(run_id, error = %content, "Automode run failed");
                self.runs
                    .update(run_id, |run| {
                        run.messages
                            .push(RunMessage::new("system", format!("Error: {}", content)));
                        run.status = RunStatus::Failed;
                        run.progress = 100;
                    })
                    .await;
                let _ = tx.send(AutomodeEvent::Error { content }).await;
            }
        }
    }

    /// Returns the number of iterations performed.
    async fn iterate(
        &self,
        run_id: u64,
        message: String,
        tx: &mpsc::Sender<AutomodeEvent>,
    ) -> Result<usize> {
        self.tools.rebuild_state().await?;

        let schemas = self.tools.schemas();
        let mut history = vec![Message::user(message)];
        let n = self.max_iterations;

        for i in 0..n {
            tracing::debug!(run_id, iteration = i + 1, of = n, "Automode iteration");

            let context = Context::new()
                .with_system(self.system.clone())
                .with_messages(history.clone())
                .with_tools(schemas.clone());
            let response = self.llm.complete(context).await?;
            tracing::debug!(
                run_id,
                model = %response.model,
                stop_reason = ?response.stop_reason,
                input_tokens = response.usage.input_tokens,
                output_tokens = response.usage.output_tokens,
                "Automode model response"
            );

            let mut assembled = String::new();
            for block in response.blocks {
                match block {
                    ResponseBlock::Text(text) => {
                        assembled.push_str(&text);
                        assembled.push('\n');
                    }
                    ResponseBlock::ToolUse { name, input, .. } => {
                        let result = self.tools.execute(&name, input).await;
                        tracing::debug!(run_id, tool = %name, success = result.success, "Automode tool used");
                        assembled.push_str(&messages::automode_tool_used(&name, &result.to_string()));
                    }
                }
            }

            let progress = ((i + 1) * 100 / n) as u32;
            self.runs
                .update(run_id, |run| {
                    run.messages.push(RunMessage::new("assistant", assembled.clone()));
                    run.progress = progress;
                })
                .await;
            if tx
                .send(AutomodeEvent::Message {
                    content: assembled.clone(),
                })
                .await
                .is_err()
            {
                tracing::debug!(run_id, "Automode client disconnected, run continues");
            }

            if assembled.contains(messages::AUTOMODE_COMPLETE) {
                return Ok(i + 1);
            }
            if i + 1 == n {
                break;
            }

            if assembled.is_empty() {
                history.push(Message::assistant(messages::EMPTY_TURN));
            } else {
                history.push(Message::assistant(assembled));
            }
            history.push(Message::user(messages::AUTOMODE_CONTINUE));
            self.tools.rebuild_state().await?;
        }

        Ok(n)
    }
}
