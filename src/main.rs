//! # Main Entry Point
//!
//! Starts the project service:
//! - Domain: configuration, sandbox paths and tool types
//! - Infrastructure: language-model client, search providers, tool executor
//! - Application: shadow state, automode engine, chat, project scaffolding
//! - Interface: HTTP routes and the automode SSE stream
//!

mod application;
mod domain;
mod infrastructure;
mod interface;
mod strings;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::application::state::ShadowState;
use crate::domain::config::AppConfig;
use crate::domain::paths::ProjectRoot;
use crate::infrastructure::llm::Client as LlmClient;
use crate::infrastructure::tools::executor::ToolExecutor;
use crate::interface::http::AppState;
use crate::strings::logs;

/// Sandboxed project backend for an AI coding agent.
#[derive(Parser, Debug)]
#[command(name = "projectd", version, about)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(long, default_value = "data/config.yaml")]
    config: PathBuf,

    /// Directory all file operations are confined to
    #[arg(long)]
    projects_dir: Option<PathBuf>,

    /// Address to bind the HTTP server to
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Log to the console only
    #[arg(long)]
    no_file_log: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load Configuration
    let config_existed = args.config.exists();
    let mut config = AppConfig::load(&args.config)?;
    if let Some(dir) = args.projects_dir {
        config.projects.root = dir;
    }
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    // 2. Logging Setup
    let data_dir = config.server.data_dir.clone();
    fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("info,tower_http=warn,hyper=warn,reqwest=warn")
    });

    // Layer for file (cleared every start)
    let (file_layer, _guard) = if args.no_file_log {
        (None, None)
    } else {
        let log_path = data_dir.join("session.log");
        if log_path.exists() {
            let _ = fs::remove_file(&log_path);
        }
        let file_appender = tracing_appender::rolling::never(&data_dir, "session.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false);
        (Some(layer), Some(guard))
    };

    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stdout);

    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    tracing::info!("Starting projectd...");
    let config_path = args.config.display().to_string();
    if config_existed {
        tracing::info!("{}", logs::config_loaded(&config_path));
    } else {
        tracing::info!("{}", logs::config_missing(&config_path));
    }
    if config.model.api_key.is_none() {
        tracing::warn!("ANTHROPIC_API_KEY is not set; chat and automode requests will fail");
    }

    // 3. Sandbox and Shadow State
    let root = ProjectRoot::open(&config.projects.root).with_context(|| {
        format!(
            "Failed to open project root {}",
            config.projects.root.display()
        )
    })?;
    tracing::info!("{}", logs::project_root(&root.path().display().to_string()));

    let mut state = ShadowState::load(config.state_file())
        .await
        .context("Failed to load project state")?;
    state
        .rebuild(root.path())
        .await
        .context("Failed to rebuild project state")?;
    let state = Arc::new(Mutex::new(state));

    // 4. Infrastructure
    let search = infrastructure::search::from_config(&config.search);
    let tools = Arc::new(ToolExecutor::new(root, state, search));
    let llm = Arc::new(LlmClient::new(config.model.clone()));

    // 5. Serve
    let app_state = Arc::new(AppState::new(tools, llm, config.model.max_iterations));
    interface::http::serve(app_state, &config.server.bind, config.server.port).await
}
