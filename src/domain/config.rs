//! # Configuration
//!
//! Loads the service configuration. Defaults are overlaid by an optional
//! `config.yaml`, then by environment variables, then by command-line flags.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20240620";

/// Main application configuration structure.
/// Matches the layout of `data/config.yaml`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub projects: ProjectsConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Holds the session log and the shadow-state snapshot.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProjectsConfig {
    #[serde(default = "default_projects_root")]
    pub root: PathBuf,
    /// Snapshot location; defaults to `<data_dir>/project_state.json`.
    #[serde(default)]
    pub state_file: Option<PathBuf>,
}

impl Default for ProjectsConfig {
    fn default() -> Self {
        Self {
            root: default_projects_root(),
            state_file: None,
        }
    }
}

fn default_projects_root() -> PathBuf {
    PathBuf::from("projects")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_timeout")]
    pub timeout_secs: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            max_iterations: default_max_iterations(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_max_iterations() -> usize {
    5
}
fn default_timeout() -> Option<u64> {
    Some(120)
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum SearchProviderKind {
    #[default]
    Searxng,
    Tavily,
}

impl SearchProviderKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "SEARXNG" => Some(SearchProviderKind::Searxng),
            "TAVILY" => Some(SearchProviderKind::Tavily),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default)]
    pub provider: SearchProviderKind,
    #[serde(default)]
    pub searxng_url: Option<String>,
    #[serde(default)]
    pub tavily_api_key: Option<String>,
    #[serde(default = "default_results")]
    pub results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: SearchProviderKind::default(),
            searxng_url: None,
            tavily_api_key: None,
            results: default_results(),
        }
    }
}

fn default_results() -> usize {
    5
}

impl AppConfig {
    /// Reads `path` if it exists, then applies the process environment.
    pub fn load(path: &Path) -> Result<Self> {
        let env: HashMap<String, String> = std::env::vars().collect();
        Self::load_with_env(path, &env)
    }

    pub fn load_with_env(path: &Path, env: &HashMap<String, String>) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_yaml::from_str::<AppConfig>(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            AppConfig::default()
        };
        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self, env: &HashMap<String, String>) -> Result<()> {
        let get = |key: &str| env.get(key).filter(|v| !v.trim().is_empty()).cloned();

        if let Some(key) = get("ANTHROPIC_API_KEY") {
            self.model.api_key = Some(key);
        }
        if let Some(url) = get("ANTHROPIC_BASE_URL") {
            self.model.base_url = Some(url);
        }
        if let Some(model) = get("CLAUDE_MODEL") {
            self.model.model = model;
        }
        if let Some(raw) = get("MAX_ITERATIONS") {
            self.model.max_iterations = raw
                .trim()
                .parse()
                .with_context(|| format!("MAX_ITERATIONS must be a positive integer, got '{}'", raw))?;
        }
        if let Some(raw) = get("SEARCH_PROVIDER") {
            self.search.provider = SearchProviderKind::from_str(&raw)
                .with_context(|| format!("Unknown SEARCH_PROVIDER '{}' (expected SEARXNG or TAVILY)", raw))?;
        }
        if let Some(url) = get("SEARXNG_URL") {
            self.search.searxng_url = Some(url);
        }
        if let Some(key) = get("TAVILY_API_KEY") {
            self.search.tavily_api_key = Some(key);
        }
        if let Some(raw) = get("SEARXNG_RESULTS") {
            self.search.results = raw
                .trim()
                .parse()
                .with_context(|| format!("SEARXNG_RESULTS must be an integer, got '{}'", raw))?;
        }
        if let Some(dir) = get("PROJECTS_DIR") {
            self.projects.root = PathBuf::from(dir);
        }
        if let Some(raw) = get("PROJECTD_PORT") {
            self.server.port = raw
                .trim()
                .parse()
                .with_context(|| format!("PROJECTD_PORT must be a port number, got '{}'", raw))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.model.max_iterations == 0 {
            bail!("max_iterations must be at least 1");
        }
        Ok(())
    }

    pub fn state_file(&self) -> PathBuf {
        self.projects
            .state_file
            .clone()
            .unwrap_or_else(|| self.server.data_dir.join("project_state.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_without_file() {
        let tmp = TempDir::new().unwrap();
        let config = AppConfig::load_with_env(&tmp.path().join("missing.yaml"), &env(&[])).unwrap();
        assert_eq!(config.model.model, DEFAULT_MODEL);
        assert_eq!(config.model.max_iterations, 5);
        assert_eq!(config.search.provider, SearchProviderKind::Searxng);
        assert_eq!(config.search.results, 5);
        assert_eq!(config.state_file(), PathBuf::from("data/project_state.json"));
    }

    #[test]
    fn test_env_overrides_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.yaml");
        fs::write(
            &path,
            "model:\n  model: from-file\n  max_iterations: 3\nsearch:\n  provider: TAVILY\n",
        )
        .unwrap();

        let config = AppConfig::load_with_env(&path, &env(&[])).unwrap();
        assert_eq!(config.model.model, "from-file");
        assert_eq!(config.model.max_iterations, 3);
        assert_eq!(config.search.provider, SearchProviderKind::Tavily);

        let config = AppConfig::load_with_env(
            &path,
            &env(&[
                ("CLAUDE_MODEL", "from-env"),
                ("MAX_ITERATIONS", "2"),
                ("SEARCH_PROVIDER", "searxng"),
                ("SEARXNG_URL", "http://localhost:8080/search"),
                ("SEARXNG_RESULTS", "7"),
            ]),
        )
        .unwrap();
        assert_eq!(config.model.model, "from-env");
        assert_eq!(config.model.max_iterations, 2);
        assert_eq!(config.search.provider, SearchProviderKind::Searxng);
        assert_eq!(config.search.searxng_url.as_deref(), Some("http://localhost:8080/search"));
        assert_eq!(config.search.results, 7);
    }

    #[test]
    fn test_bad_env_values_fail() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("none.yaml");
        assert!(AppConfig::load_with_env(&path, &env(&[("MAX_ITERATIONS", "lots")])).is_err());
        assert!(AppConfig::load_with_env(&path, &env(&[("MAX_ITERATIONS", "0")])).is_err());
        assert!(AppConfig::load_with_env(&path, &env(&[("SEARCH_PROVIDER", "BING")])).is_err());
    }
}
