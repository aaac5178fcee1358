use anyhow::{Context, Result};
use globset::Glob;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::diagnostics::DiagnosticsMode;
use crate::ids::IdStrategy;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub local: LocalConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProjectConfig {
    #[serde(default)]
    pub root: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ExtractionConfig {
    #[serde(default)]
    pub ids: IdStrategy,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LocalConfig {
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl LocalConfig {
    /// Built-in excludes followed by the configured ones.
    pub fn all_excludes(&self) -> Vec<String> {
        let mut excludes = vec!["**/.git/**".to_string(), "**/node_modules/**".to_string()];
        excludes.extend(self.exclude_globs.clone());
        excludes
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RemoteConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            branch: default_branch(),
            token_env: default_token_env(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}
fn default_branch() -> String {
    "master".to_string()
}
fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}
fn default_max_concurrent_fetches() -> usize {
    8
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DiagnosticsConfig {
    /// Unset means: log on a terminal, JSON otherwise.
    #[serde(default)]
    pub mode: Option<DiagnosticsMode>,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    for pattern in &config.local.exclude_globs {
        Glob::new(pattern)
            .with_context(|| format!("local.exclude_globs: invalid pattern '{}'", pattern))?;
    }

    if config.remote.max_concurrent_fetches == 0 {
        anyhow::bail!("remote.max_concurrent_fetches must be > 0");
    }

    if config.remote.timeout_secs == 0 {
        anyhow::bail!("remote.timeout_secs must be > 0");
    }

    if config.remote.api_url.trim().is_empty() {
        anyhow::bail!("remote.api_url must not be empty");
    }

    Ok(())
}
