use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Settings read from `$XDG_CONFIG_HOME/git-tree/config.yaml`. Every key is
/// optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Remote whose `HEAD` names the default branch.
    pub remote: String,
    /// Skip PR lookup and the PR columns.
    pub concise: bool,
    /// Maximum number of PRs fetched per run.
    pub pr_limit: usize,
    pub default_token: Option<String>,
    /// Per-host GitHub tokens, e.g. `github.mycompany.com: <token>`.
    pub hosts: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote: "origin".to_string(),
            concise: false,
            pr_limit: 500,
            default_token: None,
            hosts: HashMap::new(),
        }
    }
}

impl Config {
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&data).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn token_for_host(&self, host: &str) -> Option<&str> {
        self.hosts
            .get(host)
            .or(self.default_token.as_ref())
            .map(String::as_str)
            .filter(|token| !token.is_empty())
    }
}

pub fn load_config() -> Result<Config> {
    let Some(config_path) = get_xdg_path() else {
        tracing::debug!("No config directory available, using defaults");
        return Ok(Config::default());
    };
    if !config_path.exists() {
        tracing::debug!(
            "No config file at {}, using defaults",
            config_path.display()
        );
        return Ok(Config::default());
    }
    let config = Config::from_path(&config_path)?;
    tracing::debug!(?config_path, "Loaded config");
    Ok(config)
}

fn get_xdg_path() -> Option<PathBuf> {
    let base_dirs = xdg::BaseDirectories::with_prefix(env!("CARGO_PKG_NAME"));
    base_dirs.get_config_file("config.yaml")
}
