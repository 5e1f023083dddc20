//! Search configuration
//!
//! ## Configuration Sources (in precedence order)
//!
//! 1. CLI flags (applied by the binary)
//! 2. Environment: `CATALOG_URL`, `MODULES_GROUPS`, `CATALOG_TIMEOUT_MS`,
//!    `MODULES_ANNOTATE_GROUP`
//! 3. Optional YAML file passed with `--config`
//! 4. Built-in defaults
//!
//! ```yaml
//! catalog_url: https://example.org/modules/catalog.json
//! allowed_groups: [net, io]
//! timeout_ms: 2000
//! annotate_group: true
//! ```
//!
//! The resolved [`SearchConfig`] is handed to the pipeline at construction;
//! nothing inside the core reads the environment on its own.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const ENV_CATALOG_URL: &str = "CATALOG_URL";
pub const ENV_GROUPS: &str = "MODULES_GROUPS";
pub const ENV_TIMEOUT_MS: &str = "CATALOG_TIMEOUT_MS";
pub const ENV_ANNOTATE_GROUP: &str = "MODULES_ANNOTATE_GROUP";

/// Per-fetch timeout when none is configured
pub const DEFAULT_TIMEOUT_MS: u64 = 1500;

/// Smallest per-fetch timeout accepted
pub const MIN_TIMEOUT_MS: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Catalog document URL; searching without one is a configuration error
    #[serde(default)]
    pub catalog_url: Option<String>,

    /// Group ids to serve; empty means every group in the catalog
    #[serde(default, alias = "groups")]
    pub allowed_groups: Vec<String>,

    /// Per-fetch timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Add a `group` field naming the owning group to each result
    #[serde(default)]
    pub annotate_group: bool,

    /// User-Agent sent on outbound fetches
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            catalog_url: None,
            allowed_groups: Vec::new(),
            timeout_ms: default_timeout_ms(),
            annotate_group: false,
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_user_agent() -> String {
    concat!("modsearch/", env!("CARGO_PKG_VERSION")).to_string()
}

impl SearchConfig {
    /// Defaults overlaid with the process environment
    pub fn from_env() -> Self {
        Self::default().with_env_lookup(|key| std::env::var(key).ok())
    }

    /// Optional YAML file overlaid with the process environment
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let base = match file {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        Ok(base.with_env_lookup(|key| std::env::var(key).ok()))
    }

    /// Parse a YAML configuration file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read search config: {}", path.display()))?;

        let config: SearchConfig = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse search config: {}", path.display()))?;

        Ok(config.normalized())
    }

    /// Overlay values found through `lookup`; unset variables leave fields alone
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_CATALOG_URL) {
            self.catalog_url = Some(url);
        }

        if let Some(groups) = lookup(ENV_GROUPS) {
            self.allowed_groups = parse_group_list(&groups);
        }

        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.timeout_ms = ms,
                Err(_) => warn!(
                    "Ignoring {}={:?}; using {}ms",
                    ENV_TIMEOUT_MS, raw, self.timeout_ms
                ),
            }
        }

        if let Some(raw) = lookup(ENV_ANNOTATE_GROUP) {
            self.annotate_group = is_truthy(&raw);
        }

        self.normalized()
    }

    /// Trim the catalog URL and group ids, drop blanks, floor the timeout
    pub fn normalized(mut self) -> Self {
        self.catalog_url = self
            .catalog_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        self.allowed_groups = self
            .allowed_groups
            .iter()
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .collect();

        if self.timeout_ms < MIN_TIMEOUT_MS {
            warn!(
                "Configured timeout_ms={} is too low; using minimum of {}ms",
                self.timeout_ms, MIN_TIMEOUT_MS
            );
            self.timeout_ms = MIN_TIMEOUT_MS;
        }

        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Split a comma-separated group list, trimming and dropping blanks
pub fn parse_group_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn is_truthy(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
