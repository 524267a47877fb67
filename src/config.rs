//! Configuration for wtr
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Environment variables (`WTR_DEFAULT_BASE`, `WTR_FUZZY_THRESHOLD`)
//! 2. The first config file found:
//!    `<repo>/.wtrrc`, `<repo>/.wtrrc.toml`, `~/.config/wtr/config.toml`
//! 3. Default values
//!
//! A broken config file is reported and ignored rather than fatal.

use crate::fuzzy::DEFAULT_THRESHOLD;
use crate::worktree::EngineOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Worktree-related settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct WorktreeConfig {
    /// Base for new branches; empty means auto-detect the main branch
    pub default_base: String,
}

/// Picker display settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct UiConfig {
    pub show_status: bool,
    pub show_preview: bool,
    pub preview_count: usize,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_status: true,
            show_preview: true,
            preview_count: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PruneConfig {
    /// Suggest pruning in the picker when stale worktrees exist
    pub auto_suggest: bool,
}

impl Default for PruneConfig {
    fn default() -> Self {
        Self { auto_suggest: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FuzzyConfig {
    /// Minimum score (0-100) for a branch to survive filtering
    pub threshold: u8,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub worktree: WorktreeConfig,
    pub ui: UiConfig,
    pub prune: PruneConfig,
    pub fuzzy: FuzzyConfig,
}

impl Config {
    /// Load the first config file found for `repo_root`, with env overrides
    pub fn load(repo_root: Option<&Path>) -> Self {
        let config = match Self::find(repo_root) {
            Some(path) => Self::load_from_file(&path).unwrap_or_else(|e| {
                log::warn!("ignoring config {}: {}", path.display(), e);
                Self::default()
            }),
            None => Self::default(),
        };
        config.with_env_overrides()
    }

    /// Candidate config files, in search order
    pub fn candidates(repo_root: Option<&Path>) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(root) = repo_root {
            paths.push(root.join(".wtrrc"));
            paths.push(root.join(".wtrrc.toml"));
        }
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("wtr").join("config.toml"));
        }
        paths
    }

    pub fn find(repo_root: Option<&Path>) -> Option<PathBuf> {
        Self::candidates(repo_root).into_iter().find(|p| p.is_file())
    }

    pub fn load_from_file(path: &Path) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
        let config: Self = toml::from_str(&contents).map_err(|e| e.to_string())?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a variable lookup
    ///
    /// Supported variables:
    /// - WTR_DEFAULT_BASE: base branch for new worktrees
    /// - WTR_FUZZY_THRESHOLD: fuzzy filter threshold (0-100)
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(base) = lookup("WTR_DEFAULT_BASE") {
            self.worktree.default_base = base;
        }

        if let Some(raw) = lookup("WTR_FUZZY_THRESHOLD") {
            match raw.trim().parse::<u8>() {
                Ok(t) if t <= 100 => self.fuzzy.threshold = t,
                _ => log::warn!("ignoring WTR_FUZZY_THRESHOLD={:?}: expected 0-100", raw),
            }
        }

        self
    }

    pub fn to_engine_options(&self) -> EngineOptions {
        let base = self.worktree.default_base.trim();
        EngineOptions {
            default_base: (!base.is_empty()).then(|| base.to_string()),
            fuzzy_threshold: self.fuzzy.threshold.min(100),
            prune_auto_suggest: self.prune.auto_suggest,
        }
    }
}
