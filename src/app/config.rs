use crate::domain::graph::DEFAULT_MAX_DEPTH;
use crate::domain::impact::DEFAULT_IMPACT_DEPTH;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Optional per-codebase configuration file, looked up in the codebase root.
pub const CONFIG_FILE: &str = "archflow.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Knowledge-base directory, relative to the codebase root unless absolute.
    pub output_dir: PathBuf,
    /// State file name inside `output_dir`.
    pub state_file: String,
    /// Hop cap for upstream impact traversal.
    pub impact_depth: usize,
    /// Hop cap for general upstream/downstream walks.
    pub traversal_depth: usize,
    /// Worker threads for classification and fingerprinting; 0 = one per core.
    pub workers: usize,
    /// Project-name patterns (`*` wildcard) excluded from class ownership.
    pub exclude_projects: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(".kb"),
            state_file: ".kb-state.json".to_string(),
            impact_depth: DEFAULT_IMPACT_DEPTH,
            traversal_depth: DEFAULT_MAX_DEPTH,
            workers: 0,
            exclude_projects: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Reads `archflow.toml` from `root`. A missing file means defaults.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid TOML in {}", path.display()))
    }

    pub fn output_path(&self, root: &Path) -> PathBuf {
        root.join(&self.output_dir)
    }

    pub fn state_path(&self, root: &Path) -> PathBuf {
        self.output_path(root).join(&self.state_file)
    }
}
