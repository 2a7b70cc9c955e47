use crate::domain::descriptor::CodebaseSnapshot;
use crate::domain::ports::DescriptorSource;
use crate::error::EngineError;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads a `CodebaseSnapshot` serialized as JSON by the parser front-end.
pub struct JsonSnapshotSource {
    path: PathBuf,
}

impl JsonSnapshotSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DescriptorSource for JsonSnapshotSource {
    fn load(&self) -> Result<CodebaseSnapshot> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read snapshot: {}", self.path.display()))?;
        let mut snapshot: CodebaseSnapshot =
            serde_json::from_str(&content).map_err(|e| EngineError::Snapshot {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        // relative sources resolve against the snapshot's own directory by default
        if snapshot.root.is_empty()
            && let Some(parent) = self.path.parent()
        {
            snapshot.root = parent.to_string_lossy().into_owned();
        }

        debug!(
            "Loaded snapshot {}: {} projects, {} files",
            self.path.display(),
            snapshot.projects.len(),
            snapshot.files.len()
        );
        Ok(snapshot)
    }
}
