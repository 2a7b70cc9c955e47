use std::path::PathBuf;
use thiserror::Error;

/// Conditions that abort a run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no project or solution found under {root}")]
    NoProjects { root: String },

    #[error("failed to write state file {}", path.display())]
    StateWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("descriptor snapshot {} is unusable: {reason}", path.display())]
    Snapshot { path: PathBuf, reason: String },
}
