use crate::domain::descriptor::CodebaseSnapshot;
use crate::domain::state::{Fingerprint, KbState};
use crate::error::EngineError;
use anyhow::Result;
use std::path::Path;

/// Parser and project-discovery output (implemented by Infrastructure)
pub trait DescriptorSource {
    fn load(&self) -> Result<CodebaseSnapshot>;
}

/// Content fingerprinting port. Called from worker threads.
pub trait Fingerprinter: Send + Sync {
    fn fingerprint(&self, path: &Path) -> std::io::Result<Fingerprint>;
}

/// Persisted change-tracking state
pub trait StateStore {
    /// `None` when no usable state exists: missing, unreadable, corrupt or another version.
    fn load(&self) -> Option<KbState>;

    /// Replaces the stored state atomically.
    fn save(&self, state: &KbState) -> std::result::Result<(), EngineError>;

    /// Removes the stored state; a missing state is not an error.
    fn clear(&self) -> std::result::Result<(), EngineError>;
}
