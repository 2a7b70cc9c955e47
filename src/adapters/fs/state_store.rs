use crate::domain::ports::StateStore;
use crate::domain::state::KbState;
use crate::error::EngineError;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// `KbState` as pretty-printed JSON at a fixed path.
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_error(&self, source: io::Error) -> EngineError {
        EngineError::StateWrite {
            path: self.path.clone(),
            source,
        }
    }
}

impl StateStore for JsonStateStore {
    fn load(&self) -> Option<KbState> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No existing state at {}", self.path.display());
                return None;
            }
            Err(e) => {
                warn!("Cannot read state {}: {}", self.path.display(), e);
                return None;
            }
        };

        let state: KbState = match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(e) => {
                warn!("Ignoring corrupt state {}: {}", self.path.display(), e);
                return None;
            }
        };
        if !state.is_current_version() {
            warn!(
                "Ignoring state {} with version {}",
                self.path.display(),
                state.version
            );
            return None;
        }

        info!("Loaded state with {} tracked files", state.files.len());
        Some(state)
    }

    /// Written to a sibling temp file first, then renamed over the target.
    fn save(&self, state: &KbState) -> Result<(), EngineError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.write_error(e))?;
        }
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| self.write_error(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, json).map_err(|e| self.write_error(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.write_error(e))?;

        debug!("Saved state to {}", self.path.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), EngineError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Removed state {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.write_error(e)),
        }
    }
}
