use crate::domain::descriptor::{normalize_path, paths_match};
use crate::domain::ports::Fingerprinter;
use crate::domain::state::{ChangeSet, Fingerprint, KbState};
use chrono::Utc;
use rayon::prelude::*;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Change Tracker - classifies source files against the persisted state and maintains the
/// output provenance map.
///
/// Paths are tracked as given (normalized to `/`); hashing resolves them against `root`.
pub struct StateTracker<'a> {
    root: PathBuf,
    fingerprinter: &'a dyn Fingerprinter,
}

impl<'a> StateTracker<'a> {
    pub fn new(root: impl Into<PathBuf>, fingerprinter: &'a dyn Fingerprinter) -> Self {
        Self {
            root: root.into(),
            fingerprinter,
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        }
    }

    /// Fingerprints `paths` in parallel. Unreadable files map to `None`.
    fn fingerprint_all(&self, paths: &[String]) -> Vec<(String, Option<Fingerprint>)> {
        paths
            .par_iter()
            .map(|path| {
                let key = normalize_path(path);
                match self.fingerprinter.fingerprint(&self.resolve(path)) {
                    Ok(print) => (key, Some(print)),
                    Err(e) => {
                        warn!("Cannot fingerprint {}: {}", path, e);
                        (key, None)
                    }
                }
            })
            .collect()
    }

    /// Added: not tracked before. Modified: tracked with a different digest. Deleted: tracked
    /// but no longer present. A current file that cannot be read counts as modified.
    pub fn compute_changes(&self, current_files: &[String], state: &KbState) -> ChangeSet {
        let mut changes = ChangeSet::default();
        let current: HashSet<String> = current_files.iter().map(|p| normalize_path(p)).collect();

        let (known, added): (Vec<String>, Vec<String>) = current_files
            .iter()
            .map(|p| normalize_path(p))
            .partition(|p| state.files.contains_key(p));

        for (path, print) in self.fingerprint_all(&known) {
            let unchanged = print
                .as_ref()
                .zip(state.files.get(&path))
                .is_some_and(|(now, before)| now.sha256 == before.sha256);
            if !unchanged {
                debug!("Modified: {}", path);
                changes.modified.push(path);
            }
        }

        for path in added {
            debug!("Added: {}", path);
            changes.added.push(path);
        }

        for path in state.files.keys() {
            if !current.contains(path) {
                debug!("Deleted: {}", path);
                changes.deleted.push(path.clone());
            }
        }

        changes.added.sort();
        changes.modified.sort();
        info!(
            "Changes: +{} ~{} -{}",
            changes.added.len(),
            changes.modified.len(),
            changes.deleted.len()
        );
        changes
    }

    /// Re-fingerprints `files` into `state`. Returns how many were recorded; unreadable files
    /// keep their previous record, and one with no record is warned about since every later
    /// update reports it as added.
    pub fn update_file_states(&self, state: &mut KbState, files: &[String]) -> usize {
        let now = Utc::now();
        let mut recorded = 0;
        for (path, print) in self.fingerprint_all(files) {
            match print {
                Some(print) => {
                    state.record(path, print, now);
                    recorded += 1;
                }
                None if !state.files.contains_key(&path) => {
                    warn!(
                        "{} left untracked; every update reports it as added until it can be read",
                        path
                    );
                }
                None => {}
            }
        }
        recorded
    }

    /// Records which source files produced `output`.
    pub fn mark_output(&self, state: &mut KbState, output: impl Into<String>, sources: Vec<String>) {
        let sources = sources.iter().map(|s| normalize_path(s)).collect();
        state.kb_outputs.insert(output.into(), sources);
    }

    /// Outputs whose recorded sources include any of `changed`.
    pub fn affected_outputs(&self, state: &KbState, changed: &[String]) -> BTreeSet<String> {
        state
            .kb_outputs
            .iter()
            .filter(|(_, sources)| {
                sources
                    .iter()
                    .any(|src| changed.iter().any(|c| paths_match(src, c)))
            })
            .map(|(output, _)| output.clone())
            .collect()
    }
}
