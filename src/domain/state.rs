//! Persisted change-tracking state.
//!
//! One record per knowledge base: a fingerprint per tracked source file and, per generated
//! output, the source files it was produced from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Schema tag written into every state file. A stored record with a different tag is
/// treated as absent.
pub const STATE_VERSION: &str = "0.1.0";

/// Content fingerprint of one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Lowercase hex SHA-256 of the full content.
    pub sha256: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileState {
    pub path: String,
    pub sha256: String,
    pub last_scanned: DateTime<Utc>,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KbState {
    pub version: String,
    #[serde(default)]
    pub last_full_scan: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
    /// Source path → fingerprint record.
    #[serde(default)]
    pub files: BTreeMap<String, FileState>,
    /// Output identifier → source files that produced it.
    #[serde(default)]
    pub kb_outputs: BTreeMap<String, Vec<String>>,
}

impl Default for KbState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION.to_string(),
            last_full_scan: None,
            last_update: None,
            files: BTreeMap::new(),
            kb_outputs: BTreeMap::new(),
        }
    }
}

impl KbState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_current_version(&self) -> bool {
        self.version == STATE_VERSION
    }

    pub fn record(&mut self, path: impl Into<String>, fingerprint: Fingerprint, at: DateTime<Utc>) {
        let path = path.into();
        self.files.insert(
            path.clone(),
            FileState {
                path,
                sha256: fingerprint.sha256,
                last_scanned: at,
                size_bytes: fingerprint.size_bytes,
            },
        );
    }

    /// Drops the fingerprint records of `paths`.
    pub fn forget<'p>(&mut self, paths: impl IntoIterator<Item = &'p String>) {
        for path in paths {
            self.files.remove(path);
        }
    }

    pub fn tracked_files(&self) -> BTreeSet<&str> {
        self.files.keys().map(String::as_str).collect()
    }
}

/// Files classified against the prior state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
}

impl ChangeSet {
    pub fn has_changes(&self) -> bool {
        !(self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty())
    }

    /// Added plus modified: the files whose current content needs analysis.
    pub fn all_changed(&self) -> Vec<String> {
        self.added.iter().chain(&self.modified).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.deleted.len()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_changes()
    }
}
