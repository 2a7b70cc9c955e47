//! In-memory port implementations for integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use archflow::EngineError;
use archflow::domain::descriptor::CodebaseSnapshot;
use archflow::domain::ports::{DescriptorSource, Fingerprinter, StateStore};
use archflow::domain::state::{Fingerprint, KbState};

/// Serves a shared snapshot that tests can edit between engine calls.
#[derive(Clone, Default)]
pub struct MemorySource {
    pub snapshot: Arc<Mutex<CodebaseSnapshot>>,
}

impl MemorySource {
    pub fn new(snapshot: CodebaseSnapshot) -> Self {
        Self {
            snapshot: Arc::new(Mutex::new(snapshot)),
        }
    }

    pub fn set(&self, snapshot: CodebaseSnapshot) {
        *self.snapshot.lock().unwrap() = snapshot;
    }
}

impl DescriptorSource for MemorySource {
    fn load(&self) -> Result<CodebaseSnapshot> {
        Ok(self.snapshot.lock().unwrap().clone())
    }
}

/// File contents keyed by relative path; a path matches when it ends with the key.
#[derive(Clone, Default)]
pub struct MemoryFingerprinter {
    pub contents: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryFingerprinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files<'a>(paths: impl IntoIterator<Item = &'a str>) -> Self {
        let fingerprinter = Self::new();
        for path in paths {
            fingerprinter.write(path, "v1");
        }
        fingerprinter
    }

    pub fn write(&self, path: &str, content: &str) {
        self.contents
            .lock()
            .unwrap()
            .insert(path.to_string(), content.to_string());
    }

    pub fn remove(&self, path: &str) {
        self.contents.lock().unwrap().remove(path);
    }
}

impl Fingerprinter for MemoryFingerprinter {
    fn fingerprint(&self, path: &Path) -> io::Result<Fingerprint> {
        let contents = self.contents.lock().unwrap();
        contents
            .iter()
            .find(|(key, _)| path.ends_with(key.as_str()))
            .map(|(_, content)| Fingerprint {
                sha256: format!("{:x}", content.len() * 31 + content.bytes().map(usize::from).sum::<usize>()),
                size_bytes: content.len() as u64,
            })
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }
}

/// State held in memory and shared with the test.
#[derive(Clone, Default)]
pub struct MemoryStateStore {
    pub state: Arc<Mutex<Option<KbState>>>,
    pub saves: Arc<Mutex<usize>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<KbState> {
        self.state.lock().unwrap().clone()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Option<KbState> {
        self.current()
    }

    fn save(&self, state: &KbState) -> std::result::Result<(), EngineError> {
        *self.state.lock().unwrap() = Some(state.clone());
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }

    fn clear(&self) -> std::result::Result<(), EngineError> {
        *self.state.lock().unwrap() = None;
        Ok(())
    }
}
