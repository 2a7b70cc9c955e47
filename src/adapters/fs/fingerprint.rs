use crate::domain::ports::Fingerprinter;
use crate::domain::state::Fingerprint;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

/// SHA-256 over the full file content, streamed.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Fingerprinter;

impl Sha256Fingerprinter {
    pub fn new() -> Self {
        Self
    }
}

impl Fingerprinter for Sha256Fingerprinter {
    fn fingerprint(&self, path: &Path) -> io::Result<Fingerprint> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut hasher = Sha256::new();
        let size_bytes = io::copy(&mut reader, &mut hasher)?;
        Ok(Fingerprint {
            sha256: format!("{:x}", hasher.finalize()),
            size_bytes,
        })
    }
}
