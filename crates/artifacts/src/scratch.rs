//! Scratch file allocation for renderer output.
//!
//! Names are 12 random lower-case hex digits with a `.png` suffix. A path
//! stays reserved in the store until its [`ScratchFile`] guard is released
//! or dropped, so two in-flight renders never share an output path.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use rand::Rng;

/// Random bytes per name (12 hex digits, 48 bits).
const NAME_BYTES: usize = 6;

/// Allocates collision-resistant scratch paths under a shared directory.
#[derive(Debug, Clone)]
pub struct TempArtifactStore {
    dir: PathBuf,
    live: Arc<Mutex<HashSet<PathBuf>>>,
}

impl TempArtifactStore {
    /// Creates a store allocating under `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            live: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Creates a store under the system temporary directory.
    pub fn system() -> Self {
        Self::new(std::env::temp_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reserves a fresh scratch path. The file itself is not created.
    pub fn allocate(&self) -> ScratchFile {
        let mut live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            let candidate = self.dir.join(format!("{}.png", random_name()));
            if live.insert(candidate.clone()) {
                tracing::debug!(path = %candidate.display(), "scratch path allocated");
                return ScratchFile {
                    path: candidate,
                    live: Arc::clone(&self.live),
                    released: false,
                };
            }
        }
    }

    /// Deletes `path` if present and drops its reservation.
    ///
    /// Releasing an already-absent file is not an error.
    pub fn release(&self, path: &Path) -> io::Result<()> {
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path);
        remove_if_present(path)
    }

    /// Number of paths currently reserved.
    pub fn live_count(&self) -> usize {
        self.live.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// A reserved scratch path, deleted when released or dropped.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    live: Arc<Mutex<HashSet<PathBuf>>>,
    released: bool,
}

impl ScratchFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes the file now, reporting any I/O failure.
    pub fn release(mut self) -> io::Result<()> {
        self.released = true;
        self.unreserve();
        remove_if_present(&self.path)
    }

    fn unreserve(&self) {
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.path);
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.unreserve();
        if let Err(e) = remove_if_present(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove scratch file");
        }
    }
}

fn random_name() -> String {
    let mut bytes = [0u8; NAME_BYTES];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
