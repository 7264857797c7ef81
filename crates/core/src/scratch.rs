use crate::error::IngestError;
use std::path::PathBuf;
use tempfile::{Builder, TempDir};
use tracing::{debug, warn};

const SCRATCH_PREFIX: &str = "bid-ingest-";

#[derive(Debug, Default)]
pub struct ScratchTracker {
    root: Option<PathBuf>,
    dirs: Vec<TempDir>,
}

impl ScratchTracker {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self {
            root,
            dirs: Vec::new(),
        }
    }

    pub fn allocate(&mut self) -> Result<PathBuf, IngestError> {
        let mut builder = Builder::new();
        builder.prefix(SCRATCH_PREFIX);

        let dir = match &self.root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };

        let path = dir.path().to_path_buf();
        self.dirs.push(dir);
        debug!(path = %path.display(), "allocated scratch directory");
        Ok(path)
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    pub fn sweep(&mut self) -> usize {
        let mut removed = 0;
        while let Some(dir) = self.dirs.pop() {
            let path = dir.path().to_path_buf();
            match dir.close() {
                Ok(()) => removed += 1,
                Err(error) => {
                    warn!(path = %path.display(), error = %error, "failed to remove scratch directory")
                }
            }
        }
        removed
    }
}

impl Drop for ScratchTracker {
    fn drop(&mut self) {
        self.sweep();
    }
}
