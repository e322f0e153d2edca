//! File-handle based model access.
//!
//! Holding an open read handle for the whole run pins the model file: the
//! grant proves the file was readable when the server started, and the
//! handle is closed when the grant drops.

use std::fs::File;
use std::path::{Path, PathBuf};

use llamad_core::ports::{AccessGrant, ModelAccessPort, ProcessError};
use tracing::debug;

/// [`ModelAccessPort`] that opens the model file for reading.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileModelAccess;

#[derive(Debug)]
struct FileGrant {
    path: PathBuf,
    _handle: File,
}

impl AccessGrant for FileGrant {
    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileGrant {
    fn drop(&mut self) {
        debug!(path = %self.path.display(), "Released model access");
    }
}

impl ModelAccessPort for FileModelAccess {
    fn acquire(&self, path: &Path) -> Result<Box<dyn AccessGrant>, ProcessError> {
        let handle = File::open(path)
            .map_err(|e| ProcessError::AccessDenied(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), "Acquired model access");
        Ok(Box::new(FileGrant {
            path: path.to_path_buf(),
            _handle: handle,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_readable_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let grant = FileModelAccess.acquire(file.path()).unwrap();
        assert_eq!(grant.path(), file.path());
    }

    #[test]
    fn test_acquire_missing_file_is_denied() {
        let err = FileModelAccess
            .acquire(Path::new("/nonexistent/model.gguf"))
            .unwrap_err();
        assert!(matches!(err, ProcessError::AccessDenied(_)));
    }
}
