use std::path::{Path, PathBuf};

/// Guard for the per-request temporary audio file.
///
/// Reserving a path does not create the file; the fetch stage writes it.
/// Release removes whatever is at the path and tolerates the file never
/// having been created. Drop releases too, so every exit path of the
/// pipeline - including cancellation - cleans up.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    released: bool,
}

impl ScratchFile {
    pub fn reserve(dir: &Path, file_name: &str) -> Self {
        Self {
            path: dir.join(file_name),
            released: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file if it exists. Idempotent, never fails the request.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        match fs_err::remove_file(&self.path) {
            Ok(()) => tracing::debug!("Removed temporary file {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                "Failed to remove temporary file {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        self.release();
    }
}
