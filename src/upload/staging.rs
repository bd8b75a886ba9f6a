//! Per-request staging directories
//!
//! Each conversion gets its own directory under the configured work
//! directory. The upload and the converter output both live there, and the
//! whole directory is removed when the [`StagingDir`] is dropped.
//!
//! # Example
//!
//! ```no_run
//! use track_gateway::upload::staging::StagingDir;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let staging = StagingDir::create("tmp").await?;
//! let input = staging.write_file(Some("ride.tcx"), "tcx", b"<?xml ?>").await?;
//! println!("Staged upload at {:?}", input);
//! // Directory and contents are removed here
//! # Ok(())
//! # }
//! ```

use super::UploadError;
use std::path::{Path, PathBuf};

/// Temporary directory holding one request's files
///
/// Automatically removed when dropped (RAII pattern).
#[derive(Debug)]
pub struct StagingDir {
    path: PathBuf,
}

impl StagingDir {
    /// Create a fresh staging directory below `work_dir`
    ///
    /// `work_dir` itself is created if missing. The directory name starts with
    /// the current Unix time in nanoseconds followed by a random suffix.
    pub async fn create(work_dir: impl AsRef<Path>) -> Result<Self, UploadError> {
        let work_dir = work_dir.as_ref();
        tokio::fs::create_dir_all(work_dir).await?;

        let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let path = work_dir.join(format!("{}-{}", nanos, &suffix[..12]));

        // create_dir (not _all) so a name collision is an error, never a shared dir
        tokio::fs::create_dir(&path).await?;

        tracing::debug!(path = %path.display(), "Created staging directory");
        Ok(Self { path })
    }

    /// Get the path to the staging directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `data` into the directory under a sanitized form of `filename`
    pub async fn write_file(
        &self,
        filename: Option<&str>,
        fallback_extension: &str,
        data: &[u8],
    ) -> Result<PathBuf, UploadError> {
        let name = sanitize_filename(filename, fallback_extension);
        let path = self.path.join(name);
        tokio::fs::write(&path, data).await?;
        Ok(path)
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to clean up staging directory"
                );
            }
        }
    }
}

/// Reduce a client-supplied filename to a safe single path component.
///
/// Both `/` and `\` count as separators, since browsers on Windows may send
/// full paths. Names that are empty, `.`, `..` or contain NUL fall back to
/// `upload.<fallback_extension>`.
pub fn sanitize_filename(filename: Option<&str>, fallback_extension: &str) -> String {
    let candidate = filename
        .and_then(|name| name.rsplit(['/', '\\']).next())
        .map(str::trim)
        .unwrap_or_default();

    match candidate {
        "" | "." | ".." => format!("upload.{}", fallback_extension),
        name if name.contains('\0') => format!("upload.{}", fallback_extension),
        name => name.to_string(),
    }
}
