//! Conversion module
//!
//! Delegates the actual format translation to an external tool. The gateway
//! only decides where the input lives and where the output should go.

use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

pub mod format;
pub mod gpsbabel;

pub use format::{TrackFormat, UnknownFormat};
pub use gpsbabel::GpsBabel;

/// Conversion errors
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Failed to start converter: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Converter exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },

    #[error("Converter timed out after {0:?}")]
    Timeout(Duration),

    #[error("Converter produced no output at {0}")]
    MissingOutput(PathBuf),

    #[error("Invalid input path: {0}")]
    InvalidInput(PathBuf),
}

impl ConvertError {
    /// Diagnostic output of the tool, if it got far enough to write any
    pub fn stderr(&self) -> Option<&str> {
        match self {
            ConvertError::Failed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

/// One invocation of the converter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    pub input_format: TrackFormat,
    pub input_file: PathBuf,
    pub output_format: TrackFormat,
    pub output_dir: PathBuf,
}

impl ConversionJob {
    /// Where the converted file is written
    pub fn output_file(&self) -> Result<PathBuf, ConvertError> {
        output_path(&self.input_file, &self.output_dir, self.output_format)
    }
}

/// Converter trait
#[async_trait::async_trait]
pub trait Converter: Send + Sync {
    /// Convert `job.input_file`, returning the path of the produced file
    async fn convert(&self, job: &ConversionJob) -> Result<PathBuf, ConvertError>;
}

/// Build `<output_dir>/<input stem>.<output extension>`.
///
/// The stem drops only the last extension, so `a.b.tcx` becomes `a.b`.
pub fn output_path(
    input_file: &Path,
    output_dir: &Path,
    output_format: TrackFormat,
) -> Result<PathBuf, ConvertError> {
    let stem = input_file
        .file_stem()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ConvertError::InvalidInput(input_file.to_path_buf()))?;

    let mut name = stem.to_os_string();
    name.push(".");
    name.push(output_format.extension());
    Ok(output_dir.join(name))
}
