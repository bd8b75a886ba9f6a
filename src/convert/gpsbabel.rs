//! gpsbabel process runner
//!
//! Runs `gpsbabel -i <in> -f <input> -o <out> -F <output>` with captured
//! output and a hard timeout. The child is killed if the timeout elapses.

use super::{ConversionJob, ConvertError, Converter};
use crate::config::ConvertConfig;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

/// Converter backed by the gpsbabel command-line tool
#[derive(Debug, Clone)]
pub struct GpsBabel {
    binary: PathBuf,
    timeout: Duration,
}

impl GpsBabel {
    /// Create a runner for `binary` with the given timeout
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    /// Create a runner from the `convert` configuration section
    pub fn from_config(config: &ConvertConfig) -> Self {
        Self::new(&config.binary, Duration::from_secs(config.timeout_seconds))
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Command-line arguments for one conversion
    pub fn args(job: &ConversionJob, output_file: &Path) -> Vec<OsString> {
        vec![
            "-i".into(),
            job.input_format.tool_name().into(),
            "-f".into(),
            job.input_file.clone().into_os_string(),
            "-o".into(),
            job.output_format.tool_name().into(),
            "-F".into(),
            output_file.as_os_str().to_owned(),
        ]
    }

    /// Report the tool version (`gpsbabel -V`)
    ///
    /// Used at start-up to find out early whether the binary is installed.
    pub async fn version(&self) -> Result<String, ConvertError> {
        let child = Command::new(&self.binary)
            .arg("-V")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(ConvertError::Spawn)?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ConvertError::Timeout(self.timeout))?
            .map_err(ConvertError::Spawn)?;

        if !output.status.success() {
            return Err(ConvertError::Failed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait::async_trait]
impl Converter for GpsBabel {
    async fn convert(&self, job: &ConversionJob) -> Result<PathBuf, ConvertError> {
        let output_file = job.output_file()?;
        let args = Self::args(job, &output_file);

        debug!(binary = %self.binary.display(), ?args, "Running converter");

        let started = Instant::now();
        let child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(ConvertError::Spawn)?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(ConvertError::Spawn)?,
            Err(_) => {
                warn!(
                    binary = %self.binary.display(),
                    timeout_secs = self.timeout.as_secs_f64(),
                    "Converter timed out, killed"
                );
                return Err(ConvertError::Timeout(self.timeout));
            }
        };

        debug!(
            status = %output.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            stdout_bytes = output.stdout.len(),
            "Converter finished"
        );

        if !output.status.success() {
            return Err(ConvertError::Failed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        match tokio::fs::metadata(&output_file).await {
            Ok(meta) if meta.is_file() => Ok(output_file),
            _ => Err(ConvertError::MissingOutput(output_file)),
        }
    }
}
