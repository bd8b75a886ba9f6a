//! Common test infrastructure
//!
//! Provides a running gateway backed by an in-process converter, plus
//! helpers for building multipart uploads.

#![allow(dead_code)]

use async_trait::async_trait;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use track_gateway::config::Config;
use track_gateway::convert::{ConversionJob, ConvertError, Converter};
use track_gateway::server::Server;

/// Minimal TCX document with an XML declaration
pub const SAMPLE_TCX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<TrainingCenterDatabase xmlns="http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2">
  <Activities>
    <Activity Sport="Running">
      <Id>2024-05-01T06:30:00Z</Id>
      <Lap StartTime="2024-05-01T06:30:00Z">
        <Track>
          <Trackpoint>
            <Time>2024-05-01T06:30:00Z</Time>
            <Position>
              <LatitudeDegrees>52.5200</LatitudeDegrees>
              <LongitudeDegrees>13.4050</LongitudeDegrees>
            </Position>
          </Trackpoint>
        </Track>
      </Lap>
    </Activity>
  </Activities>
</TrainingCenterDatabase>
"#;

/// Output written by [`FakeConverter`]
pub const FAKE_OUTPUT: &str = r#"<?xml version="1.0"?><gpx version="1.1" creator="fake"/>"#;

/// Converter that records each job and writes a fixed document
#[derive(Default)]
pub struct FakeConverter {
    pub jobs: Mutex<Vec<ConversionJob>>,
    pub inputs: Mutex<Vec<Vec<u8>>>,
}

#[async_trait]
impl Converter for FakeConverter {
    async fn convert(&self, job: &ConversionJob) -> Result<PathBuf, ConvertError> {
        let input = tokio::fs::read(&job.input_file)
            .await
            .map_err(ConvertError::Spawn)?;
        self.inputs.lock().unwrap().push(input);
        self.jobs.lock().unwrap().push(job.clone());

        let output = job.output_file()?;
        tokio::fs::write(&output, FAKE_OUTPUT)
            .await
            .map_err(ConvertError::Spawn)?;
        Ok(output)
    }
}

/// Converter that always fails the way gpsbabel does on bad input
pub struct FailingConverter;

#[async_trait]
impl Converter for FailingConverter {
    async fn convert(&self, job: &ConversionJob) -> Result<PathBuf, ConvertError> {
        Err(ConvertError::MissingOutput(job.output_file()?))
    }
}

/// Running gateway for a test
pub struct TestGateway {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    pub work_dir: tempfile::TempDir,
    handle: tokio::task::JoinHandle<()>,
}

impl TestGateway {
    pub async fn start(converter: Arc<dyn Converter>) -> Self {
        Self::start_with(converter, |_| {}).await
    }

    /// Start with a config tweak applied on top of the test defaults
    pub async fn start_with(
        converter: Arc<dyn Converter>,
        tweak: impl FnOnce(&mut Config),
    ) -> Self {
        let work_dir = tempfile::tempdir().unwrap();

        let mut config = Config::default();
        config.server.address = "127.0.0.1:0".into();
        config.convert.work_dir = work_dir.path().join("tmp");
        tweak(&mut config);

        let server = Server::with_converter(&config, converter).await.unwrap();
        let addr = server.local_addr();
        let handle = tokio::spawn(async move {
            let _ = server.run_until(std::future::pending()).await;
        });

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap();

        Self {
            addr,
            client,
            work_dir,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// POST `data` as the `file` form field
    pub async fn upload(&self, path: &str, filename: &str, data: impl Into<Vec<u8>>) -> reqwest::Response {
        let part = reqwest::multipart::Part::bytes(data.into()).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new()
            .text("comment", "morning run")
            .part("file", part);

        self.client
            .post(self.url(path))
            .multipart(form)
            .send()
            .await
            .unwrap()
    }

    /// Staging directories left behind under the work directory
    pub fn leftover_staging_dirs(&self) -> Vec<PathBuf> {
        list_dir(&self.work_dir.path().join("tmp"))
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn list_dir(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok().map(|e| e.path())).collect(),
        Err(_) => Vec::new(),
    }
}
