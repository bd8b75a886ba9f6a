//! gpsbabel Runner Integration Tests
//!
//! Uses small shell scripts that stand in for gpsbabel, so the real process
//! handling (arguments, exit codes, stderr, timeout) is exercised without the
//! actual tool installed.

#![cfg(unix)]

mod common;

use common::{TestGateway, SAMPLE_TCX};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use track_gateway::convert::{ConversionJob, ConvertError, Converter, GpsBabel, TrackFormat};

/// Copies `-f` to `-F`, like a successful same-format conversion
const COPY_SCRIPT: &str = r#"#!/bin/sh
if [ "$1" = "-V" ]; then
  echo "GPSBabel Version 1.8.0"
  exit 0
fi
while [ $# -gt 0 ]; do
  case "$1" in
    -f) input="$2"; shift 2 ;;
    -F) output="$2"; shift 2 ;;
    *) shift ;;
  esac
done
cp "$input" "$output"
"#;

const FAIL_SCRIPT: &str = r#"#!/bin/sh
echo "gtrnctr: Unsupported file version" >&2
exit 1
"#;

const SLOW_SCRIPT: &str = r#"#!/bin/sh
sleep 10
"#;

const SILENT_SCRIPT: &str = r#"#!/bin/sh
exit 0
"#;

/// All scripts are written once, before any test spawns a process, so no
/// script is still open for writing when another test executes it.
fn scripts() -> &'static Path {
    static DIR: OnceLock<tempfile::TempDir> = OnceLock::new();
    DIR.get_or_init(|| {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in [
            ("copy.sh", COPY_SCRIPT),
            ("fail.sh", FAIL_SCRIPT),
            ("slow.sh", SLOW_SCRIPT),
            ("silent.sh", SILENT_SCRIPT),
        ] {
            let path = dir.path().join(name);
            std::fs::write(&path, body).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
        dir
    })
    .path()
}

fn script(name: &str) -> PathBuf {
    scripts().join(name)
}

fn staged_job(dir: &Path) -> ConversionJob {
    let input_file = dir.join("ride.tcx");
    std::fs::write(&input_file, SAMPLE_TCX).unwrap();
    ConversionJob {
        input_format: TrackFormat::Tcx,
        input_file,
        output_format: TrackFormat::Gpx,
        output_dir: dir.to_path_buf(),
    }
}

#[tokio::test]
async fn test_successful_conversion_returns_output_path() {
    let dir = tempfile::tempdir().unwrap();
    let job = staged_job(dir.path());
    let babel = GpsBabel::new(script("copy.sh"), Duration::from_secs(5));

    let output = babel.convert(&job).await.unwrap();

    assert_eq!(output, dir.path().join("ride.gpx"));
    assert_eq!(std::fs::read_to_string(&output).unwrap(), SAMPLE_TCX);
}

#[tokio::test]
async fn test_failure_captures_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let job = staged_job(dir.path());
    let babel = GpsBabel::new(script("fail.sh"), Duration::from_secs(5));

    let err = babel.convert(&job).await.unwrap_err();

    match &err {
        ConvertError::Failed { status, stderr } => {
            assert_eq!(status.code(), Some(1));
            assert_eq!(stderr, "gtrnctr: Unsupported file version");
        }
        other => panic!("Expected Failed, got {:?}", other),
    }
    assert_eq!(err.stderr(), Some("gtrnctr: Unsupported file version"));
}

#[tokio::test]
async fn test_timeout_kills_converter() {
    let dir = tempfile::tempdir().unwrap();
    let job = staged_job(dir.path());
    let babel = GpsBabel::new(script("slow.sh"), Duration::from_millis(200));

    let started = std::time::Instant::now();
    let err = babel.convert(&job).await.unwrap_err();

    assert!(matches!(err, ConvertError::Timeout(_)));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_zero_exit_without_output_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let job = staged_job(dir.path());
    let babel = GpsBabel::new(script("silent.sh"), Duration::from_secs(5));

    let err = babel.convert(&job).await.unwrap_err();

    assert!(matches!(err, ConvertError::MissingOutput(path) if path == dir.path().join("ride.gpx")));
}

#[tokio::test]
async fn test_version() {
    let babel = GpsBabel::new(script("copy.sh"), Duration::from_secs(5));
    assert_eq!(babel.version().await.unwrap(), "GPSBabel Version 1.8.0");

    let babel = GpsBabel::new(script("fail.sh"), Duration::from_secs(5));
    assert!(babel.version().await.is_err());
}

#[tokio::test]
async fn test_gateway_with_script_converter() {
    let babel = Arc::new(GpsBabel::new(script("copy.sh"), Duration::from_secs(5)));
    let gateway = TestGateway::start(babel).await;

    let response = gateway.upload("/convert", "ride.tcx", SAMPLE_TCX).await;

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), SAMPLE_TCX);
    assert!(gateway.leftover_staging_dirs().is_empty());
}

#[tokio::test]
async fn test_gateway_reports_tool_failure() {
    let babel = Arc::new(GpsBabel::new(script("fail.sh"), Duration::from_secs(5)));
    let gateway = TestGateway::start(babel).await;

    let response = gateway.upload("/convert", "ride.tcx", SAMPLE_TCX).await;

    assert_eq!(response.status(), 500);
    assert!(gateway.leftover_staging_dirs().is_empty());
}
