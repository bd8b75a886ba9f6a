//! Upload handler for `POST /convert`
//!
//! Performs, in order: form-file extraction, size check, content-type sniff,
//! staging-directory creation, file copy, converter invocation and the file
//! response. The staging directory is removed before the response leaves the
//! handler, on success and on every error path.
//!
//! # Query parameters
//!
//! * `from` - input format (default from `convert.input_format`)
//! * `to` - output format (default from `convert.output_format`)

use super::routes::text_response;
use crate::config::{ConfigError, ConvertConfig};
use crate::convert::{ConversionJob, ConvertError, Converter, TrackFormat, UnknownFormat};
use crate::metrics;
use crate::upload::{read_form_file, StagingDir, UploadError};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::header::{HeaderValue, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{Method, Request, Response, StatusCode};
use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info, warn};

/// Multipart field carrying the track file
pub const FORM_FIELD: &str = "file";

/// Errors surfaced to the client by the convert endpoint
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("The POST HTTP method is required.")]
    MethodNotAllowed,

    #[error(transparent)]
    UnsupportedFormat(#[from] UnknownFormat),

    #[error("Input format {0} is not an XML format.")]
    NonXmlInput(TrackFormat),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("The conversion was unsuccessful. Is the file type supported?")]
    Conversion(#[source] ConvertError),

    #[error("Failed to read converted file: {0}")]
    Output(#[source] std::io::Error),
}

impl HandlerError {
    pub fn status(&self) -> StatusCode {
        match self {
            HandlerError::MethodNotAllowed
            | HandlerError::UnsupportedFormat(_)
            | HandlerError::NonXmlInput(_) => StatusCode::BAD_REQUEST,
            HandlerError::Upload(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            HandlerError::Upload(_) | HandlerError::Conversion(_) | HandlerError::Output(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Label for the rejection counter, `None` for server-side failures
    fn rejection_reason(&self) -> Option<&'static str> {
        match self {
            HandlerError::MethodNotAllowed => Some("method"),
            HandlerError::UnsupportedFormat(_) | HandlerError::NonXmlInput(_) => Some("format"),
            HandlerError::Upload(e) if e.is_client_error() => Some(e.reason()),
            _ => None,
        }
    }

    pub fn into_response(self) -> Response<Full<Bytes>> {
        text_response(self.status(), self.to_string())
    }
}

/// Handler for the convert workflow
pub struct ConvertHandler {
    converter: Arc<dyn Converter>,
    work_dir: PathBuf,
    max_upload_size: u64,
    default_input: TrackFormat,
    default_output: TrackFormat,
}

impl ConvertHandler {
    /// Create a handler from the `convert` configuration section
    pub fn new(config: &ConvertConfig, converter: Arc<dyn Converter>) -> Result<Self, ConfigError> {
        Ok(Self {
            converter,
            work_dir: config.work_dir.clone(),
            max_upload_size: config.max_upload_size,
            default_input: config.input_format()?,
            default_output: config.output_format()?,
        })
    }

    /// Handle one request, mapping every failure to a text response
    pub async fn handle<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    {
        match self.convert(req).await {
            Ok(response) => response,
            Err(err) => {
                match err.rejection_reason() {
                    Some(reason) => {
                        metrics::record_rejection(reason);
                        info!(reason, error = %err, "Upload rejected");
                    }
                    None => error!(
                        error = %err,
                        source = ?std::error::Error::source(&err),
                        "Conversion request failed"
                    ),
                }
                err.into_response()
            }
        }
    }

    async fn convert<B>(&self, req: Request<B>) -> Result<Response<Full<Bytes>>, HandlerError>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    {
        if req.method() != Method::POST {
            return Err(HandlerError::MethodNotAllowed);
        }

        let (input_format, output_format) = self.formats(req.uri().query())?;

        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let upload = read_form_file(
            content_type.as_deref(),
            req.into_body().into_data_stream(),
            FORM_FIELD,
            self.max_upload_size,
        )
        .await?;
        let payload = upload.xml_payload()?;

        metrics::record_upload(payload.len() as u64);
        info!(
            filename = ?upload.filename,
            bytes = payload.len(),
            input = %input_format,
            output = %output_format,
            "Accepted upload"
        );

        let staging = StagingDir::create(&self.work_dir).await?;
        let input_file = staging
            .write_file(
                upload.filename.as_deref(),
                input_format.extension(),
                &payload,
            )
            .await?;

        let job = ConversionJob {
            input_format,
            input_file,
            output_format,
            output_dir: staging.path().to_path_buf(),
        };

        let started = Instant::now();
        let result = self.converter.convert(&job).await;
        let elapsed = started.elapsed().as_secs_f64();
        metrics::record_conversion(
            input_format.tool_name(),
            output_format.tool_name(),
            result.is_ok(),
            elapsed,
        );

        let output_file = result.map_err(|e| {
            warn!(error = %e, stderr = e.stderr().unwrap_or(""), "Conversion failed");
            HandlerError::Conversion(e)
        })?;

        let body = tokio::fs::read(&output_file)
            .await
            .map_err(HandlerError::Output)?;

        // Contents are in memory; the staging directory can go now
        drop(staging);

        info!(
            bytes = body.len(),
            elapsed_secs = elapsed,
            "Conversion complete"
        );

        Ok(file_response(output_format, &output_file, Bytes::from(body)))
    }

    /// Resolve `from` / `to` query parameters against the configured defaults
    fn formats(&self, query: Option<&str>) -> Result<(TrackFormat, TrackFormat), HandlerError> {
        let mut input = self.default_input;
        let mut output = self.default_output;

        for (key, value) in parse_query(query) {
            match key.as_str() {
                "from" => input = value.parse()?,
                "to" => output = value.parse()?,
                _ => {}
            }
        }

        if !input.is_xml() {
            return Err(HandlerError::NonXmlInput(input));
        }

        Ok((input, output))
    }
}

fn parse_query(query: Option<&str>) -> Vec<(String, String)> {
    let Some(q) = query else {
        return Vec::new();
    };

    q.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let mut kv = pair.splitn(2, '=');
            let key = kv.next().unwrap_or("");
            let value = kv.next().unwrap_or("");
            (decode(key), decode(value))
        })
        .collect()
}

fn decode(s: &str) -> String {
    percent_decode_str(&s.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned()
}

/// Successful response carrying the converted file
fn file_response(format: TrackFormat, path: &Path, body: Bytes) -> Response<Full<Bytes>> {
    let len = body.len() as u64;
    let mut response = Response::new(Full::new(body));
    let headers = response.headers_mut();

    headers.insert(CONTENT_TYPE, HeaderValue::from_static(format.content_type()));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(len));

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("converted.{}", format.extension()));
    if let Ok(value) = HeaderValue::from_str(&content_disposition(&name)) {
        headers.insert(CONTENT_DISPOSITION, value);
    }

    response
}

/// `attachment` disposition; non-ASCII names also get an RFC 5987 `filename*`.
fn content_disposition(name: &str) -> String {
    let ascii: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();

    if name.is_ascii() && !name.contains(['"', '\\']) {
        format!("attachment; filename=\"{}\"", ascii)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            ascii,
            utf8_percent_encode(name, NON_ALPHANUMERIC)
        )
    }
}
