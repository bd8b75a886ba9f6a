//! Upload module
//!
//! Extracts the uploaded track from the request, applies the superficial
//! checks (size, XML sniff) and stages it on disk for the converter.

use bytes::Bytes;
use thiserror::Error;

pub mod form;
pub mod sniff;
pub mod staging;

pub use form::read_form_file;
pub use staging::StagingDir;

/// Upload errors
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Request is not multipart/form-data: {0}")]
    NotMultipart(String),

    #[error("Failed to parse multipart data: {0}")]
    Multipart(#[from] multer::Error),

    #[error("Missing form file field \"{0}\".")]
    MissingFile(String),

    #[error("The uploaded file must not be greater than {}.", format_size(.limit))]
    TooLarge { limit: u64 },

    #[error("The uploaded file is empty.")]
    Empty,

    #[error("A text/xml file type is required.")]
    NotXml { detected: &'static str },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl UploadError {
    /// Whether the client is at fault (maps to 400)
    pub fn is_client_error(&self) -> bool {
        !matches!(self, UploadError::IoError(_))
    }

    /// Short label used for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            UploadError::NotMultipart(_) | UploadError::Multipart(_) => "malformed_form",
            UploadError::MissingFile(_) => "missing_file",
            UploadError::TooLarge { .. } => "too_large",
            UploadError::Empty => "empty",
            UploadError::NotXml { .. } => "not_xml",
            UploadError::IoError(_) => "io",
        }
    }
}

/// Render a byte limit the way users expect to read it ("1MB", "1500 bytes")
fn format_size(bytes: &u64) -> String {
    const MB: u64 = 1024 * 1024;
    if *bytes >= MB && *bytes % MB == 0 {
        format!("{}MB", bytes / MB)
    } else {
        format!("{} bytes", bytes)
    }
}

/// File received from the client
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Filename as sent by the client, unsanitized
    pub filename: Option<String>,
    pub data: Bytes,
}

impl UploadedFile {
    /// Check the upload is an XML document and return its bytes from the first `<`.
    ///
    /// Only the first [`sniff::SNIFF_LEN`] bytes are inspected.
    pub fn xml_payload(&self) -> Result<Bytes, UploadError> {
        if self.data.is_empty() {
            return Err(UploadError::Empty);
        }

        let detected = sniff::detect_content_type(&self.data);
        if !sniff::is_xml(detected) {
            return Err(UploadError::NotXml { detected });
        }

        let offset = sniff::markup_offset(&self.data);
        Ok(self.data.slice(offset..))
    }
}
