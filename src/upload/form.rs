//! Multipart form-file extraction
//!
//! Streams a `multipart/form-data` body and pulls out the first field with
//! the requested name. Reading stops as soon as the field grows past the
//! size limit, so oversized uploads are never fully buffered.

use super::{UploadError, UploadedFile};
use bytes::{Bytes, BytesMut};
use futures::Stream;
use multer::{Constraints, Multipart, SizeLimit};

/// Headroom for boundaries, part headers and small extra fields
const FORM_OVERHEAD: u64 = 64 * 1024;

/// Read the form field `field_name` from a multipart body.
///
/// Fields with other names are skipped. Returns [`UploadError::MissingFile`]
/// if the body ends without the field.
pub async fn read_form_file<S, O, E>(
    content_type: Option<&str>,
    body: S,
    field_name: &str,
    max_size: u64,
) -> Result<UploadedFile, UploadError>
where
    S: Stream<Item = Result<O, E>> + Send + 'static,
    O: Into<Bytes> + 'static,
    E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
{
    let content_type = content_type
        .ok_or_else(|| UploadError::NotMultipart("missing Content-Type header".into()))?;
    let boundary = multer::parse_boundary(content_type)
        .map_err(|e| UploadError::NotMultipart(e.to_string()))?;

    let constraints = Constraints::new()
        .size_limit(SizeLimit::new().whole_stream(max_size.saturating_add(FORM_OVERHEAD)));
    let mut multipart = Multipart::with_constraints(body, boundary, constraints);

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| map_multer_error(e, max_size))?
    {
        if field.name() != Some(field_name) {
            tracing::debug!(field = ?field.name(), "Skipping form field");
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let mut data = BytesMut::new();

        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| map_multer_error(e, max_size))?
        {
            // Check size limit incrementally to fail fast
            if (data.len() + chunk.len()) as u64 > max_size {
                return Err(UploadError::TooLarge { limit: max_size });
            }
            data.extend_from_slice(&chunk);
        }

        return Ok(UploadedFile {
            filename,
            data: data.freeze(),
        });
    }

    Err(UploadError::MissingFile(field_name.to_string()))
}

fn map_multer_error(err: multer::Error, max_size: u64) -> UploadError {
    match err {
        multer::Error::StreamSizeExceeded { .. } | multer::Error::FieldSizeExceeded { .. } => {
            UploadError::TooLarge { limit: max_size }
        }
        other => UploadError::Multipart(other),
    }
}
