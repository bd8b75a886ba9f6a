//! Content-type sniffing
//!
//! Classifies the leading bytes of an upload following the WHATWG MIME
//! sniffing algorithm (the same table HTTP servers use when no Content-Type
//! is known). Only the first [`SNIFF_LEN`] bytes are ever inspected.

/// Number of leading bytes considered when sniffing
pub const SNIFF_LEN: usize = 512;

/// Content type reported for XML documents
pub const TEXT_XML: &str = "text/xml; charset=utf-8";

const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";
const OCTET_STREAM: &str = "application/octet-stream";

enum Signature {
    /// Case-insensitive HTML tag, must be followed by a space or `>`
    Html(&'static [u8]),
    /// `data & mask == pattern`, optionally after skipping whitespace
    Masked {
        pattern: &'static [u8],
        mask: &'static [u8],
        skip_ws: bool,
        content_type: &'static str,
    },
    /// Plain prefix match
    Exact(&'static [u8], &'static str),
}

const SIGNATURES: &[Signature] = &[
    Signature::Html(b"<!DOCTYPE HTML"),
    Signature::Html(b"<HTML"),
    Signature::Html(b"<HEAD"),
    Signature::Html(b"<SCRIPT"),
    Signature::Html(b"<IFRAME"),
    Signature::Html(b"<H1"),
    Signature::Html(b"<DIV"),
    Signature::Html(b"<FONT"),
    Signature::Html(b"<TABLE"),
    Signature::Html(b"<A"),
    Signature::Html(b"<STYLE"),
    Signature::Html(b"<TITLE"),
    Signature::Html(b"<B"),
    Signature::Html(b"<BODY"),
    Signature::Html(b"<BR"),
    Signature::Html(b"<P"),
    Signature::Html(b"<!--"),
    Signature::Masked {
        pattern: b"<?xml",
        mask: b"\xFF\xFF\xFF\xFF\xFF",
        skip_ws: true,
        content_type: TEXT_XML,
    },
    Signature::Exact(b"%PDF-", "application/pdf"),
    Signature::Exact(b"%!PS-Adobe-", "application/postscript"),
    // UTF BOMs
    Signature::Masked {
        pattern: b"\xFE\xFF\x00\x00",
        mask: b"\xFF\xFF\x00\x00",
        skip_ws: false,
        content_type: "text/plain; charset=utf-16be",
    },
    Signature::Masked {
        pattern: b"\xFF\xFE\x00\x00",
        mask: b"\xFF\xFF\x00\x00",
        skip_ws: false,
        content_type: "text/plain; charset=utf-16le",
    },
    Signature::Exact(b"\xEF\xBB\xBF", TEXT_PLAIN_UTF8),
    // Images
    Signature::Exact(b"\x00\x00\x01\x00", "image/x-icon"),
    Signature::Exact(b"\x00\x00\x02\x00", "image/x-icon"),
    Signature::Exact(b"BM", "image/bmp"),
    Signature::Exact(b"GIF87a", "image/gif"),
    Signature::Exact(b"GIF89a", "image/gif"),
    Signature::Masked {
        pattern: b"RIFF\x00\x00\x00\x00WEBPVP",
        mask: b"\xFF\xFF\xFF\xFF\x00\x00\x00\x00\xFF\xFF\xFF\xFF\xFF\xFF",
        skip_ws: false,
        content_type: "image/webp",
    },
    Signature::Exact(b"\x89PNG\x0D\x0A\x1A\x0A", "image/png"),
    Signature::Exact(b"\xFF\xD8\xFF", "image/jpeg"),
    // Archives and containers
    Signature::Exact(b"OggS\x00", "application/ogg"),
    Signature::Exact(b"\x1F\x8B\x08", "application/x-gzip"),
    Signature::Exact(b"PK\x03\x04", "application/zip"),
    Signature::Exact(b"Rar!\x1A\x07\x00", "application/x-rar-compressed"),
    Signature::Exact(b"Rar!\x1A\x07\x01\x00", "application/x-rar-compressed"),
    Signature::Exact(b"\x00\x61\x73\x6D", "application/wasm"),
];

/// Determine the content type of `data`.
///
/// Always returns a valid MIME type; unrecognised binary input is
/// `application/octet-stream`.
pub fn detect_content_type(data: &[u8]) -> &'static str {
    let data = sniff_window(data);
    let first_non_ws = data.iter().position(|b| !is_ws(*b)).unwrap_or(data.len());

    for sig in SIGNATURES {
        if let Some(content_type) = sig.matches(data, first_non_ws) {
            return content_type;
        }
    }

    if data.iter().any(|b| is_binary_byte(*b)) {
        OCTET_STREAM
    } else {
        TEXT_PLAIN_UTF8
    }
}

/// Index of the first `<` within the sniff window, or 0 when there is none.
pub fn markup_offset(data: &[u8]) -> usize {
    sniff_window(data)
        .iter()
        .position(|b| *b == b'<')
        .unwrap_or(0)
}

/// Whether a sniffed content type denotes an XML document
pub fn is_xml(content_type: &str) -> bool {
    content_type.contains("text/xml")
}

impl Signature {
    fn matches(&self, data: &[u8], first_non_ws: usize) -> Option<&'static str> {
        match self {
            Signature::Html(pattern) => {
                let data = &data[first_non_ws..];
                if data.len() < pattern.len() + 1 {
                    return None;
                }
                for (p, d) in pattern.iter().zip(data) {
                    let d = if p.is_ascii_uppercase() { d & 0xDF } else { *d };
                    if *p != d {
                        return None;
                    }
                }
                match data[pattern.len()] {
                    b' ' | b'>' => Some("text/html; charset=utf-8"),
                    _ => None,
                }
            }
            Signature::Masked {
                pattern,
                mask,
                skip_ws,
                content_type,
            } => {
                let data = if *skip_ws { &data[first_non_ws..] } else { data };
                if data.len() < pattern.len() {
                    return None;
                }
                let hit = pattern
                    .iter()
                    .zip(mask.iter())
                    .zip(data)
                    .all(|((p, m), d)| d & m == *p);
                hit.then_some(*content_type)
            }
            Signature::Exact(pattern, content_type) => {
                data.starts_with(pattern).then_some(*content_type)
            }
        }
    }
}

fn sniff_window(data: &[u8]) -> &[u8] {
    &data[..data.len().min(SNIFF_LEN)]
}

fn is_ws(b: u8) -> bool {
    matches!(b, b'\t' | b'\n' | b'\x0C' | b'\r' | b' ')
}

fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}
