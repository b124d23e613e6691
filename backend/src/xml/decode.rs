//! Byte → text decoding for XML documents.
//!
//! A byte-order mark wins over the declaration; otherwise the `encoding`
//! pseudo-attribute of `<?xml ...?>` picks the decoder, and UTF-8 is the
//! default. Labels are resolved with `encoding_rs`, so `ISO-8859-1` and
//! `latin1` both decode as windows-1252.

use encoding_rs::{Encoding, UTF_8};
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use std::borrow::Cow;

use crate::error::{XmlError, XmlResult};

static DECLARED_ENCODING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*<\?xml[^>]*?\sencoding\s*=\s*["']([A-Za-z0-9._:\-]+)["']"#).unwrap()
});

/// Encoding label from the XML declaration, if any.
pub fn declared_encoding(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(256)];
    DECLARED_ENCODING_RE
        .captures(head)
        .map(|c| String::from_utf8_lossy(&c[1]).to_string())
}

/// Decode a whole document to text. The BOM is not part of the result.
pub fn decode_document(bytes: &[u8]) -> XmlResult<Cow<'_, str>> {
    let (encoding, body) = match Encoding::for_bom(bytes) {
        Some((encoding, bom_len)) => (encoding, &bytes[bom_len..]),
        None => match declared_encoding(bytes) {
            Some(label) => {
                let encoding = Encoding::for_label(label.as_bytes()).ok_or_else(|| {
                    XmlError::EncodingError(format!("unknown encoding '{}'", label))
                })?;
                (encoding, bytes)
            }
            None => (UTF_8, bytes),
        },
    };

    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .ok_or_else(|| {
            XmlError::EncodingError(format!("input is not valid {}", encoding.name()))
        })
}
