//! multipart/form-data encoding.
//!
//! Parts are written in declaration order as
//!
//! ```text
//! --<boundary>\r\n
//! Content-Disposition: form-data; name="<name>"[; filename="<filename>"]\r\n
//! Content-Type: <mime>\r\n
//! \r\n
//! <bytes>\r\n
//! ```
//!
//! followed by `--<boundary>--\r\n`. Backslashes and double quotes in names
//! and filenames are escaped; metadata that cannot be carried in a header
//! line is rejected instead of producing malformed output.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{HttpClientError, Result};
use crate::utils::mime::{OCTET_STREAM, guess_mime};

/// Content type of `Part::text`.
pub const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";

/// One form field.
#[derive(Debug, Clone)]
pub struct Part {
    name: String,
    filename: Option<String>,
    content: Bytes,
    mime_type: String,
}

impl Part {
    pub fn new(name: impl Into<String>, content: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filename: None,
            content: content.into(),
            mime_type: mime_type.into(),
        }
    }

    /// A plain text field.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, Bytes::from(value.into()), TEXT_PLAIN_UTF8)
    }

    /// Opaque bytes.
    pub fn bytes(name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self::new(name, content, OCTET_STREAM)
    }

    /// A file upload; the MIME type is guessed from the filename.
    pub fn file(name: impl Into<String>, filename: impl Into<String>, content: impl Into<Bytes>) -> Self {
        let filename = filename.into();
        let mime_type = guess_mime(Some(&filename));
        Self::new(name, content, mime_type).with_filename(filename)
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

/// An ordered set of parts with a boundary fixed at construction.
#[derive(Debug, Clone)]
pub struct MultipartPayload {
    boundary: String,
    parts: Vec<Part>,
}

impl Default for MultipartPayload {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartPayload {
    /// Empty payload with a fresh UUID boundary.
    pub fn new() -> Self {
        Self {
            boundary: uuid::Uuid::new_v4().to_string(),
            parts: Vec::new(),
        }
    }

    pub fn part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    pub fn push(&mut self, part: Part) {
        self.parts.push(part);
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// `multipart/form-data; boundary=<boundary>`
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Serialize all parts.
    pub fn encode(&self) -> Result<Bytes> {
        let mut out = BytesMut::new();
        for part in &self.parts {
            let name = escape_quoted(validate_param("name", &part.name)?);
            let mime_type = validate_mime(&part.mime_type)?;

            out.put_slice(format!("--{}\r\n", self.boundary).as_bytes());
            out.put_slice(format!("Content-Disposition: form-data; name=\"{name}\"").as_bytes());
            if let Some(filename) = &part.filename {
                let filename = escape_quoted(validate_param("filename", filename)?);
                out.put_slice(format!("; filename=\"{filename}\"").as_bytes());
            }
            out.put_slice(format!("\r\nContent-Type: {mime_type}\r\n\r\n").as_bytes());
            out.put_slice(&part.content);
            out.put_slice(b"\r\n");
        }
        out.put_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        Ok(out.freeze())
    }
}

/// `\` → `\\`, `"` → `\"`.
fn escape_quoted(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            c => escaped.push(c),
        }
    }
    escaped
}

fn validate_param<'a>(label: &str, value: &'a str) -> Result<&'a str> {
    if value.chars().any(|c| matches!(c, '\r' | '\n' | '\0')) {
        return Err(HttpClientError::InvalidMultipartEncoding(format!(
            "{label} contains a line break or NUL: {value:?}"
        )));
    }
    Ok(value)
}

fn validate_mime(mime_type: &str) -> Result<&str> {
    if mime_type.is_empty() || !mime_type.bytes().all(|b| (0x20..0x7f).contains(&b)) {
        return Err(HttpClientError::InvalidMultipartEncoding(format!(
            "content type is not printable ASCII: {mime_type:?}"
        )));
    }
    Ok(mime_type)
}
