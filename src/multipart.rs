//! `multipart/form-data` bodies (RFC 7578).

use std::borrow::Cow;

use bytes::{BufMut as _, Bytes, BytesMut};
use rand::RngExt as _;

const HEX: [u8; 16] = *b"0123456789abcdef";

/// Generates a random boundary: 24 dashes followed by 48 hex digits.
#[must_use]
fn generate_boundary() -> String {
    let mut bytes = [0u8; 24];
    rand::rng().fill(&mut bytes[..]);

    let mut s = String::with_capacity(72);
    s.push_str("------------------------");
    for &b in &bytes {
        s.push(char::from(HEX[(b >> 4) as usize]));
        s.push(char::from(HEX[(b & 0x0F) as usize]));
    }
    s
}

/// A single part of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    name: Cow<'static, str>,
    filename: Option<Cow<'static, str>>,
    content_type: Option<Cow<'static, str>>,
    data: Bytes,
}

impl Part {
    /// The field name of this part.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The file name of this part, for file uploads.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// The raw contents of this part.
    #[must_use]
    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

/// A `multipart/form-data` body with its own boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Multipart {
    boundary: String,
    parts: Vec<Part>,
}

impl Default for Multipart {
    fn default() -> Self {
        Self::new()
    }
}

impl Multipart {
    /// Creates an empty form with a freshly generated boundary.
    #[must_use]
    pub fn new() -> Self {
        Self::with_boundary(generate_boundary())
    }

    /// Creates an empty form using the given boundary.
    #[must_use]
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            parts: Vec::new(),
        }
    }

    /// The boundary separating parts.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// The value of the `Content-Type` header for this form.
    #[must_use]
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// The parts of this form, in order.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Returns `true` if a part with this field name exists.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.parts.iter().any(|p| p.name == name)
    }

    /// Adds a text field.
    #[must_use]
    pub fn text(
        mut self,
        name: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
    ) -> Self {
        let value: Cow<'static, str> = value.into();
        self.parts.push(Part {
            name: name.into(),
            filename: None,
            content_type: None,
            data: match value {
                Cow::Borrowed(s) => Bytes::from_static(s.as_bytes()),
                Cow::Owned(s) => Bytes::from(s),
            },
        });
        self
    }

    /// Adds a file field.
    #[must_use]
    pub fn file(
        mut self,
        name: impl Into<Cow<'static, str>>,
        filename: impl Into<Cow<'static, str>>,
        content_type: impl Into<Cow<'static, str>>,
        data: impl Into<Bytes>,
    ) -> Self {
        self.parts.push(Part {
            name: name.into(),
            filename: Some(filename.into()),
            content_type: Some(content_type.into()),
            data: data.into(),
        });
        self
    }

    /// Appends every part of `defaults` whose field name is not already used.
    pub fn fill_missing(&mut self, defaults: &Multipart) {
        let missing = defaults
            .parts
            .iter()
            .filter(|p| !self.has(&p.name))
            .cloned()
            .collect::<Vec<_>>();
        self.parts.extend(missing);
    }

    /// Encodes the form into a request body.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        for part in &self.parts {
            buf.put_slice(b"--");
            buf.put_slice(self.boundary.as_bytes());
            buf.put_slice(b"\r\nContent-Disposition: form-data; name=\"");
            buf.put_slice(escape_quoted(&part.name).as_bytes());
            buf.put_u8(b'"');
            if let Some(filename) = &part.filename {
                buf.put_slice(b"; filename=\"");
                buf.put_slice(escape_quoted(filename).as_bytes());
                buf.put_u8(b'"');
            }
            buf.put_slice(b"\r\n");
            if let Some(content_type) = &part.content_type {
                buf.put_slice(b"Content-Type: ");
                buf.put_slice(content_type.as_bytes());
                buf.put_slice(b"\r\n");
            }
            buf.put_slice(b"\r\n");
            buf.put_slice(&part.data);
            buf.put_slice(b"\r\n");
        }
        buf.put_slice(b"--");
        buf.put_slice(self.boundary.as_bytes());
        buf.put_slice(b"--\r\n");
        buf.freeze()
    }
}

// RFC 7578 §4.2: percent-encode the characters that would break the quoted string.
fn escape_quoted(value: &str) -> Cow<'_, str> {
    if !value.contains(['"', '\r', '\n']) {
        return Cow::Borrowed(value);
    }
    Cow::Owned(
        value
            .replace('"', "%22")
            .replace('\r', "%0D")
            .replace('\n', "%0A"),
    )
}
