//! Multipart/form-data framing.
//!
//! Parts are streamed in call order after the ordinary string parameters.

use std::collections::BTreeMap;
use std::fmt;
use std::pin::Pin;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use uuid::Uuid;

/// Byte stream carrying one part's payload.
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send + Sync>>;

/// Payload of a [`MultipartPart`].
pub enum PartData {
    Bytes(Bytes),
    Stream(ByteStream),
}

impl PartData {
    fn into_stream(self) -> ByteStream {
        match self {
            Self::Bytes(bytes) => Box::pin(stream::once(async move { Ok(bytes) })),
            Self::Stream(stream) => stream,
        }
    }
}

impl fmt::Debug for PartData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// One named segment of a multipart request body.
#[derive(Debug)]
pub struct MultipartPart {
    pub name: String,
    pub mime_type: String,
    pub filename: Option<String>,
    pub data: PartData,
}

impl MultipartPart {
    pub fn new(
        name: impl Into<String>,
        data: PartData,
        mime_type: impl Into<String>,
        filename: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            filename,
            data,
        }
    }

    fn header(&self, boundary: &str) -> Bytes {
        let mut header = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{}\"",
            escape_quoted(&self.name)
        );
        if let Some(filename) = &self.filename {
            header.push_str(&format!("; filename=\"{}\"", escape_quoted(filename)));
        }
        header.push_str(&format!(
            "\r\nContent-Type: {}\r\n\r\n",
            strip_line_breaks(&self.mime_type)
        ));
        Bytes::from(header)
    }
}

/// Fresh boundary for one request body.
pub fn boundary() -> String {
    format!("socialkit-{}", Uuid::new_v4().simple())
}

/// `Content-Type` header value for a body framed with `boundary`.
pub fn content_type(boundary: &str) -> String {
    format!("multipart/form-data; boundary={boundary}")
}

/// Frame string fields followed by `parts` as a streaming body.
pub fn body_stream(
    boundary: &str,
    fields: &BTreeMap<String, String>,
    parts: Vec<MultipartPart>,
) -> ByteStream {
    let mut segments: Vec<ByteStream> = Vec::with_capacity(fields.len() + parts.len() * 3 + 1);

    for (name, value) in fields {
        let field = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{value}\r\n",
            escape_quoted(name)
        );
        segments.push(chunk(Bytes::from(field)));
    }

    for part in parts {
        segments.push(chunk(part.header(boundary)));
        segments.push(part.data.into_stream());
        segments.push(chunk(Bytes::from_static(b"\r\n")));
    }

    segments.push(chunk(Bytes::from(format!("--{boundary}--\r\n"))));

    Box::pin(stream::iter(segments).flatten())
}

fn chunk(bytes: Bytes) -> ByteStream {
    Box::pin(stream::once(async move { Ok(bytes) }))
}

/// Header values may not break the line they sit on.
fn strip_line_breaks(value: &str) -> String {
    value.chars().filter(|c| !matches!(c, '\r' | '\n')).collect()
}

fn escape_quoted(value: &str) -> String {
    strip_line_breaks(value)
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
}
