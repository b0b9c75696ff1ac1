//! Share payloads.

use bon::Builder;
use bytes::Bytes;
use url::Url;

/// An image to attach to a shared item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub data: Bytes,
    pub mime_type: String,
    pub filename: String,
}

impl ImageAttachment {
    pub fn new(data: impl Into<Bytes>, mime_type: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
            filename: filename.into(),
        }
    }
}

/// An arbitrary file to attach to a shared item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    pub data: Bytes,
    pub mime_type: String,
    pub filename: String,
}

impl FileAttachment {
    pub fn new(data: impl Into<Bytes>, mime_type: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
            filename: filename.into(),
        }
    }
}

/// Content a user wants to post to a service.
///
/// Nothing is validated at construction; a [`crate::service::Service`] checks
/// its limits when the item is shared.
///
/// # Example
/// ```
/// use socialkit::types::Item;
///
/// let item = Item::builder()
///     .text("Hello from socialkit".to_string())
///     .links(vec!["https://example.com".parse().unwrap()])
///     .build();
/// assert_eq!(item.links.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Builder)]
pub struct Item {
    #[builder(default)]
    pub text: String,
    #[builder(default)]
    pub links: Vec<Url>,
    #[builder(default)]
    pub images: Vec<ImageAttachment>,
    #[builder(default)]
    pub files: Vec<FileAttachment>,
}

impl Item {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Number of characters in `text`, which is what text limits count.
    pub fn text_length(&self) -> usize {
        self.text.chars().count()
    }
}
