//! Headless sharing through a plain HTTP endpoint.

use std::collections::BTreeMap;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;
use url::Url;

use super::Service;
use crate::auth::parse_config_url;
use crate::error::SocialError;
use crate::request::Response;
use crate::types::{Account, Completion, Item};

fn default_text_field() -> String {
    "message".to_string()
}

/// Where and how an [`Item`] is posted.
///
/// Links go to `link_field` when set and are appended to the text
/// otherwise. Images and files need their field to be configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareEndpoint {
    pub url: String,
    #[serde(default = "default_text_field")]
    pub text_field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_field: Option<String>,
}

impl ShareEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            text_field: default_text_field(),
            link_field: None,
            image_field: None,
            file_field: None,
        }
    }

    pub(crate) fn validate(&self) -> Result<Url, SocialError> {
        parse_config_url("share.url", &self.url)
    }

    fn form(&self, item: &Item) -> BTreeMap<String, String> {
        let links = item
            .links
            .iter()
            .map(Url::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        let mut form = BTreeMap::new();
        let text = match &self.link_field {
            Some(field) => {
                if !links.is_empty() {
                    form.insert(field.clone(), links);
                }
                item.text.clone()
            }
            None if links.is_empty() => item.text.clone(),
            None if item.text.is_empty() => links,
            None => format!("{} {links}", item.text),
        };
        form.insert(self.text_field.clone(), text);
        form
    }
}

impl Service {
    /// Post `item` for `account` without any composer UI.
    ///
    /// The item is checked against this service's limits first. Attachments
    /// make the request multipart.
    pub async fn share_item(
        &self,
        item: &Item,
        account: Account,
        cancel: &CancellationToken,
    ) -> Result<Completion<Response>, SocialError> {
        let (Some(endpoint), Some(url)) = (&self.config.share, &self.share_url) else {
            return Err(SocialError::NotSupported(format!(
                "{} cannot share without its own composer",
                self.title()
            )));
        };
        self.config.limits.check(item)?;

        let image_field = attachment_field(&endpoint.image_field, !item.images.is_empty(), "images")?;
        let file_field = attachment_field(&endpoint.file_field, !item.files.is_empty(), "files")?;

        let mut request =
            self.create_request(Method::POST, url.clone(), endpoint.form(item), Some(account))?;
        for image in &item.images {
            request.add_multipart_bytes(
                image_field,
                image.data.clone(),
                image.mime_type.clone(),
                Some(image.filename.clone()),
            );
        }
        for file in &item.files {
            request.add_multipart_bytes(
                file_field,
                file.data.clone(),
                file.mime_type.clone(),
                Some(file.filename.clone()),
            );
        }

        info!(
            service = %self.service_id(),
            images = item.images.len(),
            files = item.files.len(),
            "Sharing item"
        );
        request.execute(cancel).await
    }
}

fn attachment_field<'a>(
    field: &'a Option<String>,
    needed: bool,
    what: &str,
) -> Result<&'a str, SocialError> {
    match field {
        Some(field) => Ok(field),
        None if needed => Err(SocialError::NotSupported(format!(
            "this service cannot share {what}"
        ))),
        None => Ok(""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_are_appended_without_link_field() {
        let endpoint = ShareEndpoint::new("https://api.example/post");
        let item = Item::builder()
            .text("hello".to_string())
            .links(vec!["https://example.com/a".parse().unwrap()])
            .build();
        let form = endpoint.form(&item);
        assert_eq!(form["message"], "hello https://example.com/a");
    }

    #[test]
    fn links_use_dedicated_field_when_configured() {
        let endpoint = ShareEndpoint {
            link_field: Some("link".into()),
            ..ShareEndpoint::new("https://api.example/post")
        };
        let item = Item::builder()
            .text("hello".to_string())
            .links(vec!["https://example.com/a".parse().unwrap()])
            .build();
        let form = endpoint.form(&item);
        assert_eq!(form["message"], "hello");
        assert_eq!(form["link"], "https://example.com/a");
    }

    #[test]
    fn missing_attachment_field_is_unsupported() {
        assert!(attachment_field(&None, true, "images").is_err());
        assert_eq!(attachment_field(&None, false, "images").unwrap(), "");
    }
}
