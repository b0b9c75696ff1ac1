//! Token endpoint bodies come back either as a JSON object or as
//! `application/x-www-form-urlencoded` pairs depending on the provider.

use std::collections::BTreeMap;

use crate::error::SocialError;

/// Flatten a token endpoint body into string properties.
///
/// JSON scalars are stringified; nested objects and arrays are kept as their
/// JSON text. `null` values are dropped.
pub fn parse(body: &str) -> Result<BTreeMap<String, String>, SocialError> {
    let trimmed = body.trim();
    if trimmed.starts_with('{') {
        let value: serde_json::Value = serde_json::from_str(trimmed).map_err(|e| {
            SocialError::AuthenticationFailed(format!("malformed token response: {e}"))
        })?;
        let serde_json::Value::Object(map) = value else {
            return Err(SocialError::AuthenticationFailed(
                "token response is not an object".to_string(),
            ));
        };
        Ok(map
            .into_iter()
            .filter_map(|(key, value)| {
                let text = match value {
                    serde_json::Value::Null => return None,
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                Some((key, text))
            })
            .collect())
    } else {
        Ok(url::form_urlencoded::parse(trimmed.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect())
    }
}

/// Fail with the provider's own description when the body reports `error`.
pub fn ensure_no_error(properties: &BTreeMap<String, String>) -> Result<(), SocialError> {
    match properties.get("error") {
        Some(error) => {
            let description = properties
                .get("error_description")
                .filter(|d| !d.is_empty())
                .unwrap_or(error);
            Err(SocialError::AuthenticationFailed(description.clone()))
        }
        None => Ok(()),
    }
}
