//! Advertised content limits.

use std::fmt;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::error::SocialError;
use crate::types::Item;

/// A positive maximum or an explicit "no limit".
///
/// Serialized as an optional positive integer: absent means unbounded and
/// `0` is rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Option<u32>", into = "Option<u32>")]
pub enum Limit {
    #[default]
    Unbounded,
    AtMost(NonZeroU32),
}

const ZERO_LIMIT: &str = "limits must be positive; omit the field for no limit";

impl Limit {
    /// Positive maximum from a literal.
    ///
    /// # Panics
    /// On `0`, which config files reject too. Use [`Limit::try_from`] for
    /// values that are not known to be positive.
    pub const fn at_most(max: u32) -> Self {
        match NonZeroU32::new(max) {
            Some(max) => Self::AtMost(max),
            None => panic!("limits must be positive; use Limit::Unbounded for no limit"),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, Self::Unbounded)
    }

    pub fn max(&self) -> Option<u32> {
        match self {
            Self::Unbounded => None,
            Self::AtMost(max) => Some(max.get()),
        }
    }

    pub fn allows(&self, count: usize) -> bool {
        match self {
            Self::Unbounded => true,
            Self::AtMost(max) => u32::try_from(count).is_ok_and(|count| count <= max.get()),
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unbounded => f.write_str("unbounded"),
            Self::AtMost(max) => write!(f, "{max}"),
        }
    }
}

impl TryFrom<u32> for Limit {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        NonZeroU32::new(value)
            .map(Self::AtMost)
            .ok_or_else(|| ZERO_LIMIT.to_string())
    }
}

impl TryFrom<Option<u32>> for Limit {
    type Error = String;

    fn try_from(value: Option<u32>) -> Result<Self, Self::Error> {
        value.map_or(Ok(Self::Unbounded), Self::try_from)
    }
}

impl From<Limit> for Option<u32> {
    fn from(limit: Limit) -> Self {
        limit.max()
    }
}

/// Per-service maxima a share composer can validate against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceLimits {
    #[serde(default, skip_serializing_if = "Limit::is_unbounded")]
    pub max_text_length: Limit,
    #[serde(default, skip_serializing_if = "Limit::is_unbounded")]
    pub max_links: Limit,
    #[serde(default, skip_serializing_if = "Limit::is_unbounded")]
    pub max_images: Limit,
    #[serde(default, skip_serializing_if = "Limit::is_unbounded")]
    pub max_files: Limit,
}

impl ServiceLimits {
    pub const UNBOUNDED: Self = Self {
        max_text_length: Limit::Unbounded,
        max_links: Limit::Unbounded,
        max_images: Limit::Unbounded,
        max_files: Limit::Unbounded,
    };

    /// Reject an item exceeding any limit.
    pub fn check(&self, item: &Item) -> Result<(), SocialError> {
        let checks = [
            ("text length", self.max_text_length, item.text_length()),
            ("links", self.max_links, item.links.len()),
            ("images", self.max_images, item.images.len()),
            ("files", self.max_files, item.files.len()),
        ];
        for (limit, max, actual) in checks {
            if let (false, Some(cap)) = (max.allows(actual), max.max()) {
                return Err(SocialError::LimitExceeded {
                    limit,
                    max: cap,
                    actual,
                });
            }
        }
        Ok(())
    }
}
