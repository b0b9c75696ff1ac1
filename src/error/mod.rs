//! Error types for socialkit.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

use crate::types::AccountKind;

/// Primary error type for all socialkit operations.
#[derive(Error, Debug)]
pub enum SocialError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication cancelled by the user")]
    AuthenticationCancelled,

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Unsupported account type: {account} accounts cannot be used with {pipeline} requests")]
    UnsupportedAccountType {
        account: AccountKind,
        pipeline: &'static str,
    },

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Credential storage error: {0}")]
    Storage(String),

    #[error("Item exceeds {limit} limit: {actual} > {max}")]
    LimitExceeded {
        limit: &'static str,
        max: u32,
        actual: usize,
    },
}

impl SocialError {
    /// Create an API error from a status code and raw body.
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            status,
            body: body.into(),
        }
    }

    /// Create a transport error without an underlying cause.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// HTTP status carried by an [`SocialError::Api`] error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this error is a user-initiated abort rather than a failure.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::AuthenticationCancelled)
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::AuthenticationCancelled => ErrorCategory::Cancelled,
            Self::AuthenticationFailed(_) => ErrorCategory::Authentication,
            Self::UnsupportedAccountType { .. } | Self::NotSupported(_) => {
                ErrorCategory::Unsupported
            }
            Self::Transport { .. } => ErrorCategory::Transport,
            Self::Api { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                429 => ErrorCategory::RateLimit,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Api,
            },
            Self::Storage(_) => ErrorCategory::Storage,
            Self::LimitExceeded { .. } => ErrorCategory::Validation,
        }
    }

    /// Suggest what the caller could do next. Nothing is retried automatically.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.category() {
            ErrorCategory::Configuration => RecoverySuggestion::CheckConfiguration,
            ErrorCategory::Cancelled => RecoverySuggestion::None,
            ErrorCategory::Authentication => RecoverySuggestion::Reauthenticate,
            ErrorCategory::Unsupported => RecoverySuggestion::UseAnotherService,
            ErrorCategory::Transport
            | ErrorCategory::RateLimit
            | ErrorCategory::Server => RecoverySuggestion::RetryLater,
            ErrorCategory::Validation => RecoverySuggestion::ReduceContent,
            ErrorCategory::Storage => RecoverySuggestion::CheckStorage,
            ErrorCategory::Api => RecoverySuggestion::InspectResponse,
        }
    }
}

impl From<reqwest::Error> for SocialError {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport {
            message: error.to_string(),
            source: Some(Box::new(error)),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, SocialError>;
