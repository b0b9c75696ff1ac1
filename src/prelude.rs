//! Convenience re-exports for common use.

pub use crate::auth::{AuthenticationUi, AuthorizationPrompt, Authenticator, UiOutcome};
pub use crate::config::{Limit, ProtocolConfig, ServiceConfig, SocialConfig};
pub use crate::error::{Result, SocialError};
pub use crate::request::{Request, Response};
pub use crate::service::Service;
pub use crate::store::CredentialStore;
pub use crate::types::{Account, AccountKind, Completion, Item};
