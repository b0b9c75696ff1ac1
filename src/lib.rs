//! socialkit: uniform authentication and authenticated requests for social
//! services.
//!
//! A [`service::Service`] pairs an authenticator (OAuth 1.0a, OAuth 2.0 or a
//! platform-managed account store) with a credential store, and builds
//! [`request::Request`]s that sign themselves with the right protocol when
//! they execute.
//!
//! # Quick Start
//!
//! ```no_run
//! use socialkit::prelude::*;
//! use socialkit::service::presets;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(ui: &dyn AuthenticationUi) -> socialkit::error::Result<()> {
//! let service = Service::new(presets::facebook("my-app-id"))?;
//! let account = service
//!     .list_accounts(Some(ui))
//!     .await?
//!     .into_iter()
//!     .next()
//!     .ok_or_else(|| SocialError::AuthenticationFailed("no account".into()))?;
//!
//! let item = Item::new("Hello from socialkit");
//! let outcome = service
//!     .share_item(&item, account, &CancellationToken::new())
//!     .await?;
//! if let Completion::Completed(response) = outcome {
//!     println!("{}", response.status_code());
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod prelude;
pub mod request;
pub mod service;
pub mod store;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
