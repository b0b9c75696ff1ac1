//! Core value types: accounts, share items and completion states.

pub mod account;
pub mod item;

pub use account::{
    Account, AccountKind, ACCESS_TOKEN, EXPIRES_AT, EXPIRES_IN, OAUTH_TOKEN, OAUTH_TOKEN_SECRET,
    REFRESH_TOKEN, USERNAME,
};
pub use item::{FileAttachment, ImageAttachment, Item};

/// Terminal state of a cancellable operation that did not fail.
///
/// Cancellation is reported here rather than through the error channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion<T> {
    Completed(T),
    Cancelled,
}

impl<T> Completion<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// The completed value, or `None` when cancelled.
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Cancelled => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Completion<U> {
        match self {
            Self::Completed(value) => Completion::Completed(f(value)),
            Self::Cancelled => Completion::Cancelled,
        }
    }
}
