//! Error classification and recovery hints.

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    /// User-initiated abort; not a failure.
    Cancelled,
    Authentication,
    Unsupported,
    Transport,
    RateLimit,
    Server,
    Api,
    Storage,
    Validation,
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    None,
    CheckConfiguration,
    Reauthenticate,
    UseAnotherService,
    RetryLater,
    ReduceContent,
    CheckStorage,
    InspectResponse,
}
