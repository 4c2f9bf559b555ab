use std::fmt;

/// Error taxonomy for the sync pipeline.
///
/// "No match found" is deliberately not an error: resolution returning
/// nothing routes to the non-nominative / generic-fallback path and is
/// modeled as `Option`/outcome at the call sites.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncError {
    /// Network / timeout / decode failure talking to a vendor API,
    /// after the bounded retry policy was exhausted.
    Transport(String),
    /// Deployment misconfiguration (unmapped branch, missing credential).
    /// Fatal for the request, never silently defaulted.
    Config(String),
    /// The Billing Service rejected the document (vendor error detail).
    Emission(String),
    /// The idempotence ledger store failed.
    Ledger(String),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Emission(msg) => write!(f, "emission rejected: {msg}"),
            Self::Ledger(msg) => write!(f, "ledger error: {msg}"),
        }
    }
}

impl std::error::Error for SyncError {}
