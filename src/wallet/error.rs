//! Wallet Error Types
//!
//! Unified error handling for wallet providers and the session service.
//! Adapters report `ProviderError`; everything leaving the service is a
//! structured `WalletError`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error categories surfaced to consumers of the session service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalletErrorKind {
    /// Provider is not registered or not available in this environment
    ProviderNotFound,
    /// Wallet is connected to a network other than the expected one
    WrongNetwork,
    /// Wallet extension is locked
    WalletLocked,
    /// User rejected the connection request
    ConnectionRejected,
    /// Transport or connectivity failure
    NetworkError,
    /// Unknown or unexpected error
    UnknownError,
}

impl WalletErrorKind {
    /// Stable code used in serialized errors and logs
    pub fn code(&self) -> &'static str {
        match self {
            WalletErrorKind::ProviderNotFound => "PROVIDER_NOT_FOUND",
            WalletErrorKind::WrongNetwork => "WRONG_NETWORK",
            WalletErrorKind::WalletLocked => "WALLET_LOCKED",
            WalletErrorKind::ConnectionRejected => "CONNECTION_REJECTED",
            WalletErrorKind::NetworkError => "NETWORK_ERROR",
            WalletErrorKind::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for WalletErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Structured error returned by every fallible service operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("[{kind}] {message}")]
pub struct WalletError {
    #[serde(rename = "type")]
    pub kind: WalletErrorKind,
    pub message: String,
}

impl WalletError {
    pub fn new(kind: WalletErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn provider_not_found(provider_id: &str) -> Self {
        Self::new(
            WalletErrorKind::ProviderNotFound,
            format!("Wallet provider '{}' is not registered", provider_id),
        )
    }

    pub fn provider_unavailable(provider_id: &str) -> Self {
        Self::new(
            WalletErrorKind::ProviderNotFound,
            format!("Wallet provider '{}' is not available", provider_id),
        )
    }

    pub fn not_connected() -> Self {
        Self::new(WalletErrorKind::NetworkError, "No wallet is connected")
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(WalletErrorKind::UnknownError, message)
    }

    /// Whether a connection attempt failing with this error may be retried
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self.kind,
            WalletErrorKind::ConnectionRejected | WalletErrorKind::ProviderNotFound
        )
    }
}

/// Errors reported by wallet provider adapters
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("Connection rejected: {0}")]
    Rejected(String),

    #[error("Wallet is locked")]
    Locked,

    #[error("Wallet unavailable: {0}")]
    Unavailable(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Wallet is not connected")]
    NotConnected,

    #[error("{0}")]
    Other(String),
}

impl From<ProviderError> for WalletError {
    fn from(err: ProviderError) -> Self {
        let kind = match &err {
            ProviderError::Rejected(_) => WalletErrorKind::ConnectionRejected,
            ProviderError::Locked => WalletErrorKind::WalletLocked,
            ProviderError::Unavailable(_) => WalletErrorKind::ProviderNotFound,
            ProviderError::Network(_) | ProviderError::NotConnected => {
                WalletErrorKind::NetworkError
            }
            ProviderError::Other(_) => WalletErrorKind::UnknownError,
        };
        WalletError::new(kind, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_mapping() {
        let err: WalletError = ProviderError::Rejected("user closed popup".to_string()).into();
        assert_eq!(err.kind, WalletErrorKind::ConnectionRejected);
        assert!(err.message.contains("user closed popup"));

        let err: WalletError = ProviderError::Locked.into();
        assert_eq!(err.kind, WalletErrorKind::WalletLocked);

        let err: WalletError = ProviderError::NotConnected.into();
        assert_eq!(err.kind, WalletErrorKind::NetworkError);

        let err: WalletError = ProviderError::Other("boom".to_string()).into();
        assert_eq!(err.kind, WalletErrorKind::UnknownError);
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(!WalletError::provider_not_found("x").is_retryable());
        assert!(!WalletError::new(WalletErrorKind::ConnectionRejected, "no").is_retryable());
        assert!(WalletError::new(WalletErrorKind::NetworkError, "timeout").is_retryable());
        assert!(WalletError::new(WalletErrorKind::WalletLocked, "locked").is_retryable());
    }

    #[test]
    fn test_serialized_shape() {
        let err = WalletError::new(WalletErrorKind::WrongNetwork, "expected testnet");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "WRONG_NETWORK");
        assert_eq!(json["message"], "expected testnet");
        assert_eq!(err.to_string(), "[WRONG_NETWORK] expected testnet");
    }
}
