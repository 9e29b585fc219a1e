//! Wallet Provider Adapters
//!
//! This module provides a unified interface for wallet providers.
//! All adapters implement the `WalletProvider` trait, providing a consistent API for:
//! - Availability probing (is the wallet installed / reachable)
//! - Connection lifecycle (connect, disconnect)
//! - Account queries (account info, balance)
//!
//! Optional capabilities are exposed through accessors returning `None` by
//! default, so the session service never has to guess what an adapter supports.

pub mod error;
pub mod extension;
pub mod fixture;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

// Re-export commonly used items
pub use error::{ProviderError, WalletError, WalletErrorKind};
pub use extension::{ExtensionBridge, ExtensionProvider, PairedSession};
pub use fixture::FixtureProvider;
pub use types::*;

use async_trait::async_trait;
use tokio::sync::broadcast;

/// Base trait for all wallet provider adapters
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Identity of the provider (id, name, icon)
    fn info(&self) -> &ProviderInfo;

    /// Provider id, used as the registry key
    fn id(&self) -> &str {
        &self.info().id
    }

    /// Whether the wallet is installed and reachable
    async fn is_available(&self) -> Result<bool, ProviderError>;

    /// Open a session with the wallet
    async fn connect(&self) -> Result<WalletConnection, ProviderError>;

    /// Close the session with the wallet
    async fn disconnect(&self) -> Result<(), ProviderError>;

    /// Get details of the connected account
    async fn get_account_info(&self) -> Result<AccountInfo, ProviderError>;

    /// Get the balance of the connected account
    async fn get_balance(&self) -> Result<String, ProviderError>;

    /// Restore / sync capability, if the adapter has one
    fn as_restorable(&self) -> Option<&dyn RestorableProvider> {
        None
    }

    /// Event-emitter capability: a receiver of adapter-originated events
    fn events(&self) -> Option<broadcast::Receiver<ProviderEvent>> {
        None
    }
}

/// Adapters that can rehydrate a session without prompting the user
#[async_trait]
pub trait RestorableProvider: Send + Sync {
    /// Re-establish a previously persisted session.
    /// Returns `None` when the wallet no longer holds that session.
    async fn restore_connection(
        &self,
        stored: &StoredConnection,
    ) -> Result<Option<WalletConnection>, ProviderError>;

    /// Read the wallet's current session state, `None` if it has no session
    async fn sync_connection_state(&self) -> Result<Option<WalletConnection>, ProviderError>;
}

/// Events originated by an adapter (account switch inside the extension etc.)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    AccountChanged { account_id: String },
    NetworkChanged { network: NetworkType },
    Disconnected,
}
