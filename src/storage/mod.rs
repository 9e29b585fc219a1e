//! Wallet Session Persistence
//!
//! Validated, expiring persistence of preferences, the connection snapshot and
//! the account info snapshot. Every load deserializes into the typed shape; a
//! malformed or expired entry is removed and reported as absent. Store
//! failures are logged and never reach the caller.

pub mod store;

pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::wallet::{
    now_ms, AccountInfo, StoredAccountInfo, StoredConnection, WalletConnection, WalletPreferences,
};

pub const PREFERENCES_KEY: &str = "wallet-preferences";
pub const CONNECTION_KEY: &str = "wallet-connection";
pub const ACCOUNT_INFO_KEY: &str = "wallet-account-info";
const PROBE_KEY: &str = "wallet-storage-probe";

/// Connection snapshots are trusted for 24 hours
pub const CONNECTION_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// Account info snapshots are trusted for 5 minutes
pub const ACCOUNT_INFO_TTL: Duration = Duration::from_secs(5 * 60);

/// Expiring wallet session storage over a key-value store
#[derive(Clone)]
pub struct WalletStorage {
    store: Arc<dyn KeyValueStore>,
    connection_ttl: Duration,
    account_info_ttl: Duration,
}

impl WalletStorage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            connection_ttl: CONNECTION_TTL,
            account_info_ttl: ACCOUNT_INFO_TTL,
        }
    }

    pub fn with_ttls(mut self, connection_ttl: Duration, account_info_ttl: Duration) -> Self {
        self.connection_ttl = connection_ttl;
        self.account_info_ttl = account_info_ttl;
        self
    }

    /// Whether the backing store accepts writes
    pub fn is_available(&self) -> bool {
        let probe = self
            .store
            .set(PROBE_KEY, "1")
            .and_then(|_| self.store.remove(PROBE_KEY));
        match probe {
            Ok(()) => true,
            Err(e) => {
                warn!("Wallet storage unavailable: {}", e);
                false
            }
        }
    }

    // =========================================================================
    // Preferences
    // =========================================================================

    pub fn save_preferences(&self, preferences: &WalletPreferences) -> bool {
        self.write(PREFERENCES_KEY, preferences)
    }

    /// Stored preferences, or defaults when absent or malformed
    pub fn load_preferences(&self) -> WalletPreferences {
        self.read::<WalletPreferences>(PREFERENCES_KEY)
            .unwrap_or_default()
    }

    pub fn clear_preferences(&self) {
        self.remove(PREFERENCES_KEY);
    }

    // =========================================================================
    // Connection
    // =========================================================================

    pub fn save_connection(&self, connection: &WalletConnection, provider_id: &str) -> bool {
        let stored = StoredConnection::from_connection(connection, provider_id, now_ms());
        self.write(CONNECTION_KEY, &stored)
    }

    /// Stored connection unless absent, malformed or older than the connection TTL
    pub fn load_connection(&self) -> Option<StoredConnection> {
        let stored = self.read::<StoredConnection>(CONNECTION_KEY)?;
        if self.is_expired(stored.timestamp, self.connection_ttl) {
            debug!("Stored wallet connection expired");
            self.remove(CONNECTION_KEY);
            return None;
        }
        Some(stored)
    }

    pub fn clear_connection(&self) {
        self.remove(CONNECTION_KEY);
    }

    // =========================================================================
    // Account info
    // =========================================================================

    pub fn save_account_info(&self, account: &AccountInfo) -> bool {
        let stored = StoredAccountInfo {
            account_id: account.account_id.clone(),
            balance: account.balance.clone(),
            network: account.network,
            timestamp: now_ms(),
        };
        self.write(ACCOUNT_INFO_KEY, &stored)
    }

    /// Stored account info unless absent, malformed or older than the account info TTL
    pub fn load_account_info(&self) -> Option<AccountInfo> {
        let stored = self.read::<StoredAccountInfo>(ACCOUNT_INFO_KEY)?;
        if self.is_expired(stored.timestamp, self.account_info_ttl) {
            debug!("Stored account info expired");
            self.remove(ACCOUNT_INFO_KEY);
            return None;
        }
        Some(stored.account_info())
    }

    pub fn clear_account_info(&self) {
        self.remove(ACCOUNT_INFO_KEY);
    }

    /// Remove connection and account info, keeping preferences
    pub fn clear_session(&self) {
        self.clear_connection();
        self.clear_account_info();
    }

    pub fn clear_all(&self) {
        self.clear_session();
        self.clear_preferences();
    }

    fn is_expired(&self, timestamp: i64, ttl: Duration) -> bool {
        let age = now_ms().saturating_sub(timestamp);
        age > i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("Failed to read {}: {}", key, e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Discarding malformed {} entry: {}", key, e);
                self.remove(key);
                None
            }
        }
    }

    fn write<T: Serialize>(&self, key: &str, value: &T) -> bool {
        let result = serde_json::to_string(value)
            .map_err(StoreError::from)
            .and_then(|json| self.store.set(key, &json));
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to write {}: {}", key, e);
                false
            }
        }
    }

    fn remove(&self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            warn!("Failed to remove {}: {}", key, e);
        }
    }
}
