//! Fixture Wallet Provider
//!
//! An in-process provider with a fixed account. Used by the CLI (declared in
//! the config file) and for offline runs where no extension is present.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{
    AccountInfo, NetworkType, ProviderError, ProviderInfo, RestorableProvider, StoredConnection,
    WalletConnection, WalletProvider,
};

/// Declaration of a fixture provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureSpec {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    pub account_id: String,
    pub network: NetworkType,
    #[serde(default = "default_balance")]
    pub balance: String,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_balance() -> String {
    "0 ℏ".to_string()
}

fn default_available() -> bool {
    true
}

/// Provider answering from a fixed account
pub struct FixtureProvider {
    info: ProviderInfo,
    account_id: String,
    network: NetworkType,
    balance: String,
    available: bool,
    connected: Arc<RwLock<bool>>,
}

impl FixtureProvider {
    pub fn new(id: &str, account_id: &str, network: NetworkType) -> Self {
        Self {
            info: ProviderInfo::new(id, id, ""),
            account_id: account_id.to_string(),
            network,
            balance: default_balance(),
            available: true,
            connected: Arc::new(RwLock::new(false)),
        }
    }

    pub fn from_spec(spec: &FixtureSpec) -> Self {
        let name = spec.name.as_deref().unwrap_or(&spec.id);
        let icon = spec.icon.as_deref().unwrap_or("");
        Self {
            info: ProviderInfo::new(&spec.id, name, icon),
            account_id: spec.account_id.clone(),
            network: spec.network,
            balance: spec.balance.clone(),
            available: spec.available,
            connected: Arc::new(RwLock::new(false)),
        }
    }

    pub fn with_balance(mut self, balance: &str) -> Self {
        self.balance = balance.to_string();
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    async fn ensure_connected(&self) -> Result<(), ProviderError> {
        if *self.connected.read().await {
            Ok(())
        } else {
            Err(ProviderError::NotConnected)
        }
    }
}

#[async_trait]
impl WalletProvider for FixtureProvider {
    fn info(&self) -> &ProviderInfo {
        &self.info
    }

    async fn is_available(&self) -> Result<bool, ProviderError> {
        Ok(self.available)
    }

    async fn connect(&self) -> Result<WalletConnection, ProviderError> {
        if !self.available {
            return Err(ProviderError::Unavailable(self.info.id.clone()));
        }
        *self.connected.write().await = true;
        Ok(WalletConnection::new(&self.account_id, self.network))
    }

    async fn disconnect(&self) -> Result<(), ProviderError> {
        *self.connected.write().await = false;
        Ok(())
    }

    async fn get_account_info(&self) -> Result<AccountInfo, ProviderError> {
        self.ensure_connected().await?;
        Ok(AccountInfo {
            account_id: self.account_id.clone(),
            balance: self.balance.clone(),
            network: self.network,
        })
    }

    async fn get_balance(&self) -> Result<String, ProviderError> {
        self.ensure_connected().await?;
        Ok(self.balance.clone())
    }

    fn as_restorable(&self) -> Option<&dyn RestorableProvider> {
        Some(self)
    }
}

#[async_trait]
impl RestorableProvider for FixtureProvider {
    async fn restore_connection(
        &self,
        stored: &StoredConnection,
    ) -> Result<Option<WalletConnection>, ProviderError> {
        // A fixture only ever holds its own account
        if !self.available || stored.account_id != self.account_id {
            return Ok(None);
        }
        *self.connected.write().await = true;
        Ok(Some(WalletConnection::new(&self.account_id, self.network)))
    }

    async fn sync_connection_state(&self) -> Result<Option<WalletConnection>, ProviderError> {
        if *self.connected.read().await {
            Ok(Some(WalletConnection::new(&self.account_id, self.network)))
        } else {
            Ok(None)
        }
    }
}
