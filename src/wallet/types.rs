//! Common types for wallet providers
//!
//! These types describe a wallet session independently of the adapter that
//! produced it, and are the shapes persisted by `WalletStorage`.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Ledger environment a wallet is connected to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    Mainnet,
    Testnet,
    Previewnet,
}

impl NetworkType {
    pub const ALL: [NetworkType; 3] = [
        NetworkType::Mainnet,
        NetworkType::Testnet,
        NetworkType::Previewnet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkType::Mainnet => "mainnet",
            NetworkType::Testnet => "testnet",
            NetworkType::Previewnet => "previewnet",
        }
    }

    /// Human readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            NetworkType::Mainnet => "Mainnet",
            NetworkType::Testnet => "Testnet",
            NetworkType::Previewnet => "Previewnet",
        }
    }
}

impl std::fmt::Display for NetworkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mainnet" => Ok(NetworkType::Mainnet),
            "testnet" => Ok(NetworkType::Testnet),
            "previewnet" => Ok(NetworkType::Previewnet),
            _ => Err(format!("Unknown network: {}", s)),
        }
    }
}

/// Identity of a wallet provider adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub id: String,
    pub name: String,
    pub icon: String,
}

impl ProviderInfo {
    pub fn new(id: &str, name: &str, icon: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            icon: icon.to_string(),
        }
    }
}

/// Live session handle returned by a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletConnection {
    pub account_id: String,
    pub network: NetworkType,
    pub is_connected: bool,
}

impl WalletConnection {
    pub fn new(account_id: &str, network: NetworkType) -> Self {
        Self {
            account_id: account_id.to_string(),
            network,
            is_connected: true,
        }
    }
}

/// Account details for the connected wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub account_id: String,
    /// Balance as reported by the wallet (e.g. "100 ℏ")
    pub balance: String,
    pub network: NetworkType,
}

/// Preferences driving automatic reconnection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletPreferences {
    pub last_used_provider: Option<String>,
    pub auto_connect: bool,
    /// Unix ms of the last successful connection
    pub connection_timestamp: i64,
}

/// Persisted mirror of a connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredConnection {
    pub account_id: String,
    pub network: NetworkType,
    pub is_connected: bool,
    pub provider_id: String,
    /// Unix ms when the entry was written
    pub timestamp: i64,
}

impl StoredConnection {
    pub fn from_connection(connection: &WalletConnection, provider_id: &str, timestamp: i64) -> Self {
        Self {
            account_id: connection.account_id.clone(),
            network: connection.network,
            is_connected: connection.is_connected,
            provider_id: provider_id.to_string(),
            timestamp,
        }
    }

    pub fn connection(&self) -> WalletConnection {
        WalletConnection {
            account_id: self.account_id.clone(),
            network: self.network,
            is_connected: self.is_connected,
        }
    }
}

/// Persisted account info snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredAccountInfo {
    pub account_id: String,
    pub balance: String,
    pub network: NetworkType,
    pub timestamp: i64,
}

impl StoredAccountInfo {
    pub fn account_info(&self) -> AccountInfo {
        AccountInfo {
            account_id: self.account_id.clone(),
            balance: self.balance.clone(),
            network: self.network,
        }
    }
}

/// Current unix time in milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
