//! wallet-session - Wallet provider registry and session manager
//!
//! Tracks which wallet provider is connected, persists the session so it can
//! be restored on the next run, validates the wallet's network and publishes
//! typed lifecycle events.

pub mod config;
pub mod monitor;
pub mod network;
pub mod service;
pub mod storage;
pub mod wallet;

pub use config::{ConfigError, SessionConfig};
pub use monitor::{MonitorRecord, RecordSource, StateMonitor};
pub use network::{NetworkSwitchRequest, NetworkValidation, NetworkValidator};
pub use service::{
    EventKind, EventStream, ListenerId, ServiceSettings, SessionSnapshot, WalletEvent,
    WalletService,
};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StoreError, WalletStorage};
pub use wallet::{
    AccountInfo, NetworkType, ProviderError, ProviderEvent, ProviderInfo, RestorableProvider,
    WalletConnection, WalletError, WalletErrorKind, WalletProvider,
};
