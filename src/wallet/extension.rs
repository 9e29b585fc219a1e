//! Browser-Extension Wallet Adapter
//!
//! Wraps a wallet extension's raw pairing API (`ExtensionBridge`) into a
//! `WalletProvider`. The adapter caches the paired session, supports session
//! restoration, and can run a periodic health check that notices when the
//! extension drops the session on its own.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{
    AccountInfo, NetworkType, ProviderError, ProviderEvent, ProviderInfo, RestorableProvider,
    StoredConnection, WalletConnection, WalletProvider,
};

/// Session as reported by the extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairedSession {
    pub account_id: String,
    pub network: NetworkType,
}

impl PairedSession {
    fn connection(&self) -> WalletConnection {
        WalletConnection::new(&self.account_id, self.network)
    }
}

/// Raw API exposed by a wallet extension
#[async_trait]
pub trait ExtensionBridge: Send + Sync + 'static {
    /// Whether the extension is installed
    async fn is_installed(&self) -> bool;

    /// Ask the user to pair an account on the given network
    async fn pair(&self, network: NetworkType) -> Result<PairedSession, ProviderError>;

    /// Drop the pairing
    async fn unpair(&self) -> Result<(), ProviderError>;

    /// Session the extension currently holds, if any
    async fn paired_session(&self) -> Result<Option<PairedSession>, ProviderError>;

    /// Balance of an account, formatted by the wallet
    async fn account_balance(&self, account_id: &str) -> Result<String, ProviderError>;
}

/// Wallet provider backed by a browser extension
pub struct ExtensionProvider<B: ExtensionBridge> {
    info: ProviderInfo,
    bridge: Arc<B>,
    /// Network requested when pairing
    network: NetworkType,
    session: Arc<RwLock<Option<PairedSession>>>,
    events: broadcast::Sender<ProviderEvent>,
    health_check_interval: Option<Duration>,
    health_check: Mutex<Option<JoinHandle<()>>>,
}

#[cfg(feature = "hashpack")]
impl<B: ExtensionBridge> ExtensionProvider<B> {
    /// HashPack extension adapter
    pub fn hashpack(bridge: B, network: NetworkType) -> Self {
        Self::new(ProviderInfo::new("hashpack", "HashPack", "hashpack.svg"), bridge, network)
    }
}

#[cfg(feature = "blade")]
impl<B: ExtensionBridge> ExtensionProvider<B> {
    /// Blade extension adapter
    pub fn blade(bridge: B, network: NetworkType) -> Self {
        Self::new(ProviderInfo::new("blade", "Blade", "blade.svg"), bridge, network)
    }
}

impl<B: ExtensionBridge> ExtensionProvider<B> {
    pub fn new(info: ProviderInfo, bridge: B, network: NetworkType) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            info,
            bridge: Arc::new(bridge),
            network,
            session: Arc::new(RwLock::new(None)),
            events,
            health_check_interval: None,
            health_check: Mutex::new(None),
        }
    }

    /// Poll the extension at `interval` while connected
    pub fn with_health_check(mut self, interval: Duration) -> Self {
        self.health_check_interval = Some(interval);
        self
    }

    /// Whether the health check task is running
    pub fn health_check_running(&self) -> bool {
        self.health_check
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    async fn current_session(&self) -> Result<PairedSession, ProviderError> {
        self.session
            .read()
            .await
            .clone()
            .ok_or(ProviderError::NotConnected)
    }

    fn start_health_check(&self) {
        let Some(interval) = self.health_check_interval else {
            return;
        };
        self.stop_health_check();

        let bridge = self.bridge.clone();
        let session = self.session.clone();
        let events = self.events.clone();
        let provider_id = self.info.id.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let live = match bridge.paired_session().await {
                    Ok(live) => live,
                    Err(e) => {
                        debug!("{} health check failed: {}", provider_id, e);
                        continue;
                    }
                };

                let mut cached = session.write().await;
                match (cached.as_ref(), live) {
                    (None, _) => break,
                    (Some(_), None) => {
                        warn!("{} dropped the wallet session", provider_id);
                        *cached = None;
                        let _ = events.send(ProviderEvent::Disconnected);
                        break;
                    }
                    (Some(prev), Some(live)) => {
                        if prev.account_id != live.account_id {
                            let _ = events.send(ProviderEvent::AccountChanged {
                                account_id: live.account_id.clone(),
                            });
                        }
                        if prev.network != live.network {
                            let _ = events.send(ProviderEvent::NetworkChanged {
                                network: live.network,
                            });
                        }
                        *cached = Some(live);
                    }
                }
            }
        });

        *self.health_check.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    fn stop_health_check(&self) {
        if let Some(handle) = self
            .health_check
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            handle.abort();
        }
    }
}

impl<B: ExtensionBridge> Drop for ExtensionProvider<B> {
    fn drop(&mut self) {
        self.stop_health_check();
    }
}

#[async_trait]
impl<B: ExtensionBridge> WalletProvider for ExtensionProvider<B> {
    fn info(&self) -> &ProviderInfo {
        &self.info
    }

    async fn is_available(&self) -> Result<bool, ProviderError> {
        Ok(self.bridge.is_installed().await)
    }

    async fn connect(&self) -> Result<WalletConnection, ProviderError> {
        if !self.bridge.is_installed().await {
            return Err(ProviderError::Unavailable(format!(
                "{} extension is not installed",
                self.info.name
            )));
        }

        let paired = self.bridge.pair(self.network).await?;
        info!("{} paired account {} on {}", self.info.id, paired.account_id, paired.network);

        let connection = paired.connection();
        *self.session.write().await = Some(paired);
        self.start_health_check();
        Ok(connection)
    }

    async fn disconnect(&self) -> Result<(), ProviderError> {
        self.stop_health_check();
        self.session.write().await.take();
        self.bridge.unpair().await
    }

    async fn get_account_info(&self) -> Result<AccountInfo, ProviderError> {
        let session = self.current_session().await?;
        let balance = self.bridge.account_balance(&session.account_id).await?;
        Ok(AccountInfo {
            account_id: session.account_id,
            balance,
            network: session.network,
        })
    }

    async fn get_balance(&self) -> Result<String, ProviderError> {
        let session = self.current_session().await?;
        self.bridge.account_balance(&session.account_id).await
    }

    fn as_restorable(&self) -> Option<&dyn RestorableProvider> {
        Some(self)
    }

    fn events(&self) -> Option<broadcast::Receiver<ProviderEvent>> {
        Some(self.events.subscribe())
    }
}

#[async_trait]
impl<B: ExtensionBridge> RestorableProvider for ExtensionProvider<B> {
    async fn restore_connection(
        &self,
        stored: &StoredConnection,
    ) -> Result<Option<WalletConnection>, ProviderError> {
        let Some(paired) = self.bridge.paired_session().await? else {
            debug!("{} holds no session for {}", self.info.id, stored.account_id);
            return Ok(None);
        };

        let connection = paired.connection();
        *self.session.write().await = Some(paired);
        self.start_health_check();
        Ok(Some(connection))
    }

    async fn sync_connection_state(&self) -> Result<Option<WalletConnection>, ProviderError> {
        let live = self.bridge.paired_session().await?;
        let connection = live.as_ref().map(PairedSession::connection);
        let mut cached = self.session.write().await;
        if live.is_none() {
            self.stop_health_check();
        }
        *cached = live;
        Ok(connection)
    }
}
