//! Wallet Session Service
//!
//! Single source of truth for which provider is active and the state of its
//! connection. Mediates every provider operation with availability caching,
//! retries, persistence and event notification.
//!
//! The service is cheap to clone; clones share state. Pass it explicitly to
//! whatever needs it.

pub mod events;


pub use events::{EventBus, EventKind, EventStream, ListenerId, WalletEvent};

use futures_util::future::join_all;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex as StdMutex, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::network::NetworkValidator;
use crate::storage::WalletStorage;
use crate::wallet::{
    now_ms, AccountInfo, ProviderEvent, ProviderInfo, StoredConnection, WalletConnection,
    WalletError, WalletPreferences, WalletProvider,
};

/// Tunables for the session service
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// How long an availability probe result is reused
    pub availability_ttl: Duration,
    /// Upper bound on a single availability probe
    pub availability_timeout: Duration,
    /// Backoff unit: attempt `n` waits `2^n` units
    pub retry_unit: Duration,
    /// Broadcast buffer for event subscribers
    pub event_capacity: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            availability_ttl: Duration::from_secs(5),
            availability_timeout: Duration::from_secs(3),
            retry_unit: Duration::from_secs(1),
            event_capacity: 64,
        }
    }
}

/// Point-in-time view of the session
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub provider: Option<ProviderInfo>,
    pub connection: Option<WalletConnection>,
    pub account: Option<AccountInfo>,
}

#[derive(Debug, Clone, Default)]
struct SessionState {
    current: Option<String>,
    connection: Option<WalletConnection>,
    account: Option<AccountInfo>,
}

#[derive(Debug, Clone, Copy)]
struct CachedAvailability {
    available: bool,
    checked_at: Instant,
}

struct Inner {
    providers: RwLock<HashMap<String, Arc<dyn WalletProvider>>>,
    state: RwLock<SessionState>,
    availability: Mutex<HashMap<String, CachedAvailability>>,
    /// Serializes connect / disconnect / restore
    lifecycle: Mutex<()>,
    storage: WalletStorage,
    validator: NetworkValidator,
    events: EventBus,
    settings: ServiceSettings,
    /// Task forwarding the current provider's events
    watcher: StdMutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = self.watcher.lock().unwrap_or_else(|e| e.into_inner()).take() {
            handle.abort();
        }
    }
}

/// Wallet provider registry and session manager
#[derive(Clone)]
pub struct WalletService {
    inner: Arc<Inner>,
}

impl WalletService {
    /// Empty registry over `storage`, checking networks with `validator`
    pub fn new(storage: WalletStorage, validator: NetworkValidator, settings: ServiceSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                providers: RwLock::new(HashMap::new()),
                state: RwLock::new(SessionState::default()),
                availability: Mutex::new(HashMap::new()),
                lifecycle: Mutex::new(()),
                storage,
                validator,
                events: EventBus::new(settings.event_capacity),
                settings,
                watcher: StdMutex::new(None),
            }),
        }
    }

    /// Persistence backing this service
    pub fn storage(&self) -> &WalletStorage {
        &self.inner.storage
    }

    /// Validator connections are checked against
    pub fn validator(&self) -> &NetworkValidator {
        &self.inner.validator
    }

    // =========================================================================
    // Registry
    // =========================================================================

    /// Add a provider, replacing any registered under the same id
    pub async fn register_provider(&self, provider: Arc<dyn WalletProvider>) {
        let id = provider.id().to_string();
        info!("Registering wallet provider {}", id);
        if self.inner.providers.write().await.insert(id.clone(), provider).is_some() {
            warn!("Replaced already registered wallet provider {}", id);
        }
        self.inner.availability.lock().await.remove(&id);
    }

    /// Remove a provider, disconnecting it first if it is the current one.
    /// Returns whether the provider was registered.
    pub async fn unregister_provider(&self, provider_id: &str) -> bool {
        let _guard = self.inner.lifecycle.lock().await;
        if self.current_provider_id().await.as_deref() == Some(provider_id) {
            if let Err(e) = self.disconnect_locked().await {
                warn!("Error disconnecting {} during unregister: {}", provider_id, e);
            }
        }

        let removed = self.inner.providers.write().await.remove(provider_id).is_some();
        self.inner.availability.lock().await.remove(provider_id);
        if removed {
            info!("Unregistered wallet provider {}", provider_id);
        }
        removed
    }

    /// Registered provider by id
    pub async fn provider(&self, provider_id: &str) -> Option<Arc<dyn WalletProvider>> {
        self.inner.providers.read().await.get(provider_id).cloned()
    }

    /// Every registered provider, ordered by id
    pub async fn providers(&self) -> Vec<ProviderInfo> {
        let mut infos: Vec<ProviderInfo> = self
            .inner
            .providers
            .read()
            .await
            .values()
            .map(|p| p.info().clone())
            .collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    // =========================================================================
    // Availability
    // =========================================================================

    /// Providers whose availability probe reports true
    pub async fn get_available_providers(&self) -> Vec<ProviderInfo> {
        let status = self.get_provider_availability_status().await;
        self.providers()
            .await
            .into_iter()
            .filter(|info| status.get(&info.id).copied().unwrap_or(false))
            .collect()
    }

    /// Availability of every provider; probes run concurrently and a failing
    /// probe only marks its own provider unavailable
    pub async fn get_provider_availability_status(&self) -> BTreeMap<String, bool> {
        let providers: Vec<Arc<dyn WalletProvider>> =
            self.inner.providers.read().await.values().cloned().collect();

        let probes = providers.iter().map(|provider| async move {
            let available = self.probe_availability(provider, false).await;
            (provider.id().to_string(), available)
        });

        join_all(probes).await.into_iter().collect()
    }

    /// Forget cached probe results so the next listing probes again
    pub async fn invalidate_availability_cache(&self) {
        self.inner.availability.lock().await.clear();
    }

    async fn probe_availability(&self, provider: &Arc<dyn WalletProvider>, fresh: bool) -> bool {
        let id = provider.id().to_string();
        if !fresh {
            if let Some(cached) = self.inner.availability.lock().await.get(&id) {
                if cached.checked_at.elapsed() < self.inner.settings.availability_ttl {
                    return cached.available;
                }
            }
        }

        let available = match tokio::time::timeout(
            self.inner.settings.availability_timeout,
            provider.is_available(),
        )
        .await
        {
            Ok(Ok(available)) => available,
            Ok(Err(e)) => {
                warn!("Availability check for {} failed: {}", id, e);
                false
            }
            Err(_) => {
                warn!("Availability check for {} timed out", id);
                false
            }
        };

        self.inner.availability.lock().await.insert(
            id,
            CachedAvailability {
                available,
                checked_at: Instant::now(),
            },
        );
        available
    }

    // =========================================================================
    // Connection lifecycle
    // =========================================================================

    /// Connect to `provider_id`, replacing any other current provider
    pub async fn connect(&self, provider_id: &str) -> Result<WalletConnection, WalletError> {
        let _guard = self.inner.lifecycle.lock().await;
        self.emit(WalletEvent::ConnectionStarting {
            provider_id: provider_id.to_string(),
        });

        match self.connect_locked(provider_id).await {
            Ok(connection) => Ok(connection),
            Err(error) => {
                warn!("Connecting to {} failed: {}", provider_id, error);
                self.emit(WalletEvent::ConnectionFailed {
                    provider_id: provider_id.to_string(),
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    async fn connect_locked(&self, provider_id: &str) -> Result<WalletConnection, WalletError> {
        let provider = self
            .provider(provider_id)
            .await
            .ok_or_else(|| WalletError::provider_not_found(provider_id))?;

        if !self.probe_availability(&provider, true).await {
            return Err(WalletError::provider_unavailable(provider_id));
        }

        let (previous, live, account) = {
            let state = self.inner.state.read().await;
            (state.current.clone(), state.connection.clone(), state.account.clone())
        };

        if previous.as_deref() == Some(provider_id) {
            if let Some(connection) = live.filter(|c| c.is_connected) {
                debug!("Already connected to {}", provider_id);
                self.emit(WalletEvent::ConnectionCompleted {
                    provider_id: provider_id.to_string(),
                    connection: connection.clone(),
                    account,
                });
                return Ok(connection);
            }
        } else if let Some(previous_id) = previous.as_deref() {
            info!("Switching wallet provider from {} to {}", previous_id, provider_id);
            if let Err(e) = self.disconnect_locked().await {
                warn!("Error disconnecting {}: {}", previous_id, e);
            }
        }

        self.inner.state.write().await.current = Some(provider_id.to_string());

        let connection = match provider.connect().await {
            Ok(connection) => connection,
            Err(e) => {
                self.reset_state().await;
                return Err(e.into());
            }
        };

        if let Err(error) = self.inner.validator.require_expected(&connection) {
            self.reset_state().await;
            if let Err(e) = provider.disconnect().await {
                debug!("Rollback disconnect of {} failed: {}", provider_id, e);
            }
            if self.inner.validator.allows_auto_switch() {
                if let Some(request) = self.inner.validator.build_switch_request(connection.network) {
                    self.emit(WalletEvent::NetworkSwitchRequested {
                        provider_id: provider_id.to_string(),
                        request,
                    });
                }
            }
            return Err(error);
        }

        self.inner.storage.save_connection(&connection, provider_id);
        self.inner.storage.save_preferences(&WalletPreferences {
            last_used_provider: Some(provider_id.to_string()),
            auto_connect: true,
            connection_timestamp: now_ms(),
        });

        {
            let mut state = self.inner.state.write().await;
            state.connection = Some(connection.clone());
            state.account = None;
        }

        info!(
            "Connected to {} as {} on {}",
            provider_id, connection.account_id, connection.network
        );
        self.emit(WalletEvent::Connected {
            provider_id: provider_id.to_string(),
            connection: connection.clone(),
        });
        self.emit(WalletEvent::ProviderChanged {
            previous,
            current: Some(provider_id.to_string()),
        });

        // Account info is a nicety; a failure here must not fail the connect
        let account = match provider.get_account_info().await {
            Ok(account) => self.apply_account_info(provider_id, account).await,
            Err(e) => {
                warn!("Could not fetch account info from {}: {}", provider_id, e);
                None
            }
        };

        self.watch_provider(provider_id, provider.as_ref());

        self.emit(WalletEvent::ConnectionCompleted {
            provider_id: provider_id.to_string(),
            connection: connection.clone(),
            account,
        });
        Ok(connection)
    }

    /// Disconnect the current provider; a no-op when nothing is connected.
    /// Local and persisted state is cleared even if the provider errors.
    pub async fn disconnect(&self) -> Result<(), WalletError> {
        let _guard = self.inner.lifecycle.lock().await;
        self.disconnect_locked().await
    }

    async fn disconnect_locked(&self) -> Result<(), WalletError> {
        let Some(provider_id) = self.reset_state().await else {
            return Ok(());
        };
        self.stop_watcher();

        let result = match self.provider(&provider_id).await {
            Some(provider) => provider.disconnect().await.map_err(WalletError::from),
            None => Ok(()),
        };

        self.forget_session();
        info!("Disconnected from {}", provider_id);
        self.emit(WalletEvent::Disconnected { provider_id });
        result
    }

    /// Rehydrate the session persisted by a previous run.
    /// Returns false, clearing the persisted session where there is one, when
    /// restoration is not possible. A live session is left untouched and
    /// reported as restored.
    pub async fn restore_connection(&self) -> bool {
        let _guard = self.inner.lifecycle.lock().await;
        let storage = &self.inner.storage;

        if let Some(current) = self.current_provider_id().await {
            debug!("Session with {} already live, skipping restore", current);
            return true;
        }

        if !storage.is_available() {
            debug!("Storage unavailable, skipping session restore");
            return false;
        }

        if !storage.load_preferences().auto_connect {
            debug!("Auto connect disabled, skipping session restore");
            storage.clear_session();
            return false;
        }

        let Some(stored) = storage.load_connection() else {
            debug!("No stored wallet session");
            return false;
        };

        match self.rehydrate(&stored).await {
            Ok(true) => true,
            Ok(false) => {
                storage.clear_session();
                false
            }
            Err(e) => {
                warn!("Restoring {} session failed: {}", stored.provider_id, e);
                self.reset_state().await;
                self.stop_watcher();
                storage.clear_session();
                false
            }
        }
    }

    async fn rehydrate(&self, stored: &StoredConnection) -> Result<bool, WalletError> {
        let provider_id = stored.provider_id.as_str();
        let Some(provider) = self.provider(provider_id).await else {
            info!("Stored provider {} is no longer registered", provider_id);
            return Ok(false);
        };

        if !self.probe_availability(&provider, true).await {
            info!("Stored provider {} is not available", provider_id);
            return Ok(false);
        }

        let mut fresh_account = None;
        let connection = match provider.as_restorable() {
            Some(restorable) => match restorable.restore_connection(stored).await? {
                Some(connection) => connection,
                None => {
                    info!("{} no longer holds the stored session", provider_id);
                    return Ok(false);
                }
            },
            None => {
                let account = provider.get_account_info().await?;
                let connection = WalletConnection::new(&account.account_id, account.network);
                fresh_account = Some(account);
                connection
            }
        };

        {
            let mut state = self.inner.state.write().await;
            state.current = Some(provider_id.to_string());
            state.connection = Some(connection.clone());
            state.account = None;
        }
        self.inner.storage.save_connection(&connection, provider_id);

        // Stored and fresh data may disagree; that updates, it does not fail
        if stored.account_id != connection.account_id {
            info!(
                "{} account changed from {} to {}",
                provider_id, stored.account_id, connection.account_id
            );
            self.inner.storage.clear_account_info();
            self.emit(WalletEvent::AccountChanged {
                provider_id: provider_id.to_string(),
                previous: Some(stored.account_id.clone()),
                current: connection.account_id.clone(),
            });
        }
        if stored.network != connection.network {
            info!(
                "{} network changed from {} to {}",
                provider_id, stored.network, connection.network
            );
            self.emit(WalletEvent::NetworkChanged {
                provider_id: provider_id.to_string(),
                previous: Some(stored.network),
                current: connection.network,
            });
        }

        self.emit(WalletEvent::Connected {
            provider_id: provider_id.to_string(),
            connection: connection.clone(),
        });

        let account = match fresh_account {
            Some(account) => Ok(account),
            None => provider.get_account_info().await,
        };
        match account {
            Ok(account) => {
                self.apply_account_info(provider_id, account).await;
            }
            Err(e) => debug!("Account info unavailable after restore: {}", e),
        }

        self.watch_provider(provider_id, provider.as_ref());

        info!("Restored {} session for {}", provider_id, connection.account_id);
        self.emit(WalletEvent::ConnectionRestored {
            provider_id: provider_id.to_string(),
            connection,
        });
        Ok(true)
    }

    /// Connect with exponential backoff: after failed attempt `n` wait
    /// `2^n` retry units. Rejections and unknown providers are not retried.
    pub async fn connect_with_retry(
        &self,
        provider_id: &str,
        max_retries: u32,
    ) -> Result<WalletConnection, WalletError> {
        let max_attempts = max_retries.max(1);
        let mut attempt = 1;

        loop {
            match self.connect(provider_id).await {
                Ok(connection) => return Ok(connection),
                Err(error) if !error.is_retryable() || attempt >= max_attempts => {
                    return Err(error);
                }
                Err(error) => {
                    let delay = self.retry_delay(attempt);
                    warn!(
                        "Connect to {} failed ({}), retrying in {:?} (attempt {}/{})",
                        provider_id, error, delay, attempt, max_attempts
                    );
                    self.emit(WalletEvent::RetryScheduled {
                        provider_id: provider_id.to_string(),
                        attempt,
                        delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    });
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn retry_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.inner.settings.retry_unit.saturating_mul(factor)
    }

    // =========================================================================
    // Account
    // =========================================================================

    /// Fetch fresh account info from the current provider
    pub async fn refresh_account_info(&self) -> Result<AccountInfo, WalletError> {
        let (provider_id, provider) = self.current_provider_handle().await?;
        let account = provider.get_account_info().await?;
        self.apply_account_info(&provider_id, account.clone()).await;
        Ok(account)
    }

    /// Balance of the connected account, straight from the provider
    pub async fn get_balance(&self) -> Result<String, WalletError> {
        let (_, provider) = self.current_provider_handle().await?;
        Ok(provider.get_balance().await?)
    }

    /// Last known account info, falling back to the unexpired stored snapshot
    pub async fn account_info(&self) -> Option<AccountInfo> {
        let state = self.inner.state.read().await;
        state.current.as_ref()?;
        state
            .account
            .clone()
            .or_else(|| self.inner.storage.load_account_info())
    }

    /// Reconcile with the adapter's live session, for adapters that expose one
    pub async fn sync_connection_state(&self) -> Result<Option<WalletConnection>, WalletError> {
        let _guard = self.inner.lifecycle.lock().await;
        let (provider_id, provider) = self.current_provider_handle().await?;

        let Some(restorable) = provider.as_restorable() else {
            return Ok(self.current_connection().await);
        };

        match restorable.sync_connection_state().await? {
            Some(live) => {
                self.apply_live_connection(&provider_id, live.clone()).await;
                Ok(Some(live))
            }
            None => {
                info!("{} reports no session, disconnecting", provider_id);
                self.disconnect_locked().await?;
                Ok(None)
            }
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Identity of the current provider, if any
    pub async fn get_current_provider(&self) -> Option<ProviderInfo> {
        let id = self.current_provider_id().await?;
        self.provider(&id).await.map(|p| p.info().clone())
    }

    /// Id of the current provider, if any
    pub async fn current_provider_id(&self) -> Option<String> {
        self.inner.state.read().await.current.clone()
    }

    /// Live connection of the current provider
    pub async fn current_connection(&self) -> Option<WalletConnection> {
        self.inner.state.read().await.connection.clone()
    }

    /// Whether a provider reports a live connection
    pub async fn is_connected(&self) -> bool {
        self.inner
            .state
            .read()
            .await
            .connection
            .as_ref()
            .map(|c| c.is_connected)
            .unwrap_or(false)
    }

    /// Provider, connection and account in one view
    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.inner.state.read().await.clone();
        let provider = match state.current.as_deref() {
            Some(id) => self.provider(id).await.map(|p| p.info().clone()),
            None => None,
        };
        SessionSnapshot {
            provider,
            connection: state.connection,
            account: state.account,
        }
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Receiver for every event emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.inner.events.subscribe()
    }

    /// Events as a `Stream`
    pub fn event_stream(&self) -> EventStream {
        self.inner.events.stream()
    }

    /// Call `listener` for every event of `kind`
    pub fn on<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&WalletEvent) + Send + Sync + 'static,
    {
        self.inner.events.on(kind, listener)
    }

    /// Call `listener` for every event
    pub fn on_any<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&WalletEvent) + Send + Sync + 'static,
    {
        self.inner.events.on_any(listener)
    }

    /// Remove a listener; false if it was not registered
    pub fn off(&self, id: ListenerId) -> bool {
        self.inner.events.off(id)
    }

    fn emit(&self, event: WalletEvent) {
        self.inner.events.emit(event);
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn current_provider_handle(
        &self,
    ) -> Result<(String, Arc<dyn WalletProvider>), WalletError> {
        let id = self
            .current_provider_id()
            .await
            .ok_or_else(WalletError::not_connected)?;
        let provider = self
            .provider(&id)
            .await
            .ok_or_else(|| WalletError::provider_not_found(&id))?;
        Ok((id, provider))
    }

    /// Clear in-memory session state, returning the provider that was current
    async fn reset_state(&self) -> Option<String> {
        let mut state = self.inner.state.write().await;
        state.connection = None;
        state.account = None;
        state.current.take()
    }

    /// Drop persisted session data and stop auto connecting
    fn forget_session(&self) {
        let storage = &self.inner.storage;
        storage.clear_session();
        let mut preferences = storage.load_preferences();
        if preferences.auto_connect {
            preferences.auto_connect = false;
            storage.save_preferences(&preferences);
        }
    }

    /// Apply account info if `provider_id` is still current
    async fn apply_account_info(&self, provider_id: &str, account: AccountInfo) -> Option<AccountInfo> {
        let mut state = self.inner.state.write().await;
        if state.current.as_deref() != Some(provider_id) {
            debug!("Discarding account info from stale provider {}", provider_id);
            return None;
        }
        self.inner.storage.save_account_info(&account);
        state.account = Some(account.clone());
        Some(account)
    }

    /// Adopt a live connection reported by the adapter, emitting change events
    async fn apply_live_connection(&self, provider_id: &str, live: WalletConnection) {
        let previous = {
            let mut state = self.inner.state.write().await;
            if state.current.as_deref() != Some(provider_id) {
                return;
            }
            let previous = state.connection.replace(live.clone());
            let account_changed = previous
                .as_ref()
                .map_or(true, |p| p.account_id != live.account_id);
            if account_changed {
                state.account = None;
            }
            previous
        };

        self.inner.storage.save_connection(&live, provider_id);

        let previous_account = previous.as_ref().map(|p| p.account_id.clone());
        if previous_account.as_deref() != Some(live.account_id.as_str()) {
            self.inner.storage.clear_account_info();
            self.emit(WalletEvent::AccountChanged {
                provider_id: provider_id.to_string(),
                previous: previous_account,
                current: live.account_id.clone(),
            });
        }

        let previous_network = previous.as_ref().map(|p| p.network);
        if previous_network != Some(live.network) {
            self.emit(WalletEvent::NetworkChanged {
                provider_id: provider_id.to_string(),
                previous: previous_network,
                current: live.network,
            });
            let validation = self.inner.validator.validate(&live);
            if let Some(message) = validation.message {
                warn!("{}: {}", provider_id, message);
                if self.inner.validator.allows_auto_switch() {
                    if let Some(request) = self.inner.validator.build_switch_request(live.network) {
                        self.emit(WalletEvent::NetworkSwitchRequested {
                            provider_id: provider_id.to_string(),
                            request,
                        });
                    }
                }
            }
        }
    }

    /// The adapter dropped the session on its own
    async fn handle_provider_dropped(&self, provider_id: &str) {
        let _guard = self.inner.lifecycle.lock().await;
        if self.current_provider_id().await.as_deref() != Some(provider_id) {
            return;
        }
        // Called from the watcher task itself: detach instead of aborting
        self.inner
            .watcher
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        self.reset_state().await;
        self.forget_session();
        warn!("{} ended the wallet session", provider_id);
        self.emit(WalletEvent::Disconnected {
            provider_id: provider_id.to_string(),
        });
    }

    fn watch_provider(&self, provider_id: &str, provider: &dyn WalletProvider) {
        self.stop_watcher();
        let Some(mut receiver) = provider.events() else {
            return;
        };

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let provider_id = provider_id.to_string();

        let handle = tokio::spawn(async move {
            loop {
                let event = match receiver.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Missed {} events from {}", skipped, provider_id);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let service = WalletService { inner };

                debug!("{} event: {:?}", provider_id, event);
                match event {
                    ProviderEvent::AccountChanged { account_id } => {
                        if let Some(mut live) = service.current_connection().await {
                            live.account_id = account_id;
                            service.apply_live_connection(&provider_id, live).await;
                        }
                    }
                    ProviderEvent::NetworkChanged { network } => {
                        if let Some(mut live) = service.current_connection().await {
                            live.network = network;
                            service.apply_live_connection(&provider_id, live).await;
                        }
                    }
                    ProviderEvent::Disconnected => {
                        service.handle_provider_dropped(&provider_id).await;
                        break;
                    }
                }
            }
        });

        *self.inner.watcher.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    fn stop_watcher(&self) {
        if let Some(handle) = self
            .inner
            .watcher
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            handle.abort();
        }
    }
}
