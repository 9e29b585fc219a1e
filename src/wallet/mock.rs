//! Scriptable provider for tests

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

use super::{
    AccountInfo, NetworkType, ProviderError, ProviderEvent, ProviderInfo, RestorableProvider,
    StoredConnection, WalletConnection, WalletProvider,
};

/// Shared, ordered record of provider calls ("hashpack.connect", ...)
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub struct MockProvider {
    info: ProviderInfo,
    account_id: Mutex<String>,
    network: Mutex<NetworkType>,
    available: Mutex<Result<bool, ProviderError>>,
    connect_failures: Mutex<VecDeque<ProviderError>>,
    account_error: Mutex<Option<ProviderError>>,
    restore: Option<Mutex<Option<WalletConnection>>>,
    events: Option<broadcast::Sender<ProviderEvent>>,
    pub connect_calls: AtomicUsize,
    pub disconnect_calls: AtomicUsize,
    pub availability_calls: AtomicUsize,
    log: CallLog,
}

impl MockProvider {
    pub fn new(id: &str, network: NetworkType) -> Self {
        Self {
            info: ProviderInfo::new(id, id, ""),
            account_id: Mutex::new(format!("0.0.{}", id.len() * 1000)),
            network: Mutex::new(network),
            available: Mutex::new(Ok(true)),
            connect_failures: Mutex::new(VecDeque::new()),
            account_error: Mutex::new(None),
            restore: None,
            events: None,
            connect_calls: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
            availability_calls: AtomicUsize::new(0),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    pub fn with_account(self, account_id: &str) -> Self {
        *self.account_id.lock().unwrap() = account_id.to_string();
        self
    }

    pub fn unavailable(self) -> Self {
        self.set_available(Ok(false));
        self
    }

    /// Connect fails with each given error once, in order, then succeeds
    pub fn failing_connects(self, errors: Vec<ProviderError>) -> Self {
        self.connect_failures.lock().unwrap().extend(errors);
        self
    }

    pub fn failing_account_info(self, error: ProviderError) -> Self {
        *self.account_error.lock().unwrap() = Some(error);
        self
    }

    /// Enable the restorable capability; restore yields `session`
    pub fn restorable(mut self, session: Option<WalletConnection>) -> Self {
        self.restore = Some(Mutex::new(session));
        self
    }

    pub fn with_events(mut self) -> Self {
        let (tx, _) = broadcast::channel(16);
        self.events = Some(tx);
        self
    }

    pub fn emit(&self, event: ProviderEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    pub fn set_available(&self, available: Result<bool, ProviderError>) {
        *self.available.lock().unwrap() = available;
    }

    pub fn connects(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    pub fn availability_checks(&self) -> usize {
        self.availability_calls.load(Ordering::SeqCst)
    }

    fn record(&self, call: &str) {
        self.log.lock().unwrap().push(format!("{}.{}", self.info.id, call));
    }

    fn connection(&self) -> WalletConnection {
        WalletConnection::new(&self.account_id.lock().unwrap(), *self.network.lock().unwrap())
    }
}

#[async_trait]
impl WalletProvider for MockProvider {
    fn info(&self) -> &ProviderInfo {
        &self.info
    }

    async fn is_available(&self) -> Result<bool, ProviderError> {
        self.availability_calls.fetch_add(1, Ordering::SeqCst);
        self.available.lock().unwrap().clone()
    }

    async fn connect(&self) -> Result<WalletConnection, ProviderError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        self.record("connect");
        if let Some(err) = self.connect_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(self.connection())
    }

    async fn disconnect(&self) -> Result<(), ProviderError> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        self.record("disconnect");
        Ok(())
    }

    async fn get_account_info(&self) -> Result<AccountInfo, ProviderError> {
        if let Some(err) = self.account_error.lock().unwrap().clone() {
            return Err(err);
        }
        let connection = self.connection();
        Ok(AccountInfo {
            account_id: connection.account_id,
            balance: "42 ℏ".to_string(),
            network: connection.network,
        })
    }

    async fn get_balance(&self) -> Result<String, ProviderError> {
        Ok("42 ℏ".to_string())
    }

    fn as_restorable(&self) -> Option<&dyn RestorableProvider> {
        self.restore.as_ref().map(|_| self as &dyn RestorableProvider)
    }

    fn events(&self) -> Option<broadcast::Receiver<ProviderEvent>> {
        self.events.as_ref().map(|tx| tx.subscribe())
    }
}

#[async_trait]
impl RestorableProvider for MockProvider {
    async fn restore_connection(
        &self,
        _stored: &StoredConnection,
    ) -> Result<Option<WalletConnection>, ProviderError> {
        self.record("restore");
        Ok(self
            .restore
            .as_ref()
            .and_then(|session| session.lock().unwrap().clone()))
    }

    async fn sync_connection_state(&self) -> Result<Option<WalletConnection>, ProviderError> {
        Ok(self
            .restore
            .as_ref()
            .and_then(|session| session.lock().unwrap().clone()))
    }
}

impl MockProvider {
    /// Replace what restore / sync report
    pub fn set_session(&self, session: Option<WalletConnection>) {
        if let Some(slot) = &self.restore {
            *slot.lock().unwrap() = session;
        }
    }
}
