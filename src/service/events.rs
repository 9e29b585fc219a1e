//! Wallet Session Events
//!
//! Typed publish/subscribe for session lifecycle changes. Consumers either
//! hold a broadcast receiver / stream, or register callback listeners keyed by
//! `EventKind`. A panicking listener is logged and skipped.

use async_stream::stream;
use futures_util::Stream;
use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::{error, warn};

use crate::network::NetworkSwitchRequest;
use crate::wallet::{AccountInfo, NetworkType, WalletConnection, WalletError};

/// Session lifecycle event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WalletEvent {
    ConnectionStarting {
        provider_id: String,
    },
    Connected {
        provider_id: String,
        connection: WalletConnection,
    },
    ProviderChanged {
        previous: Option<String>,
        current: Option<String>,
    },
    ConnectionCompleted {
        provider_id: String,
        connection: WalletConnection,
        account: Option<AccountInfo>,
    },
    ConnectionFailed {
        provider_id: String,
        error: WalletError,
    },
    Disconnected {
        provider_id: String,
    },
    AccountChanged {
        provider_id: String,
        previous: Option<String>,
        current: String,
    },
    NetworkChanged {
        provider_id: String,
        previous: Option<NetworkType>,
        current: NetworkType,
    },
    ConnectionRestored {
        provider_id: String,
        connection: WalletConnection,
    },
    RetryScheduled {
        provider_id: String,
        attempt: u32,
        delay_ms: u64,
    },
    NetworkSwitchRequested {
        provider_id: String,
        request: NetworkSwitchRequest,
    },
}

/// Discriminant of `WalletEvent`, used to key listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    ConnectionStarting,
    Connected,
    ProviderChanged,
    ConnectionCompleted,
    ConnectionFailed,
    Disconnected,
    AccountChanged,
    NetworkChanged,
    ConnectionRestored,
    RetryScheduled,
    NetworkSwitchRequested,
}

impl WalletEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            WalletEvent::ConnectionStarting { .. } => EventKind::ConnectionStarting,
            WalletEvent::Connected { .. } => EventKind::Connected,
            WalletEvent::ProviderChanged { .. } => EventKind::ProviderChanged,
            WalletEvent::ConnectionCompleted { .. } => EventKind::ConnectionCompleted,
            WalletEvent::ConnectionFailed { .. } => EventKind::ConnectionFailed,
            WalletEvent::Disconnected { .. } => EventKind::Disconnected,
            WalletEvent::AccountChanged { .. } => EventKind::AccountChanged,
            WalletEvent::NetworkChanged { .. } => EventKind::NetworkChanged,
            WalletEvent::ConnectionRestored { .. } => EventKind::ConnectionRestored,
            WalletEvent::RetryScheduled { .. } => EventKind::RetryScheduled,
            WalletEvent::NetworkSwitchRequested { .. } => EventKind::NetworkSwitchRequested,
        }
    }
}

/// Stream of wallet events
pub type EventStream = Pin<Box<dyn Stream<Item = WalletEvent> + Send>>;

/// Handle returned by `EventBus::on`, used to remove the listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&WalletEvent) + Send + Sync>;

struct Registration {
    id: ListenerId,
    kind: Option<EventKind>,
    listener: Listener,
}

/// Broadcast channel plus keyed callback listeners
pub struct EventBus {
    sender: broadcast::Sender<WalletEvent>,
    listeners: RwLock<Vec<Registration>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WalletEvent> {
        self.sender.subscribe()
    }

    /// Events as a `Stream`; lagging consumers skip what they missed
    pub fn stream(&self) -> EventStream {
        let mut receiver = self.sender.subscribe();
        let stream = stream! {
            loop {
                match receiver.recv().await {
                    Ok(event) => yield event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Wallet event stream lagged, skipped {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        };
        Box::pin(stream)
    }

    /// Call `listener` for every event of `kind`
    pub fn on<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&WalletEvent) + Send + Sync + 'static,
    {
        self.register(Some(kind), Arc::new(listener))
    }

    /// Call `listener` for every event
    pub fn on_any<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&WalletEvent) + Send + Sync + 'static,
    {
        self.register(None, Arc::new(listener))
    }

    /// Remove a listener; false if it was not registered
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        let before = listeners.len();
        listeners.retain(|registration| registration.id != id);
        listeners.len() != before
    }

    pub fn emit(&self, event: WalletEvent) {
        let kind = event.kind();
        let matching: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|registration| registration.kind.map_or(true, |k| k == kind))
            .map(|registration| registration.listener.clone())
            .collect();

        for listener in matching {
            if catch_unwind(AssertUnwindSafe(|| listener(&event))).is_err() {
                error!("Wallet event listener panicked while handling {:?}", kind);
            }
        }

        // No receivers is not an error
        let _ = self.sender.send(event);
    }

    fn register(&self, kind: Option<EventKind>, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(Registration { id, kind, listener });
        id
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
