//! Session state monitor
//!
//! Diagnostics task that follows the service's events and polls its snapshot,
//! recording each observed change into a bounded history.

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::service::{EventKind, SessionSnapshot, WalletEvent, WalletService};

/// What produced a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "event", rename_all = "camelCase")]
pub enum RecordSource {
    Event(EventKind),
    Poll,
}

/// One observation. `snapshot` is the service state when the record was
/// taken, which may already be past the event that triggered it; `event`
/// carries that event's own payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorRecord {
    pub at: DateTime<Utc>,
    pub source: RecordSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<WalletEvent>,
    pub snapshot: SessionSnapshot,
}

type History = Arc<Mutex<VecDeque<MonitorRecord>>>;

pub struct StateMonitor {
    history: History,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl StateMonitor {
    /// Start monitoring `service`, keeping at most `capacity` records
    pub fn spawn(service: WalletService, poll_interval: Duration, capacity: usize) -> Self {
        let history: History = Arc::new(Mutex::new(VecDeque::with_capacity(capacity)));
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let records = history.clone();
        let mut events = service.event_stream();
        let task = tokio::spawn(async move {
            let mut ticker = interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last: Option<SessionSnapshot> = None;

            info!("State monitor started (poll every {:?})", poll_interval);

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    event = events.next() => {
                        let Some(event) = event else {
                            warn!("Event stream closed, monitor stopping");
                            break;
                        };
                        let snapshot = service.snapshot().await;
                        debug!("Monitor observed {:?}", event.kind());
                        let source = RecordSource::Event(event.kind());
                        push(&records, capacity, source, Some(event), snapshot.clone());
                        last = Some(snapshot);
                    }
                    _ = ticker.tick() => {
                        let snapshot = service.snapshot().await;
                        if last.as_ref() != Some(&snapshot) {
                            info!(
                                "Session state changed: provider={:?} account={:?}",
                                snapshot.provider.as_ref().map(|p| p.id.as_str()),
                                snapshot.connection.as_ref().map(|c| c.account_id.as_str())
                            );
                            push(&records, capacity, RecordSource::Poll, None, snapshot.clone());
                            last = Some(snapshot);
                        }
                    }
                }
            }

            info!("State monitor stopped");
        });

        Self {
            history,
            shutdown,
            task,
        }
    }

    pub fn history(&self) -> Vec<MonitorRecord> {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    /// Stop the task and return everything recorded
    pub async fn stop(self) -> Vec<MonitorRecord> {
        let StateMonitor {
            history,
            shutdown,
            task,
        } = self;
        let _ = shutdown.send(true);
        if let Err(e) = task.await {
            warn!("State monitor task failed: {}", e);
        }
        let history = history.lock().unwrap_or_else(|e| e.into_inner());
        history.iter().cloned().collect()
    }
}

fn push(
    history: &History,
    capacity: usize,
    source: RecordSource,
    event: Option<WalletEvent>,
    snapshot: SessionSnapshot,
) {
    if capacity == 0 {
        return;
    }
    let mut history = history.lock().unwrap_or_else(|e| e.into_inner());
    while history.len() >= capacity {
        history.pop_front();
    }
    history.push_back(MonitorRecord {
        at: Utc::now(),
        source,
        event,
        snapshot,
    });
}
