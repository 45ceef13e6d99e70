//! # Network Monitor
//!
//! Periodically probes the record store and publishes the result on a
//! `tokio::sync::watch` channel. The controller does not own the monitor; the
//! composition root forwards status changes to `SyncController::set_online`.

use crate::client::store::{bounded, RecordStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    Online,
    Offline,
}

impl NetworkStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, NetworkStatus::Online)
    }
}

pub struct NetworkMonitor {
    store: Arc<dyn RecordStore>,
    interval: Duration,
    timeout: Duration,
    status: watch::Sender<NetworkStatus>,
    task: Option<JoinHandle<()>>,
}

impl NetworkMonitor {
    pub fn new(store: Arc<dyn RecordStore>, interval: Duration, timeout: Duration) -> Self {
        let (status, _) = watch::channel(NetworkStatus::Offline);
        Self {
            store,
            interval,
            timeout,
            status,
            task: None,
        }
    }

    pub fn get_status(&self) -> NetworkStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<NetworkStatus> {
        self.status.subscribe()
    }

    /// Probe once and publish the result
    pub async fn check_now(&self) -> NetworkStatus {
        probe_and_publish(self.store.as_ref(), self.timeout, &self.status).await
    }

    /// Start periodic probing; a no-op if already running
    pub fn start(&mut self) {
        if self.task.is_some() {
            return;
        }
        let store = Arc::clone(&self.store);
        let status = self.status.clone();
        let interval = self.interval;
        let timeout = self.timeout;

        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                probe_and_publish(store.as_ref(), timeout, &status).await;
            }
        }));
        tracing::debug!("[Network] Monitor started, probing every {:?}", interval);
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("[Network] Monitor stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for NetworkMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn probe_and_publish(
    store: &dyn RecordStore,
    timeout: Duration,
    status: &watch::Sender<NetworkStatus>,
) -> NetworkStatus {
    let current = match bounded(timeout, store.probe()).await {
        Ok(()) => NetworkStatus::Online,
        Err(e) => {
            tracing::debug!("[Network] Probe failed: {}", e);
            NetworkStatus::Offline
        }
    };
    status.send_if_modified(|previous| {
        if *previous == current {
            return false;
        }
        tracing::info!("[Network] Status changed: {:?} -> {:?}", previous, current);
        *previous = current;
        true
    });
    current
}
