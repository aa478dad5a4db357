//! dvs-watch - Poll coordinator for a DVSPortal client
//!
//! Owns the periodic refresh of a shared [`DvsPortal`] and publishes the
//! outcome over a [`tokio::sync::watch`] channel: the latest good snapshot,
//! the derived views, an availability flag, and the plates first seen in the
//! most recent refresh. A failed refresh never crashes the loop; it marks
//! the data unavailable (keeping the stale snapshot) and retries on the next
//! tick.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use dvs_client::DvsPortal;
use dvs_core::{compute_views, EntityView, PortalSnapshot};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Notify};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Default refresh cadence of the original integration
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(120);

/// Configuration for a [`PortalWatcher`]
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub poll_interval: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Published state of the poll loop
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollState {
    /// False until the first successful refresh, and after any failed one
    pub available: bool,
    /// Last successfully fetched snapshot; kept (stale) through failures
    pub snapshot: Option<PortalSnapshot>,
    /// Views derived from `snapshot` at publication time
    pub views: Vec<EntityView>,
    /// Plates seen for the first time in this refresh; a consumer registers
    /// derived per-plate entities off this list
    pub new_plates: Vec<String>,
    /// Message of the most recent failure, cleared on success
    pub last_error: Option<String>,
    /// Refresh attempts since the watcher started
    pub refreshes: u64,
}

/// Handle to a spawned poll loop. Aborts the loop when dropped.
pub struct PortalWatcher {
    handle: tokio::task::JoinHandle<()>,
    rx: watch::Receiver<PollState>,
    refresh: Arc<Notify>,
}

impl PortalWatcher {
    /// Spawn the poll loop on the current tokio runtime. The first refresh
    /// happens immediately, then every `poll_interval`.
    pub fn spawn(portal: Arc<DvsPortal>, config: WatchConfig) -> Self {
        let (tx, rx) = watch::channel(PollState::default());
        let refresh = Arc::new(Notify::new());
        let handle = tokio::spawn(run(portal, config, tx, refresh.clone()));
        Self {
            handle,
            rx,
            refresh,
        }
    }

    /// A receiver for state updates; `changed()` resolves per refresh.
    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.rx.clone()
    }

    /// Snapshot of the current published state.
    pub fn state(&self) -> PollState {
        self.rx.borrow().clone()
    }

    /// Trigger an immediate out-of-band refresh; the periodic cadence
    /// restarts from it.
    pub fn request_refresh(&self) {
        self.refresh.notify_one();
    }

    /// Stop the poll loop.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

impl Drop for PortalWatcher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn run(
    portal: Arc<DvsPortal>,
    config: WatchConfig,
    tx: watch::Sender<PollState>,
    refresh: Arc<Notify>,
) {
    let mut interval = tokio::time::interval(config.poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut seen_plates: HashSet<String> = HashSet::new();
    let mut last_good: Option<PortalSnapshot> = None;
    let mut refreshes: u64 = 0;

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = refresh.notified() => {
                debug!("out-of-band refresh requested");
                interval.reset();
            }
        }

        refreshes += 1;
        match portal.update().await {
            Ok(snapshot) => {
                let now = Local::now().naive_local();
                let views = compute_views(&snapshot, now);
                let new_plates = diff_new_plates(&seen_plates, &snapshot);
                if !new_plates.is_empty() {
                    info!(plates = ?new_plates, "new license plates discovered");
                    seen_plates.extend(new_plates.iter().cloned());
                }

                last_good = Some(snapshot.clone());
                let _ = tx.send(PollState {
                    available: true,
                    snapshot: Some(snapshot),
                    views,
                    new_plates,
                    last_error: None,
                    refreshes,
                });
            }
            Err(err) => {
                warn!(
                    error = %err,
                    transient = err.is_transient(),
                    "portal refresh failed"
                );
                // Stale data beats no data: keep the last good snapshot and
                // views, flagged unavailable
                let views = last_good
                    .as_ref()
                    .map(|s| compute_views(s, Local::now().naive_local()))
                    .unwrap_or_default();
                let _ = tx.send(PollState {
                    available: false,
                    snapshot: last_good.clone(),
                    views,
                    new_plates: Vec::new(),
                    last_error: Some(err.to_string()),
                    refreshes,
                });
            }
        }
    }
}

/// Plates in the snapshot that the loop has not published before, sorted.
fn diff_new_plates(seen: &HashSet<String>, snapshot: &PortalSnapshot) -> Vec<String> {
    let mut fresh: Vec<String> = snapshot
        .known_license_plates
        .keys()
        .filter(|plate| !seen.contains(*plate))
        .cloned()
        .collect();
    fresh.sort();
    fresh
}
