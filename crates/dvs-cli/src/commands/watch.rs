//! Watch command - run the poll coordinator until interrupted

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use dvs_client::DvsPortal;
use dvs_watch::{PortalWatcher, WatchConfig};

use crate::commands::render_snapshot;
use crate::output::OutputContext;

pub async fn watch(portal: DvsPortal, poll_interval: Duration, ctx: &OutputContext) -> Result<()> {
    let watcher = PortalWatcher::spawn(
        Arc::new(portal),
        WatchConfig { poll_interval },
    );
    let mut rx = watcher.subscribe();

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = rx.borrow_and_update().clone();
                if state.available {
                    ctx.info(&format!("refresh #{}", state.refreshes));
                    if let Some(snapshot) = &state.snapshot {
                        render_snapshot(snapshot, ctx);
                    }
                    if !state.new_plates.is_empty() {
                        ctx.success(&format!("new plates: {}", state.new_plates.join(", ")));
                    }
                } else {
                    ctx.error(&format!(
                        "refresh #{} failed: {}",
                        state.refreshes,
                        state.last_error.as_deref().unwrap_or("unknown error")
                    ));
                }
            }
            _ = tokio::signal::ctrl_c() => {
                ctx.info("stopping");
                break;
            }
        }
    }

    watcher.abort();
    Ok(())
}
