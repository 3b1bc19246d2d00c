//! Periodic recompute task.
//!
//! Ticks the store on a fixed interval so decayed signals expire even when
//! nothing is being ingested. Cancelling stops future ticks; it never clears
//! state.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use super::CorridorStore;
use crate::types::CorridorEvent;

/// Owner's handle on a running scheduler.
#[derive(Debug)]
pub struct SchedulerHandle {
    cancel_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Ask the task to stop after the current tick, if any.
    pub fn cancel(&self) {
        let _ = self.cancel_tx.send(true);
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Cancel and wait for the task to exit.
    pub async fn shutdown(self) {
        self.cancel();
        if let Err(e) = self.task.await {
            error!(error = %e, "Scheduler task ended abnormally");
        }
    }
}

/// Start ticking `store` every `period`. The first tick fires one period
/// after start.
pub fn spawn(store: Arc<CorridorStore>, period: Duration) -> SchedulerHandle {
    let (cancel_tx, mut cancel_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first interval tick completes immediately.
        interval.tick().await;

        info!(period_ms = period.as_millis() as u64, "Scheduler started");
        store.emit(CorridorEvent::Started { at: store.clock().now() });

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match store.tick().await {
                        Ok(changed) => debug!(changed, "Scheduled tick"),
                        Err(e) => error!(error = %e, "Scheduled tick failed, state unchanged"),
                    }
                }
                res = cancel_rx.changed() => {
                    if res.is_err() || *cancel_rx.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Scheduler stopped");
        store.emit(CorridorEvent::Stopped { at: store.clock().now() });
    });

    SchedulerHandle { cancel_tx, task }
}
