//! Background Expiry Sweeper
//!
//! This module implements a background task that periodically scans the table
//! for expired keys and removes them. This is called "active expiry" as opposed
//! to "lazy expiry" (which happens on access).
//!
//! ## Why Do We Need This?
//!
//! Lazy expiry (checking on access) is cheap but has a gap: a key that expires
//! and is never read again would stay in memory forever. The sweeper bounds
//! the memory held by such keys.
//!
//! ## Design
//!
//! The sweeper runs as a Tokio task and:
//! 1. Waits for a fixed interval, measured from the moment it started
//! 2. Removes every expired entry in one pass over the table
//! 3. Logs how many entries were removed
//!
//! It never returns entries to anyone and never runs on a caller's path.
//! A Tokio task does not keep the runtime alive, so an idle sweeper never
//! prevents the process from exiting.

use crate::storage::config::MIN_SWEEP_INTERVAL;
use crate::storage::EntryTable;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

/// A handle to the running expiry sweeper.
///
/// When this handle is dropped, the sweeper task will be stopped.
#[derive(Debug)]
pub struct ExpirySweeper {
    /// Sender to signal shutdown
    shutdown_tx: watch::Sender<bool>,

    /// The sweeper task, taken on shutdown
    task: Option<JoinHandle<()>>,
}

impl ExpirySweeper {
    /// Starts the expiry sweeper as a background task.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    ///
    /// # Example
    ///
    /// ```
    /// use unikv::storage::{EntryTable, ExpirySweeper};
    /// use std::sync::Arc;
    /// use std::time::Duration;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let table = Arc::new(EntryTable::new(None));
    /// let sweeper = ExpirySweeper::start(Arc::clone(&table), Duration::from_secs(1));
    ///
    /// // Sweeper runs in the background...
    ///
    /// sweeper.shutdown().await;
    /// # }
    /// ```
    pub fn start(table: Arc<EntryTable>, interval: Duration) -> Self {
        let interval = interval.max(MIN_SWEEP_INTERVAL);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(sweeper_loop(table, interval, shutdown_rx));

        info!(interval_ms = interval.as_millis() as u64, "Background expiry sweeper started");

        Self {
            shutdown_tx,
            task: Some(task),
        }
    }

    /// Signals the sweeper to stop without waiting for it.
    ///
    /// This is called automatically when the handle is dropped.
    pub fn stop(&self) {
        // The receiver is gone once the task has already exited
        let _ = self.shutdown_tx.send(true);
    }

    /// Stops the sweeper and waits until its task has finished.
    ///
    /// Once this returns, no sweep is running or will run.
    pub async fn shutdown(mut self) {
        self.stop();

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Expiry sweeper task ended abnormally");
            }
        }

        info!("Background expiry sweeper stopped");
    }

    /// Returns true while the sweeper task is alive.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The main sweeper loop.
async fn sweeper_loop(
    table: Arc<EntryTable>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; sweeps start one interval in
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Expiry sweeper received shutdown signal");
                    return;
                }
                continue;
            }
        }

        let expired = table.remove_expired();

        if expired > 0 {
            debug!(
                expired = expired,
                keys_remaining = table.len(),
                "Expired keys cleaned up"
            );
        } else {
            trace!("Expiry sweep found nothing to remove");
        }
    }
}
