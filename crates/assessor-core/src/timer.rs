//! Elapsed-time display for a running session.
//!
//! Purely advisory: nothing here feeds scoring or persistence.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::model::SessionPhase;

/// Time since `started_at`, saturating at zero if `now` is earlier.
pub fn elapsed(now: DateTime<Utc>, started_at: DateTime<Utc>) -> Duration {
    (now - started_at).to_std().unwrap_or(Duration::ZERO)
}

/// Format a duration as `m:ss`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Shortest refresh period the ticker accepts.
pub const MIN_TICK_PERIOD: Duration = Duration::from_millis(1);

/// A background task refreshing an elapsed-time string while a session is active.
pub struct ElapsedTicker {
    display: watch::Receiver<String>,
    handle: JoinHandle<()>,
}

impl ElapsedTicker {
    /// Spawn the ticker. It refreshes every `period` and exits as soon as
    /// the observed phase is anything but [`SessionPhase::Active`].
    /// Periods below [`MIN_TICK_PERIOD`] are raised to it.
    pub fn spawn(
        started_at: DateTime<Utc>,
        mut phase: watch::Receiver<SessionPhase>,
        period: Duration,
    ) -> Self {
        let period = period.max(MIN_TICK_PERIOD);
        let offset = elapsed(Utc::now(), started_at);
        let origin = tokio::time::Instant::now();
        let (tx, display) = watch::channel(format_elapsed(offset));

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;

            loop {
                if *phase.borrow_and_update() != SessionPhase::Active {
                    break;
                }
                tokio::select! {
                    _ = interval.tick() => {
                        let _ = tx.send(format_elapsed(offset + origin.elapsed()));
                    }
                    changed = phase.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("elapsed ticker stopped");
        });

        Self { display, handle }
    }

    /// Latest display string.
    pub fn current(&self) -> String {
        self.display.borrow().clone()
    }

    /// Subscribe to display updates.
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.display.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the ticker task to exit.
    pub async fn join(&mut self) {
        let _ = (&mut self.handle).await;
    }
}

impl Drop for ElapsedTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
