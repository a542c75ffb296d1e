use crate::core::poller::Poller;
use crate::domain::model::{TickOutcome, TimerText};
use crate::domain::ports::PageSource;
use crate::utils::error::{PollError, Result};
use crate::utils::monitor::{PollStatsSnapshot, SystemMonitor};
use std::future::Future;
use std::time::Duration;

const STATS_INTERVAL: Duration = Duration::from_secs(60);

/// Owns the poller for the lifetime of the application.
pub struct SyncEngine<S: PageSource> {
    poller: Poller<S>,
    monitor: SystemMonitor,
}

impl<S: PageSource> SyncEngine<S> {
    pub fn new(poller: Poller<S>) -> Self {
        Self::new_with_monitoring(poller, false)
    }

    pub fn new_with_monitoring(poller: Poller<S>, monitor_enabled: bool) -> Self {
        Self {
            poller,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    /// One tick, outside of any schedule.
    pub async fn run_once(&self) -> Result<TimerText> {
        match self.poller.tick().await {
            TickOutcome::Applied { text, .. } => Ok(text),
            TickOutcome::Failed { error, .. } => Err(error),
            // 單次執行不會有更新的 tick
            TickOutcome::Stale { seq, newer } => Err(PollError::Render {
                message: format!("tick {} superseded by tick {}", seq, newer),
            }),
        }
    }

    /// Polls until `shutdown` resolves, then stops the schedule and returns
    /// the final counters.
    pub async fn run_until<F>(self, shutdown: F) -> PollStatsSnapshot
    where
        F: Future<Output = ()>,
    {
        let Self { poller, monitor } = self;

        tracing::info!(
            "Starting timer sync for element #{}",
            poller.settings().element_id
        );
        monitor.log_stats("Startup");

        let handle = poller.spawn();
        let stats = handle.stats();

        let mut report = tokio::time::interval_at(
            tokio::time::Instant::now() + STATS_INTERVAL,
            STATS_INTERVAL,
        );
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = report.tick(), if monitor.is_enabled() => {
                    stats.snapshot().log("Poll");
                    monitor.log_stats("Process");
                }
            }
        }

        tracing::info!("Stopping timer sync");
        let snapshot = handle.shutdown().await;

        snapshot.log("Final");
        monitor.log_final_stats();
        snapshot
    }
}
