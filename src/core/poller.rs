use crate::core::extract::extract_element_text;
use crate::domain::model::{PollSettings, TickOutcome, TimerText, UpdateOrdering};
use crate::domain::ports::{PageSource, TimerDisplay};
use crate::utils::error::{PollError, Result};
use crate::utils::monitor::{PollStats, PollStatsSnapshot};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Shortest period the schedule accepts; `tokio::time::interval` rejects zero.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Called with the tick sequence number and the error of every failed cycle.
pub type ErrorHook = Arc<dyn Fn(u64, &PollError) + Send + Sync>;

/// Fetches the page, pulls the timer text out of it and renders it, once per
/// tick.
///
/// Cycles started by [`Poller::spawn`] run as independent tasks, so a slow
/// response can be overtaken by a later one. [`UpdateOrdering`] decides what
/// happens then.
pub struct Poller<S: PageSource> {
    source: S,
    display: Arc<dyn TimerDisplay>,
    settings: PollSettings,
    next_seq: AtomicU64,
    // 最後一次寫入顯示的 tick 序號
    last_applied: Mutex<Option<u64>>,
    stats: Arc<PollStats>,
    error_hook: Option<ErrorHook>,
}

impl<S: PageSource> Poller<S> {
    /// An interval below [`MIN_INTERVAL`] is raised to it.
    pub fn new(source: S, display: Arc<dyn TimerDisplay>, mut settings: PollSettings) -> Self {
        if settings.interval < MIN_INTERVAL {
            tracing::warn!(
                "Poll interval {:?} is below {:?}, using {:?}",
                settings.interval,
                MIN_INTERVAL,
                MIN_INTERVAL
            );
            settings.interval = MIN_INTERVAL;
        }

        Self {
            source,
            display,
            settings,
            next_seq: AtomicU64::new(0),
            last_applied: Mutex::new(None),
            stats: Arc::new(PollStats::new()),
            error_hook: None,
        }
    }

    pub fn with_error_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(u64, &PollError) + Send + Sync + 'static,
    {
        self.error_hook = Some(Arc::new(hook));
        self
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    pub fn stats(&self) -> Arc<PollStats> {
        Arc::clone(&self.stats)
    }

    /// Runs one cycle right away, outside of any schedule.
    pub async fn tick(&self) -> TickOutcome {
        let seq = self.allocate_seq();
        self.run_cycle(seq).await
    }

    /// Starts the schedule. The first tick fires one interval from now.
    pub fn spawn(self) -> PollerHandle {
        let period = self.settings.interval;
        let start = Instant::now() + period;
        let token = CancellationToken::new();
        let tracker = TaskTracker::new();
        let stats = self.stats();

        let join = tokio::spawn(run_schedule(
            Arc::new(self),
            start,
            period,
            token.clone(),
            tracker.clone(),
        ));

        PollerHandle {
            token,
            tracker,
            join,
            stats,
        }
    }

    fn allocate_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn run_cycle(&self, seq: u64) -> TickOutcome {
        self.stats.record_tick();
        tracing::debug!("Tick {} fetching page", seq);

        let outcome = match self.fetch_and_extract().await {
            Ok(text) => self.apply(seq, text).await,
            Err(error) => TickOutcome::Failed { seq, error },
        };

        self.report(&outcome);
        outcome
    }

    async fn fetch_and_extract(&self) -> Result<TimerText> {
        let body = self.source.fetch_page().await?;
        extract_element_text(&body, &self.settings.element_id)
    }

    async fn apply(&self, seq: u64, text: TimerText) -> TickOutcome {
        // Ordering check and render happen under the same lock.
        let mut last_applied = self.last_applied.lock().await;

        if self.settings.ordering == UpdateOrdering::LastRequested {
            if let Some(newer) = (*last_applied).filter(|&last| last > seq) {
                return TickOutcome::Stale { seq, newer };
            }
        }

        match self.display.render(&self.settings.element_id, &text).await {
            Ok(()) => {
                *last_applied = Some(seq);
                self.stats.record_applied(seq);
                TickOutcome::Applied { seq, text }
            }
            Err(error) => TickOutcome::Failed { seq, error },
        }
    }

    fn report(&self, outcome: &TickOutcome) {
        match outcome {
            TickOutcome::Applied { seq, text } => {
                tracing::debug!("Tick {} rendered '{}'", seq, text);
            }
            TickOutcome::Stale { seq, newer } => {
                self.stats.record_stale();
                tracing::debug!("Tick {} dropped, tick {} already rendered", seq, newer);
            }
            TickOutcome::Failed { seq, error } => {
                self.stats.record_failed();
                tracing::warn!("Tick {} failed: {}", seq, error);
                if let Some(hook) = &self.error_hook {
                    hook(*seq, error);
                }
            }
        }
    }
}

async fn run_schedule<S: PageSource>(
    poller: Arc<Poller<S>>,
    start: Instant,
    period: Duration,
    token: CancellationToken,
    tracker: TaskTracker,
) {
    let mut ticker = time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        "⏱️ Polling every {:?} for element #{}",
        period,
        poller.settings.element_id
    );

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let seq = poller.allocate_seq();
                let cycle = Arc::clone(&poller);
                let cancel = token.clone();

                // 不等待上一輪完成，允許請求重疊
                tracker.spawn(async move {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => tracing::debug!("Tick {} cancelled", seq),
                        _ = cycle.run_cycle(seq) => {}
                    }
                });
            }
        }
    }

    tracker.close();
    tracing::debug!("Poll schedule stopped");
}

/// Owns a running schedule. Dropping the handle leaves the schedule running.
pub struct PollerHandle {
    token: CancellationToken,
    tracker: TaskTracker,
    join: JoinHandle<()>,
    stats: Arc<PollStats>,
}

impl PollerHandle {
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn stats(&self) -> Arc<PollStats> {
        Arc::clone(&self.stats)
    }

    /// Stops the schedule, cancels in-flight cycles and waits for all of them.
    pub async fn shutdown(self) -> PollStatsSnapshot {
        self.token.cancel();

        if let Err(e) = self.join.await {
            tracing::warn!("Poll schedule task ended abnormally: {}", e);
        }

        self.tracker.close();
        self.tracker.wait().await;
        self.stats.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::display::DocumentDisplay;
    use crate::utils::error::ElementScope;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    fn timer_page(value: &str) -> String {
        format!(
            r#"<html><body><h1>Pomo</h1><div id="timer">{}</div></body></html>"#,
            value
        )
    }

    fn unavailable() -> PollError {
        PollError::HttpStatus {
            status: 503,
            url: "http://127.0.0.1:5000/".to_string(),
        }
    }

    /// Replays scripted responses with per-response latency, then falls back to
    /// a fixed page.
    #[derive(Clone)]
    struct ScriptedSource {
        script: Arc<std::sync::Mutex<VecDeque<(Duration, Result<String>)>>>,
        fallback: Option<String>,
        fetches: Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        fn new(fallback: &str) -> Self {
            Self {
                script: Arc::new(std::sync::Mutex::new(VecDeque::new())),
                fallback: Some(fallback.to_string()),
                fetches: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn failing() -> Self {
            Self {
                fallback: None,
                ..Self::new("")
            }
        }

        fn then(self, delay_ms: u64, body: Result<String>) -> Self {
            self.script
                .lock()
                .unwrap()
                .push_back((Duration::from_millis(delay_ms), body));
            self
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    impl PageSource for ScriptedSource {
        async fn fetch_page(&self) -> Result<String> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();

            match next {
                Some((delay, body)) => {
                    time::sleep(delay).await;
                    body
                }
                None => self.fallback.clone().ok_or_else(unavailable),
            }
        }
    }

    fn poller_with(
        source: ScriptedSource,
        display: &DocumentDisplay,
        ordering: UpdateOrdering,
    ) -> Poller<ScriptedSource> {
        let settings = PollSettings {
            ordering,
            ..PollSettings::default()
        };
        Poller::new(source, Arc::new(display.clone()), settings)
    }

    #[tokio::test]
    async fn test_single_tick_renders_fetched_timer() {
        let display = DocumentDisplay::with_element("timer", "");
        let poller = poller_with(
            ScriptedSource::new(&timer_page("00:00:05")),
            &display,
            UpdateOrdering::LastCompleted,
        );

        let outcome = poller.tick().await;

        assert!(outcome.is_applied());
        assert_eq!(outcome.seq(), 1);
        assert_eq!(display.text_of("timer").as_deref(), Some("00:00:05"));
    }

    #[tokio::test]
    async fn test_repeated_ticks_keep_identical_text() {
        let display = DocumentDisplay::with_element("timer", "");
        let poller = poller_with(
            ScriptedSource::new(&timer_page("Great Job!")),
            &display,
            UpdateOrdering::LastCompleted,
        );

        for _ in 0..3 {
            assert!(poller.tick().await.is_applied());
            assert_eq!(display.text_of("timer").as_deref(), Some("Great Job!"));
        }

        // 相同內容仍然每次都寫入
        assert_eq!(display.writes(), 3);
        assert_eq!(poller.stats().snapshot().applied, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_completed_response_wins_by_default() {
        let source = ScriptedSource::new(&timer_page("unused"))
            .then(300, Ok(timer_page("00:00:01")))
            .then(50, Ok(timer_page("00:00:02")));
        let display = DocumentDisplay::with_element("timer", "");
        let poller = poller_with(source, &display, UpdateOrdering::default());

        let (first, second) = tokio::join!(poller.tick(), poller.tick());

        assert_eq!(first.seq(), 1);
        assert_eq!(second.seq(), 2);
        assert!(first.is_applied());
        assert!(second.is_applied());
        assert_eq!(display.text_of("timer").as_deref(), Some("00:00:01"));
        // 統計與畫面一致：最後寫入的是 tick 1
        assert_eq!(poller.stats().snapshot().last_applied_seq, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_requested_drops_stale_response() {
        let source = ScriptedSource::new(&timer_page("unused"))
            .then(300, Ok(timer_page("00:00:01")))
            .then(50, Ok(timer_page("00:00:02")));
        let display = DocumentDisplay::with_element("timer", "");
        let poller = poller_with(source, &display, UpdateOrdering::LastRequested);

        let (first, second) = tokio::join!(poller.tick(), poller.tick());

        assert!(matches!(first, TickOutcome::Stale { seq: 1, newer: 2 }));
        assert!(second.is_applied());
        assert_eq!(display.text_of("timer").as_deref(), Some("00:00:02"));
        assert_eq!(poller.stats().snapshot().stale, 1);
        assert_eq!(poller.stats().snapshot().last_applied_seq, Some(2));
    }

    #[tokio::test]
    async fn test_missing_fetched_element_keeps_previous_value() {
        let source = ScriptedSource::new(&timer_page("00:10:00"))
            .then(0, Ok(timer_page("00:09:59")))
            .then(0, Ok("<html><body><p>maintenance</p></body></html>".to_string()));
        let display = DocumentDisplay::with_element("timer", "");
        let failures = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen = Arc::clone(&failures);
        let poller = poller_with(source, &display, UpdateOrdering::LastCompleted)
            .with_error_hook(move |seq, error| seen.lock().unwrap().push((seq, error.to_string())));

        assert!(poller.tick().await.is_applied());
        let outcome = poller.tick().await;

        match outcome {
            TickOutcome::Failed {
                seq: 2,
                error: PollError::ElementNotFound { scope, .. },
            } => assert_eq!(scope, ElementScope::Fetched),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(display.text_of("timer").as_deref(), Some("00:09:59"));

        let failures = failures.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, 2);

        // 下一輪自動恢復
        drop(failures);
        assert!(poller.tick().await.is_applied());
        assert_eq!(display.text_of("timer").as_deref(), Some("00:10:00"));
    }

    #[tokio::test]
    async fn test_missing_live_element_fails_tick() {
        let display = DocumentDisplay::new();
        let poller = poller_with(
            ScriptedSource::new(&timer_page("00:00:05")),
            &display,
            UpdateOrdering::LastCompleted,
        );

        let outcome = poller.tick().await;

        assert!(matches!(
            outcome,
            TickOutcome::Failed {
                error: PollError::ElementNotFound {
                    scope: ElementScope::Live,
                    ..
                },
                ..
            }
        ));
        assert_eq!(poller.stats().snapshot().failed, 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_previous_value() {
        let source = ScriptedSource::new(&timer_page("unused"))
            .then(0, Ok(timer_page("00:24:59")))
            .then(0, Err(unavailable()));
        let display = DocumentDisplay::with_element("timer", "");
        let poller = poller_with(source, &display, UpdateOrdering::LastCompleted);

        assert!(poller.tick().await.is_applied());
        assert!(matches!(
            poller.tick().await,
            TickOutcome::Failed {
                error: PollError::HttpStatus { status: 503, .. },
                ..
            }
        ));
        assert_eq!(display.text_of("timer").as_deref(), Some("00:24:59"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_fetches_once_per_interval() {
        let source = ScriptedSource::new(&timer_page("00:00:05"));
        let counter = source.clone();
        let display = DocumentDisplay::with_element("timer", "");
        let handle = poller_with(source, &display, UpdateOrdering::LastCompleted).spawn();

        time::sleep(Duration::from_millis(999)).await;
        assert_eq!(counter.fetches(), 0);

        time::sleep(Duration::from_millis(501)).await;
        assert_eq!(counter.fetches(), 1);
        assert_eq!(display.text_of("timer").as_deref(), Some("00:00:05"));

        time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(counter.fetches(), 3);

        let snapshot = handle.shutdown().await;
        assert_eq!(snapshot.ticks, 3);
        assert_eq!(snapshot.applied, 3);
        assert_eq!(snapshot.last_applied_seq, Some(3));

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(counter.fetches(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_survives_failing_ticks() {
        let source = ScriptedSource::failing();
        let display = DocumentDisplay::with_element("timer", "--:--");
        let handle = poller_with(source, &display, UpdateOrdering::LastCompleted).spawn();

        time::sleep(Duration::from_millis(3500)).await;
        handle.stop();
        assert!(handle.is_stopped());

        let snapshot = handle.shutdown().await;
        assert_eq!(snapshot.ticks, 3);
        assert_eq!(snapshot.failed, 3);
        assert_eq!(display.text_of("timer").as_deref(), Some("--:--"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_cycles_are_not_cancelled_by_next_tick() {
        let source = ScriptedSource::new(&timer_page("unused"))
            .then(2500, Ok(timer_page("slow")))
            .then(100, Ok(timer_page("fast")));
        let counter = source.clone();
        let display = DocumentDisplay::with_element("timer", "");
        let handle = poller_with(source, &display, UpdateOrdering::LastCompleted).spawn();

        // tick 1 at 1000ms resolves at 3500ms, tick 2 at 2000ms resolves at 2100ms
        time::sleep(Duration::from_millis(2200)).await;
        assert_eq!(display.text_of("timer").as_deref(), Some("fast"));

        time::sleep(Duration::from_millis(1400)).await;
        assert_eq!(display.text_of("timer").as_deref(), Some("slow"));
        assert!(counter.fetches() >= 3);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_element_removed_mid_schedule() {
        let source = ScriptedSource::new(&timer_page("00:00:05"));
        let display = DocumentDisplay::with_element("timer", "");
        let handle = poller_with(source, &display, UpdateOrdering::LastCompleted).spawn();

        time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(display.text_of("timer").as_deref(), Some("00:00:05"));

        assert_eq!(display.remove_element("timer").as_deref(), Some("00:00:05"));
        time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(handle.stats().snapshot().failed, 2);
        assert_eq!(display.text_of("timer"), None);

        // 元素回來後排程照常寫入
        display.insert_element("timer", "");
        time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(display.text_of("timer").as_deref(), Some("00:00:05"));

        let snapshot = handle.shutdown().await;
        assert_eq!(snapshot.ticks, 4);
        assert_eq!(snapshot.applied, 2);
        assert_eq!(snapshot.last_applied_seq, Some(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_raised_to_minimum() {
        let source = ScriptedSource::new(&timer_page("00:00:05"));
        let display = DocumentDisplay::with_element("timer", "");
        let settings = PollSettings {
            interval: Duration::ZERO,
            ..PollSettings::default()
        };
        let poller = Poller::new(source, Arc::new(display.clone()), settings);
        assert_eq!(poller.settings().interval, MIN_INTERVAL);

        let handle = poller.spawn();
        time::sleep(Duration::from_millis(5) + Duration::from_micros(500)).await;

        let snapshot = handle.shutdown().await;
        assert_eq!(snapshot.ticks, 5);
        assert_eq!(display.text_of("timer").as_deref(), Some("00:00:05"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_in_flight_cycle() {
        let source = ScriptedSource::new(&timer_page("unused")).then(5000, Ok(timer_page("late")));
        let display = DocumentDisplay::with_element("timer", "--:--");
        let handle = poller_with(source, &display, UpdateOrdering::LastCompleted).spawn();

        time::sleep(Duration::from_millis(1500)).await;
        let snapshot = handle.shutdown().await;

        assert_eq!(snapshot.ticks, 1);
        assert_eq!(snapshot.applied, 0);

        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(display.text_of("timer").as_deref(), Some("--:--"));
    }
}
