use crate::records::{load_best_score, record_score};
use crate::session::{Session, SessionOutcome, SessionSnapshot, ms};
use crate::traits::{FrameSource, KeyValueStore, StrikeClassifier};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use strikecount_core::config::SessionDefaults;
use strikecount_core::types::{FinishReason, Goal, Strike};
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("a session is already running")]
    AlreadyRunning,
    #[error("camera unavailable: {0}")]
    CameraUnavailable(String),
    #[error("invalid session config: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub duration_secs: u32,
    pub capture_interval: Duration,
    pub tick_interval: Duration,
    pub goal: Option<Goal>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            duration_secs: 30,
            capture_interval: Duration::from_millis(500),
            tick_interval: Duration::from_secs(1),
            goal: None,
        }
    }
}

impl SessionConfig {
    pub fn from_defaults(defaults: &SessionDefaults) -> Result<Self, EngineError> {
        let cfg = Self {
            duration_secs: defaults.duration_secs,
            capture_interval: Duration::from_millis(defaults.capture_interval_ms),
            goal: defaults.goal,
            ..Default::default()
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.duration_secs == 0 {
            return Err(EngineError::InvalidConfig("duration must be at least 1s".into()));
        }
        if self.capture_interval.is_zero() || self.tick_interval.is_zero() {
            return Err(EngineError::InvalidConfig("intervals must be non-zero".into()));
        }
        if self.goal.is_some_and(|g| g.count == 0) {
            return Err(EngineError::InvalidConfig("goal count must be at least 1".into()));
        }
        Ok(())
    }
}

/// Progress events for the UI layer. The hook must be fast; it runs inside the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Started(SessionSnapshot),
    Tick(SessionSnapshot),
    Strike {
        strike: Strike,
        snapshot: SessionSnapshot,
    },
    SampleSkipped,
    Finished(SessionOutcome),
}

/// Sender half used by the UI to stop a running session.
#[derive(Debug)]
pub struct StopHandle(Option<oneshot::Sender<()>>);

impl StopHandle {
    pub fn stop(&mut self) {
        if let Some(tx) = self.0.take() {
            let _ = tx.send(());
        }
    }
}

#[derive(Debug)]
pub struct StopSignal(Option<oneshot::Receiver<()>>);

impl StopSignal {
    pub fn pair() -> (StopHandle, StopSignal) {
        let (tx, rx) = oneshot::channel();
        (StopHandle(Some(tx)), StopSignal(Some(rx)))
    }

    pub fn never() -> Self {
        Self(None)
    }

    async fn wait(&mut self) {
        let Some(rx) = self.0.as_mut() else {
            return std::future::pending().await;
        };
        let res = rx.await;
        self.0 = None;
        if res.is_err() {
            // Handle dropped without stopping: nobody can stop us any more.
            std::future::pending::<()>().await;
        }
    }
}

enum Detection {
    Label(Strike),
    Failed,
}

async fn detect_once(
    frames: Arc<dyn FrameSource>,
    classifier: Arc<dyn StrikeClassifier>,
) -> Detection {
    let frame = match frames.capture().await {
        Ok(f) => f,
        Err(e) => {
            log::warn!("frame capture failed: {e:#}");
            return Detection::Failed;
        }
    };

    match classifier.classify(&frame).await {
        Ok(strike) => Detection::Label(strike),
        Err(e) => {
            log::warn!("strike classification failed, counting as none: {e:#}");
            Detection::Failed
        }
    }
}

async fn join_in_flight(slot: &mut Option<JoinHandle<Detection>>) -> Detection {
    match slot.as_mut() {
        Some(handle) => handle.await.unwrap_or_else(|e| {
            log::warn!("classification task failed: {e}");
            Detection::Failed
        }),
        None => std::future::pending().await,
    }
}

struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct StrikeEngine {
    cfg: SessionConfig,
    classifier: Arc<dyn StrikeClassifier>,
    frames: Arc<dyn FrameSource>,
    store: Arc<dyn KeyValueStore>,
    running: AtomicBool,
}

// Collaborators may hold API keys; only the session settings are shown.
impl std::fmt::Debug for StrikeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrikeEngine")
            .field("cfg", &self.cfg)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl StrikeEngine {
    pub fn new(
        cfg: SessionConfig,
        classifier: Arc<dyn StrikeClassifier>,
        frames: Arc<dyn FrameSource>,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, EngineError> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            classifier,
            frames,
            store,
            running: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.cfg
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn best_score(&self) -> anyhow::Result<u32> {
        load_best_score(self.store.as_ref())
    }

    pub fn idle_snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::idle(self.cfg.duration_secs, self.cfg.goal)
    }

    /// Runs one session to completion (timer, goal, or stop).
    pub async fn run_session(&self, stop: StopSignal) -> Result<SessionOutcome, EngineError> {
        self.run_session_with_hook(stop, |_event| async {}).await
    }

    /// Same as `run_session`, but emits progress events as the session runs.
    ///
    /// Countdown and sampling are two intervals driven from this one task. Each sampled
    /// frame is classified on a spawned task; while that task is outstanding further
    /// sampling ticks are dropped. When the session ends the outstanding task (if any) is
    /// detached and its result ignored.
    pub async fn run_session_with_hook<F, Fut>(
        &self,
        mut stop: StopSignal,
        on_event: F,
    ) -> Result<SessionOutcome, EngineError>
    where
        F: Fn(SessionEvent) -> Fut,
        Fut: Future<Output = ()>,
    {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(EngineError::AlreadyRunning);
        }
        let _guard = RunGuard(&self.running);

        self.frames
            .open()
            .await
            .map_err(|e| EngineError::CameraUnavailable(format!("{e:#}")))?;

        let mut session = Session::new(self.cfg.duration_secs, self.cfg.goal);
        session.start();
        log::info!(
            "session {} started: duration={}s goal={:?}",
            session.id(),
            self.cfg.duration_secs,
            self.cfg.goal
        );
        on_event(SessionEvent::Started(session.snapshot())).await;

        let started = Instant::now();
        let mut countdown = interval_at(started + self.cfg.tick_interval, self.cfg.tick_interval);
        let mut sampler =
            interval_at(started + self.cfg.capture_interval, self.cfg.capture_interval);
        sampler.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut in_flight: Option<JoinHandle<Detection>> = None;
        let mut samples_taken = 0u32;
        let mut samples_skipped = 0u32;
        let mut failures = 0u32;

        let reason = loop {
            let busy = in_flight.is_some();

            // Biased: on a tie the countdown is handled before a result, so "whichever
            // occurs first" has a fixed answer.
            tokio::select! {
                biased;

                _ = stop.wait() => {
                    break FinishReason::Stopped;
                }
                _ = countdown.tick() => {
                    if let Some(reason) = session.tick() {
                        break reason;
                    }
                    on_event(SessionEvent::Tick(session.snapshot())).await;
                }
                detection = join_in_flight(&mut in_flight), if busy => {
                    in_flight = None;
                    let strike = match detection {
                        Detection::Label(s) => s,
                        Detection::Failed => {
                            failures += 1;
                            Strike::None
                        }
                    };
                    let finished = session.record(strike);
                    if strike.is_strike() {
                        on_event(SessionEvent::Strike { strike, snapshot: session.snapshot() }).await;
                    }
                    if let Some(reason) = finished {
                        break reason;
                    }
                }
                _ = sampler.tick() => {
                    if busy {
                        samples_skipped += 1;
                        log::debug!("classification still in flight; skipping sample");
                        on_event(SessionEvent::SampleSkipped).await;
                    } else {
                        samples_taken += 1;
                        in_flight = Some(tokio::spawn(detect_once(
                            self.frames.clone(),
                            self.classifier.clone(),
                        )));
                    }
                }
            }
        };

        if in_flight.take().is_some() {
            log::debug!("session ended with a classification in flight; its result is discarded");
        }

        let tally = session.tally();
        let remaining_secs = session.remaining_secs();
        if reason == FinishReason::Stopped {
            session.stop();
        }

        let new_best = match record_score(self.store.as_ref(), tally.total()) {
            Ok(v) => v,
            Err(e) => {
                log::error!("failed to persist best score: {e:#}");
                false
            }
        };

        let outcome = SessionOutcome {
            id: session.id(),
            reason,
            punches: tally.punches,
            kicks: tally.kicks,
            duration_secs: self.cfg.duration_secs,
            remaining_secs,
            elapsed_ms: ms(started.elapsed()),
            samples_taken,
            samples_skipped,
            classification_failures: failures,
            new_best,
        };

        log::info!(
            "session {} finished ({}): punches={} kicks={} new_best={}",
            outcome.id,
            reason.as_str(),
            outcome.punches,
            outcome.kicks,
            new_best
        );
        on_event(SessionEvent::Finished(outcome.clone())).await;

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_degenerate_configs() {
        let zero_duration = SessionConfig {
            duration_secs: 0,
            ..Default::default()
        };
        assert!(zero_duration.validate().is_err());

        let zero_goal = SessionConfig {
            goal: Some(Goal::kicks(0)),
            ..Default::default()
        };
        assert!(zero_goal.validate().is_err());

        let fast = SessionConfig {
            capture_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(fast.validate().is_err());
    }

    #[test]
    fn builds_from_app_defaults() {
        let cfg = SessionConfig::from_defaults(&SessionDefaults {
            duration_secs: 60,
            capture_interval_ms: 250,
            goal: Some(Goal::kicks(5)),
        })
        .unwrap();
        assert_eq!(cfg.capture_interval, Duration::from_millis(250));
        assert_eq!(cfg.tick_interval, Duration::from_secs(1));
        assert_eq!(cfg.goal, Some(Goal::kicks(5)));
    }

    #[tokio::test]
    async fn stop_signal_fires_once_and_never_blocks() {
        let (mut handle, mut signal) = StopSignal::pair();
        handle.stop();
        handle.stop();
        signal.wait().await;
        assert!(signal.0.is_none());

        let mut never = StopSignal::never();
        let waited = tokio::time::timeout(Duration::from_millis(10), never.wait()).await;
        assert!(waited.is_err());
    }
}
