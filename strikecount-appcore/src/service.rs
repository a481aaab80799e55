use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use strikecount_core::achievements::{Achievement, evaluate_achievements};
use strikecount_core::coach::StrikeStats;
use strikecount_core::config::AppConfig;
use strikecount_core::history::{DailyTotals, SessionRecord, daily_totals};
use strikecount_core::leaderboard::{LeaderboardRow, build_leaderboard};
use strikecount_core::profile::{ProfileError, UserProfile};
use strikecount_core::types::{
    CameraPermission, FinishReason, Goal, SessionId, SessionState, Strike,
};
use strikecount_engine::engine::{EngineError, SessionEvent, StopHandle, StopSignal, StrikeEngine};
use strikecount_engine::records::{
    load_best_score, load_leaderboard_entry, load_profile, save_profile,
};
use strikecount_engine::session::{SessionOutcome, SessionSnapshot};
use strikecount_engine::traits::{FrameSample, FrameSource, KeyValueStore, StrikeClassifier};
use strikecount_runtime::classifier::VisionStrikeClassifier;
use strikecount_runtime::coach::{LlmCoach, suggest_drills, summarize_session};
use strikecount_runtime::config_store::ConfigStore;
use strikecount_runtime::history::HistoryStore;
use strikecount_runtime::ipc::{SessionStatus, StartSessionRequest};
use strikecount_runtime::kv_store::JsonFileStore;
use strikecount_runtime::runtime_engine::build_engine_with_key;
use strikecount_runtime::secrets::{
    SecretKey, coach_api_key, delete_secret, get_secret, set_secret,
};
use thiserror::Error;
use tokio::sync::{oneshot, watch};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error("no finished session yet")]
    NoSession,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeys {
    pub vision: String,
    pub coach: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyStatus {
    pub vision: bool,
    pub coach: bool,
}

enum KeySource {
    Keyring,
    // CLI and tests: never touch the OS keyring.
    InMemory(Mutex<ApiKeys>),
}

/// The current (or most recent) session. Stays in the slot after it ends so that
/// concurrent stop/wait callers all observe the same run.
struct ActiveSession {
    stop: StopHandle,
    // `None` until the run has finished and its history entry is written.
    done: watch::Receiver<Option<SessionOutcome>>,
}

impl ActiveSession {
    fn is_running(&self) -> bool {
        // A dropped sender without an outcome means the task died; treat as not running.
        self.done.borrow().is_none() && self.done.has_changed().is_ok()
    }
}

#[derive(Clone)]
pub struct AppService {
    config_store: ConfigStore,
    store: Arc<dyn KeyValueStore>,
    history: HistoryStore,
    frames: Arc<dyn FrameSource>,
    keys: Arc<KeySource>,
    camera: Arc<Mutex<CameraPermission>>,
    snapshot_tx: Arc<watch::Sender<SessionSnapshot>>,
    active: Arc<tokio::sync::Mutex<Option<ActiveSession>>>,
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .try_into()
        .unwrap_or(i64::MAX)
}

impl AppService {
    /// Opens the app data directory (`config.json`, `store.json`, `history.json`).
    pub fn new(data_dir: &Path, frames: Arc<dyn FrameSource>) -> anyhow::Result<Self> {
        Self::build(data_dir, frames, KeySource::Keyring)
    }

    pub fn with_api_keys(
        data_dir: &Path,
        frames: Arc<dyn FrameSource>,
        keys: ApiKeys,
    ) -> anyhow::Result<Self> {
        Self::build(data_dir, frames, KeySource::InMemory(Mutex::new(keys)))
    }

    fn build(data_dir: &Path, frames: Arc<dyn FrameSource>, keys: KeySource) -> anyhow::Result<Self> {
        let config_store = ConfigStore::at_path(data_dir.join("config.json"));
        let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::open(data_dir.join("store.json"))?);
        let history = HistoryStore::at_path(data_dir.join("history.json"));

        let cfg = config_store.load_or_default()?;
        let (snapshot_tx, _) = watch::channel(SessionSnapshot::idle(
            cfg.session.duration_secs,
            cfg.session.goal,
        ));

        Ok(Self {
            config_store,
            store,
            history,
            frames,
            keys: Arc::new(keys),
            camera: Arc::new(Mutex::new(CameraPermission::Unknown)),
            snapshot_tx: Arc::new(snapshot_tx),
            active: Arc::new(tokio::sync::Mutex::new(None)),
        })
    }

    pub fn data_dir(&self) -> PathBuf {
        self.config_store
            .path()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn load_config(&self) -> anyhow::Result<AppConfig> {
        self.config_store.load_or_default()
    }

    pub fn save_config(&self, cfg: &AppConfig) -> anyhow::Result<()> {
        let mut cfg = cfg.clone();
        cfg.api_key_present = self.api_key_status()?.vision;
        self.config_store.save(&cfg)
    }

    fn get_key(&self, key: SecretKey) -> anyhow::Result<Option<String>> {
        match self.keys.as_ref() {
            KeySource::Keyring => match key {
                SecretKey::VisionApiKey => get_secret(key),
                SecretKey::CoachApiKey => coach_api_key(),
            },
            KeySource::InMemory(keys) => {
                let keys = keys.lock().map_err(|_| anyhow::anyhow!("key lock poisoned"))?;
                let value = match key {
                    SecretKey::VisionApiKey => &keys.vision,
                    SecretKey::CoachApiKey if keys.coach.is_empty() => &keys.vision,
                    SecretKey::CoachApiKey => &keys.coach,
                };
                Ok(Some(value.clone()).filter(|v| !v.is_empty()))
            }
        }
    }

    fn set_key(&self, key: SecretKey, value: &str) -> anyhow::Result<()> {
        match self.keys.as_ref() {
            KeySource::Keyring => set_secret(key, value),
            KeySource::InMemory(keys) => {
                let mut keys = keys.lock().map_err(|_| anyhow::anyhow!("key lock poisoned"))?;
                match key {
                    SecretKey::VisionApiKey => keys.vision = value.to_string(),
                    SecretKey::CoachApiKey => keys.coach = value.to_string(),
                }
                Ok(())
            }
        }
    }

    pub fn set_vision_api_key(&self, value: &str) -> anyhow::Result<()> {
        self.set_key(SecretKey::VisionApiKey, value)
    }

    pub fn set_coach_api_key(&self, value: &str) -> anyhow::Result<()> {
        self.set_key(SecretKey::CoachApiKey, value)
    }

    pub fn api_key_status(&self) -> anyhow::Result<ApiKeyStatus> {
        Ok(ApiKeyStatus {
            vision: self.get_key(SecretKey::VisionApiKey)?.is_some(),
            coach: self.get_key(SecretKey::CoachApiKey)?.is_some(),
        })
    }

    pub fn clear_api_keys(&self) -> anyhow::Result<()> {
        match self.keys.as_ref() {
            KeySource::Keyring => {
                delete_secret(SecretKey::VisionApiKey)?;
                delete_secret(SecretKey::CoachApiKey)?;
            }
            KeySource::InMemory(keys) => {
                *keys.lock().map_err(|_| anyhow::anyhow!("key lock poisoned"))? = ApiKeys::default();
            }
        }
        Ok(())
    }

    pub fn camera_status(&self) -> CameraPermission {
        self.camera.lock().map(|c| *c).unwrap_or_default()
    }

    fn set_camera(&self, status: CameraPermission) {
        if let Ok(mut c) = self.camera.lock() {
            *c = status;
        }
    }

    /// Live session state for UI consumers.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn best_score(&self) -> anyhow::Result<u32> {
        load_best_score(self.store.as_ref())
    }

    pub fn status(&self) -> anyhow::Result<SessionStatus> {
        Ok(SessionStatus {
            snapshot: self.snapshot_tx.borrow().clone(),
            camera: self.camera_status(),
            best_score: self.best_score()?,
        })
    }

    fn build_engine(&self, req: &StartSessionRequest) -> Result<StrikeEngine, ServiceError> {
        let mut cfg = self.config_store.load_or_default()?;
        if let Some(d) = req.duration_secs {
            cfg.session.duration_secs = d;
        }
        if req.goal.is_some() {
            cfg.session.goal = req.goal;
        }
        let key = self.get_key(SecretKey::VisionApiKey)?.unwrap_or_default();
        Ok(build_engine_with_key(
            &cfg,
            &key,
            self.frames.clone(),
            self.store.clone(),
        )?)
    }

    /// Starts a session in the background and returns once the camera is acquired.
    ///
    /// Camera failure is reported here and leaves the camera status `Denied`.
    pub async fn start_session(&self, req: StartSessionRequest) -> Result<SessionId, ServiceError> {
        let mut active = self.active.lock().await;
        if active.as_ref().is_some_and(ActiveSession::is_running) {
            return Err(EngineError::AlreadyRunning.into());
        }

        let engine = self.build_engine(&req)?;
        let goal = engine.config().goal;
        let duration_secs = engine.config().duration_secs;
        let (stop, signal) = StopSignal::pair();
        let (started_tx, started_rx) = oneshot::channel::<SessionId>();

        let (done_tx, done_rx) = watch::channel(None);

        let tx = self.snapshot_tx.clone();
        let history = self.history.clone();
        let task = tokio::spawn(async move {
            let started_tx = Mutex::new(Some(started_tx));
            let res = engine
                .run_session_with_hook(signal, |event| {
                    publish(&tx, &started_tx, event, goal, duration_secs);
                    async {}
                })
                .await;

            if let Ok(outcome) = &res {
                append_history(&history, outcome);
                done_tx.send_replace(Some(outcome.clone()));
            }
            res
        });

        match started_rx.await {
            Ok(id) => {
                self.set_camera(CameraPermission::Granted);
                // Detached: completion is observed through `done`.
                drop(task);
                *active = Some(ActiveSession {
                    stop,
                    done: done_rx,
                });
                Ok(id)
            }
            Err(_) => {
                // The run ended before emitting `Started`: it was refused.
                let res = task
                    .await
                    .map_err(|e| anyhow::anyhow!("session task failed: {e}"))?;
                match res {
                    Err(EngineError::CameraUnavailable(msg)) => {
                        log::warn!("camera unavailable: {msg}");
                        self.set_camera(CameraPermission::Denied);
                        Err(EngineError::CameraUnavailable(msg).into())
                    }
                    Err(e) => Err(e.into()),
                    Ok(_) => Err(anyhow::anyhow!("session ended before it started").into()),
                }
            }
        }
    }

    pub async fn is_running(&self) -> bool {
        self.active
            .lock()
            .await
            .as_ref()
            .is_some_and(ActiveSession::is_running)
    }

    /// Stops the running session. Returns its outcome, or `None` if nothing was running.
    pub async fn stop_session(&self) -> Result<Option<SessionOutcome>, ServiceError> {
        let done = {
            let mut active = self.active.lock().await;
            match active.as_mut() {
                Some(session) if session.is_running() => {
                    session.stop.stop();
                    session.done.clone()
                }
                _ => return Ok(None),
            }
        };
        await_outcome(done).await.map(Some)
    }

    /// Waits for the current session to end on its own (timer or goal) and returns its
    /// outcome. Returns the last outcome if it already ended, `None` if none was started.
    pub async fn wait_for_finish(&self) -> Result<Option<SessionOutcome>, ServiceError> {
        let done = match self.active.lock().await.as_ref() {
            Some(session) => session.done.clone(),
            None => return Ok(None),
        };
        await_outcome(done).await.map(Some)
    }

    pub fn get_profile(&self) -> anyhow::Result<Option<UserProfile>> {
        load_profile(self.store.as_ref())
    }

    pub fn save_profile(
        &self,
        name: &str,
        instagram: Option<&str>,
    ) -> Result<UserProfile, ServiceError> {
        let profile = UserProfile::new(name, instagram)?;
        save_profile(self.store.as_ref(), &profile)?;
        Ok(profile)
    }

    pub fn leaderboard(&self) -> anyhow::Result<Vec<LeaderboardRow>> {
        let you = load_leaderboard_entry(self.store.as_ref())?;
        Ok(build_leaderboard(you.as_ref()))
    }

    pub fn history(&self) -> anyhow::Result<Vec<SessionRecord>> {
        self.history.load()
    }

    pub fn achievements(&self) -> anyhow::Result<Vec<Achievement>> {
        let records = self.history.load()?;
        Ok(evaluate_achievements(&records, self.best_score()?))
    }

    /// Per-day punch/kick totals for the last `days` days, oldest first.
    pub fn history_chart(&self, days: u32) -> anyhow::Result<Vec<DailyTotals>> {
        let records = self.history.load()?;
        Ok(daily_totals(&records, now_ms(), days))
    }

    fn coach(&self) -> anyhow::Result<LlmCoach> {
        let cfg = self.config_store.load_or_default()?;
        let key = self.get_key(SecretKey::CoachApiKey)?.unwrap_or_default();
        Ok(LlmCoach::new(cfg.coach, key))
    }

    pub async fn summarize_last_session(&self, user_goals: &str) -> Result<String, ServiceError> {
        let record = self.history.last()?.ok_or(ServiceError::NoSession)?;
        let coach = self.coach()?;
        Ok(summarize_session(&coach, &record, user_goals).await?)
    }

    pub async fn suggest_drills(&self) -> Result<Vec<String>, ServiceError> {
        let record = self.history.last()?.ok_or(ServiceError::NoSession)?;
        let coach = self.coach()?;
        let stats = StrikeStats::from_counts(record.punches, record.kicks);
        Ok(suggest_drills(&coach, &stats).await?)
    }

    /// Classifies a single frame on demand. Unlike the session loop, failures are returned.
    pub async fn analyze_frame(&self, bytes: Vec<u8>) -> Result<Strike, ServiceError> {
        let cfg = self.config_store.load_or_default()?;
        let key = self.get_key(SecretKey::VisionApiKey)?.unwrap_or_default();
        let classifier = VisionStrikeClassifier::new(cfg.classifier, key);
        Ok(classifier.classify(&FrameSample::new(bytes)).await?)
    }
}

fn publish(
    tx: &watch::Sender<SessionSnapshot>,
    started_tx: &Mutex<Option<oneshot::Sender<SessionId>>>,
    event: SessionEvent,
    goal: Option<Goal>,
    duration_secs: u32,
) {
    match event {
        SessionEvent::Started(snap) => {
            if let Some(t) = started_tx.lock().ok().and_then(|mut g| g.take()) {
                let _ = t.send(snap.id);
            }
            tx.send_replace(snap);
        }
        SessionEvent::Tick(snap) | SessionEvent::Strike { snapshot: snap, .. } => {
            tx.send_replace(snap);
        }
        SessionEvent::SampleSkipped => {}
        SessionEvent::Finished(outcome) => {
            let snap = if outcome.reason == FinishReason::Stopped {
                SessionSnapshot {
                    id: outcome.id,
                    ..SessionSnapshot::idle(duration_secs, goal)
                }
            } else {
                SessionSnapshot {
                    id: outcome.id,
                    state: SessionState::Finished,
                    remaining_secs: outcome.remaining_secs,
                    punches: outcome.punches,
                    kicks: outcome.kicks,
                    goal,
                }
            };
            tx.send_replace(snap);
        }
    }
}

fn append_history(history: &HistoryStore, outcome: &SessionOutcome) {
    let record = SessionRecord {
        ts_unix_ms: now_ms(),
        punches: outcome.punches,
        kicks: outcome.kicks,
        duration_secs: outcome.duration_secs,
        elapsed_secs: outcome.elapsed_secs(),
        reason: outcome.reason,
    };
    if let Err(e) = history.append(record) {
        log::error!("failed to append session history: {e:#}");
    }
}

async fn await_outcome(
    mut done: watch::Receiver<Option<SessionOutcome>>,
) -> Result<SessionOutcome, ServiceError> {
    let outcome = {
        let seen = done
            .wait_for(Option::is_some)
            .await
            .map_err(|_| anyhow::anyhow!("session task ended without an outcome"))?;
        (*seen).clone()
    };
    outcome.ok_or_else(|| anyhow::anyhow!("session task ended without an outcome").into())
}
