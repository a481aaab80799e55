use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use strikecount_core::types::{FinishReason, Goal, SessionState, Strike};
use strikecount_engine::engine::{
    EngineError, SessionConfig, SessionEvent, StopSignal, StrikeEngine,
};
use strikecount_engine::records::{TOP_SCORE_KEY, load_best_score};
use strikecount_engine::traits::{FrameSample, FrameSource, KeyValueStore, StrikeClassifier};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];

struct StaticFrames;

#[async_trait::async_trait]
impl FrameSource for StaticFrames {
    async fn open(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn capture(&self) -> anyhow::Result<FrameSample> {
        Ok(FrameSample::new(JPEG.to_vec()))
    }
}

struct DeniedCamera;

#[async_trait::async_trait]
impl FrameSource for DeniedCamera {
    async fn open(&self) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("NotAllowedError: permission denied"))
    }

    async fn capture(&self) -> anyhow::Result<FrameSample> {
        unreachable!("capture without open")
    }
}

#[derive(Default)]
struct MemStore(Mutex<HashMap<String, String>>);

impl KeyValueStore for MemStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.0.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.0.lock().unwrap().insert(key.into(), value.into());
        Ok(())
    }
}

/// Answers call `n` (1-based) with `script(n)` after `delay`.
struct ScriptedClassifier {
    script: Box<dyn Fn(usize) -> anyhow::Result<Strike> + Send + Sync>,
    delay: Duration,
    calls: AtomicUsize,
    completed: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedClassifier {
    fn new(
        delay: Duration,
        script: impl Fn(usize) -> anyhow::Result<Strike> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Box::new(script),
            delay,
            calls: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }
}

#[async_trait::async_trait]
impl StrikeClassifier for ScriptedClassifier {
    async fn classify(&self, frame: &FrameSample) -> anyhow::Result<Strike> {
        assert_eq!(frame.bytes, JPEG);
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
        (self.script)(n)
    }
}

fn engine(
    cfg: SessionConfig,
    classifier: Arc<ScriptedClassifier>,
    store: Arc<MemStore>,
) -> StrikeEngine {
    StrikeEngine::new(cfg, classifier, Arc::new(StaticFrames), store).unwrap()
}

fn timed(duration_secs: u32) -> SessionConfig {
    SessionConfig {
        duration_secs,
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn thirty_second_session_counts_scripted_strikes() {
    let classifier = ScriptedClassifier::new(Duration::ZERO, |n| {
        Ok(match n {
            2 | 4 | 6 => Strike::Punch,
            8 => Strike::Kick,
            _ => Strike::None,
        })
    });
    let store = Arc::new(MemStore::default());
    let engine = engine(timed(30), classifier.clone(), store.clone());

    let events = Arc::new(Mutex::new(Vec::new()));
    let out = engine
        .run_session_with_hook(StopSignal::never(), |ev| {
            let events = events.clone();
            async move { events.lock().unwrap().push(ev) }
        })
        .await
        .unwrap();

    assert_eq!(out.reason, FinishReason::TimerExpired);
    assert_eq!((out.punches, out.kicks), (3, 1));
    assert_eq!(out.remaining_secs, 0);
    assert_eq!(out.elapsed_ms, 30_000);
    assert_eq!(out.samples_taken, 59);
    assert_eq!(out.samples_skipped, 0);
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 59);
    assert!(out.new_best);
    assert_eq!(load_best_score(store.as_ref()).unwrap(), 4);

    let events = events.lock().unwrap();
    match events.first() {
        Some(SessionEvent::Started(s)) => {
            assert_eq!(s.state, SessionState::Running);
            assert_eq!(s.remaining_secs, 30);
            assert_eq!((s.punches, s.kicks), (0, 0));
        }
        other => panic!("expected Started, got {other:?}"),
    }
    let strikes = events
        .iter()
        .filter(|e| matches!(e, SessionEvent::Strike { .. }))
        .count();
    assert_eq!(strikes, 4);
    let ticks: Vec<u32> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Tick(s) => Some(s.remaining_secs),
            _ => None,
        })
        .collect();
    assert_eq!(ticks.len(), 29);
    assert!(ticks.windows(2).all(|w| w[0] > w[1]));
    assert!(matches!(events.last(), Some(SessionEvent::Finished(o)) if o.id == out.id));
}

#[tokio::test(start_paused = true)]
async fn goal_mode_finishes_on_fifth_kick() {
    let classifier = ScriptedClassifier::new(Duration::ZERO, |n| {
        Ok(if n <= 5 { Strike::Kick } else { Strike::Punch })
    });
    let cfg = SessionConfig {
        duration_secs: 60,
        goal: Some(Goal::kicks(5)),
        ..Default::default()
    };
    let engine = engine(cfg, classifier.clone(), Arc::new(MemStore::default()));

    let out = engine.run_session(StopSignal::never()).await.unwrap();

    assert_eq!(out.reason, FinishReason::GoalReached);
    assert_eq!(out.kicks, 5);
    assert_eq!(out.punches, 0);
    assert_eq!(out.remaining_secs, 58);
    assert_eq!(out.elapsed_ms, 2_500);
    assert_eq!(out.elapsed_secs(), 2);
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 5);
}

#[tokio::test(start_paused = true)]
async fn slow_classifier_never_overlaps_and_ticks_are_dropped() {
    let classifier =
        ScriptedClassifier::new(Duration::from_millis(1_200), |_| Ok(Strike::Punch));
    let engine = engine(timed(5), classifier.clone(), Arc::new(MemStore::default()));

    let out = engine.run_session(StopSignal::never()).await.unwrap();

    // Samples at 0.5s, 2.0s and 3.5s; everything in between lands on a busy slot.
    assert_eq!(out.samples_taken, 3);
    assert_eq!(out.samples_skipped, 6);
    assert_eq!(out.punches, 3);
    assert_eq!(classifier.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn result_arriving_after_finish_is_discarded_not_cancelled() {
    let classifier = ScriptedClassifier::new(Duration::from_millis(800), |_| Ok(Strike::Kick));
    let engine = engine(timed(1), classifier.clone(), Arc::new(MemStore::default()));

    let out = engine.run_session(StopSignal::never()).await.unwrap();
    assert_eq!(out.reason, FinishReason::TimerExpired);
    assert_eq!(out.kicks, 0);
    assert!(!out.new_best);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(classifier.completed.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn countdown_wins_when_goal_strike_lands_on_final_second() {
    // First sample at 0.5s; its kick resolves at exactly 1.0s, the countdown deadline.
    let classifier = ScriptedClassifier::new(Duration::from_millis(500), |_| Ok(Strike::Kick));
    let cfg = SessionConfig {
        duration_secs: 1,
        goal: Some(Goal::kicks(1)),
        ..Default::default()
    };
    let store = Arc::new(MemStore::default());
    let engine = engine(cfg, classifier.clone(), store.clone());

    let out = engine.run_session(StopSignal::never()).await.unwrap();

    assert_eq!(out.reason, FinishReason::TimerExpired);
    assert_eq!(out.kicks, 0);
    assert_eq!(out.remaining_secs, 0);
    assert_eq!(out.elapsed_ms, 1_000);
    assert!(!out.new_best);
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.get(TOP_SCORE_KEY).unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn classifier_failures_are_absorbed() {
    let classifier = ScriptedClassifier::new(Duration::ZERO, |n| {
        if n % 2 == 0 {
            Err(anyhow::anyhow!("503 from provider"))
        } else {
            Ok(Strike::Punch)
        }
    });
    let engine = engine(timed(3), classifier, Arc::new(MemStore::default()));

    let out = engine.run_session(StopSignal::never()).await.unwrap();

    assert_eq!(out.reason, FinishReason::TimerExpired);
    assert_eq!(out.samples_taken, 5);
    assert_eq!(out.classification_failures, 2);
    assert_eq!(out.punches, 3);
}

#[tokio::test(start_paused = true)]
async fn denied_camera_blocks_start() {
    let classifier = ScriptedClassifier::new(Duration::ZERO, |_| Ok(Strike::Punch));
    let engine = StrikeEngine::new(
        timed(30),
        classifier.clone(),
        Arc::new(DeniedCamera),
        Arc::new(MemStore::default()),
    )
    .unwrap();

    let err = engine.run_session(StopSignal::never()).await.unwrap_err();
    assert!(matches!(err, EngineError::CameraUnavailable(ref m) if m.contains("permission")));
    assert!(!engine.is_running());
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn second_concurrent_start_is_rejected() {
    let classifier = ScriptedClassifier::new(Duration::ZERO, |_| Ok(Strike::None));
    let engine = engine(timed(2), classifier, Arc::new(MemStore::default()));

    let (first, second) = tokio::join!(engine.run_session(StopSignal::never()), async {
        tokio::task::yield_now().await;
        engine.run_session(StopSignal::never()).await
    });

    assert!(first.is_ok());
    assert!(matches!(second, Err(EngineError::AlreadyRunning)));
    assert!(!engine.is_running());
}

#[tokio::test(start_paused = true)]
async fn stop_ends_session_and_still_records_best() {
    let classifier = ScriptedClassifier::new(Duration::ZERO, |_| Ok(Strike::Punch));
    let store = Arc::new(MemStore::default());
    let engine = engine(timed(30), classifier, store.clone());

    let (mut handle, signal) = StopSignal::pair();
    let (out, ()) = tokio::join!(engine.run_session(signal), async {
        tokio::time::sleep(Duration::from_millis(3_200)).await;
        handle.stop();
    });
    let out = out.unwrap();

    assert_eq!(out.reason, FinishReason::Stopped);
    assert_eq!(out.punches, 6);
    assert_eq!(out.remaining_secs, 27);
    assert!(out.new_best);
    assert_eq!(store.get(TOP_SCORE_KEY).unwrap().as_deref(), Some("6"));
}

#[tokio::test(start_paused = true)]
async fn best_score_needs_strict_improvement_and_restart_resets_counts() {
    let store = Arc::new(MemStore::default());
    store.set(TOP_SCORE_KEY, "3").unwrap();

    let script = |n: usize| {
        Ok(match n % 59 {
            2 | 4 | 6 => Strike::Punch,
            8 => Strike::Kick,
            _ => Strike::None,
        })
    };
    let classifier = ScriptedClassifier::new(Duration::ZERO, script);
    let engine = engine(timed(30), classifier, store.clone());

    let first = engine.run_session(StopSignal::never()).await.unwrap();
    assert!(first.new_best);
    assert_eq!(first.score(), 4);

    let second = engine.run_session(StopSignal::never()).await.unwrap();
    assert_ne!(second.id, first.id);
    assert_eq!((second.punches, second.kicks), (3, 1));
    assert!(!second.new_best);
    assert_eq!(engine.best_score().unwrap(), 4);
}

struct OpenAiVisionClassifier {
    base_url: String,
}

#[async_trait::async_trait]
impl StrikeClassifier for OpenAiVisionClassifier {
    async fn classify(&self, frame: &FrameSample) -> anyhow::Result<Strike> {
        use strikecount_providers::openai_compatible::{
            OpenAiCompatibleConfig, build_vision_classification_request,
        };

        let cfg = OpenAiCompatibleConfig {
            base_url: self.base_url.clone(),
            api_key: "k".into(),
            model: "gpt-4o-mini".into(),
        };
        let image = strikecount_providers::image::InlineImage::encode(&frame.bytes)?;
        let req = build_vision_classification_request(
            &cfg,
            strikecount_core::coach::STRIKE_DETECTION_PROMPT,
            &image,
        );
        let resp = strikecount_providers::runtime::execute(&req).await?;
        let body = resp.into_success_body("openai-compatible")?;
        let text = strikecount_providers::parse::parse_openai_chat_completion(&body)?;
        strikecount_providers::parse::parse_strike_label(&text)
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn end_to_end_goal_session_against_mock_vision_endpoint() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"choices":[{"message":{"content":"Kick."}}]}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let cfg = SessionConfig {
        duration_secs: 100,
        tick_interval: Duration::from_millis(100),
        capture_interval: Duration::from_millis(20),
        goal: Some(Goal::kicks(2)),
    };
    let engine = StrikeEngine::new(
        cfg,
        Arc::new(OpenAiVisionClassifier {
            base_url: server.uri(),
        }),
        Arc::new(StaticFrames),
        Arc::new(MemStore::default()),
    )
    .unwrap();

    let out = engine.run_session(StopSignal::never()).await.unwrap();
    assert_eq!(out.reason, FinishReason::GoalReached);
    assert_eq!(out.kicks, 2);
    assert_eq!(out.punches, 0);
    assert_eq!(out.classification_failures, 0);
    assert!(out.remaining_secs > 0);
}
