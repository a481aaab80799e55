use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use strikecount_core::config::ClassifierKind;
use strikecount_core::types::Goal;
use strikecount_engine::engine::{SessionEvent, StopSignal};
use strikecount_engine::traits::KeyValueStore;
use strikecount_runtime::defaults::default_app_config;
use strikecount_runtime::frames::DirectoryFrameSource;
use strikecount_runtime::kv_store::{JsonFileStore, MemoryStore};
use strikecount_runtime::runtime_engine::build_engine_with_key;

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str) -> anyhow::Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    env_opt(name)
        .map(|v| {
            v.trim()
                .parse::<T>()
                .map_err(|e| anyhow::anyhow!("invalid {name}={v:?}: {e}"))
        })
        .transpose()
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::Started(s) => match s.goal {
            Some(g) => println!(
                "started: {}s, goal {} {:?}",
                s.remaining_secs, g.count, g.target
            ),
            None => println!("started: {}s", s.remaining_secs),
        },
        SessionEvent::Tick(s) => {
            println!("{:>3}s  punches={} kicks={}", s.remaining_secs, s.punches, s.kicks)
        }
        SessionEvent::Strike { strike, snapshot } => println!(
            "  {}!  punches={} kicks={}",
            strike.as_str(),
            snapshot.punches,
            snapshot.kicks
        ),
        SessionEvent::SampleSkipped => {}
        SessionEvent::Finished(o) => println!(
            "finished ({}): punches={} kicks={} score={}{}",
            o.reason.as_str(),
            o.punches,
            o.kicks,
            o.score(),
            if o.new_best { "  NEW BEST" } else { "" }
        ),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Runs one session over a directory of still frames (e.g. extracted from a recording).
    let frames_dir: PathBuf = env_opt("STRIKE_FRAMES_DIR")
        .context("set STRIKE_FRAMES_DIR to a directory of frame images")?
        .into();
    let api_key = env_opt("STRIKE_API_KEY").unwrap_or_default();

    let mut cfg = default_app_config();
    if let Some(p) = env_opt("STRIKE_PROVIDER") {
        cfg.classifier.provider = match p.trim() {
            "gemini" => ClassifierKind::Gemini,
            "openai-compatible" | "openai" => ClassifierKind::OpenaiCompatible,
            other => anyhow::bail!("unsupported STRIKE_PROVIDER: {other}"),
        };
        if cfg.classifier.provider == ClassifierKind::OpenaiCompatible {
            cfg.classifier.base_url = "http://localhost:11434/v1".into();
        }
    }
    if let Some(url) = env_opt("STRIKE_BASE_URL") {
        cfg.classifier.base_url = url;
    }
    if let Some(model) = env_opt("STRIKE_MODEL") {
        cfg.classifier.model = model;
    }
    if let Some(d) = env_parse::<u32>("STRIKE_DURATION_SECS")? {
        cfg.session.duration_secs = d;
    }
    if let Some(ms) = env_parse::<u64>("STRIKE_INTERVAL_MS")? {
        cfg.session.capture_interval_ms = ms;
    }
    cfg.session.goal = env_parse::<Goal>("STRIKE_GOAL")?;
    let stride = env_parse::<usize>("STRIKE_STRIDE")?.unwrap_or(1);

    let store: Arc<dyn KeyValueStore> = match env_opt("STRIKE_DATA_DIR") {
        Some(dir) => Arc::new(JsonFileStore::open(PathBuf::from(dir).join("store.json"))?),
        None => Arc::new(MemoryStore::default()),
    };
    let frames = Arc::new(DirectoryFrameSource::new(frames_dir).with_stride(stride));

    let engine = build_engine_with_key(&cfg, &api_key, frames, store)?;
    log::info!(
        "classifier: {} {} at {}",
        cfg.classifier.provider.as_str(),
        cfg.classifier.model,
        cfg.classifier.base_url
    );

    let (mut stop, signal) = StopSignal::pair();
    let run = engine.run_session_with_hook(signal, |event| {
        print_event(&event);
        async {}
    });
    tokio::pin!(run);

    let outcome = tokio::select! {
        res = &mut run => res?,
        _ = tokio::signal::ctrl_c() => {
            stop.stop();
            run.await?
        }
    };

    println!(
        "samples: taken={} skipped={} failed={}  elapsed={}s",
        outcome.samples_taken,
        outcome.samples_skipped,
        outcome.classification_failures,
        outcome.elapsed_secs()
    );
    println!("best score: {}", engine.best_score()?);

    Ok(())
}
