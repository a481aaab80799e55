use std::sync::Arc;

use strikecount_core::config::{AppConfig, ClassifierSettings};
use strikecount_engine::engine::{EngineError, SessionConfig, StrikeEngine};
use strikecount_engine::traits::{FrameSource, KeyValueStore, StrikeClassifier};

use crate::classifier::VisionStrikeClassifier;
use crate::secrets::{SecretKey, get_secret};

/// Build a runnable engine from config, reading the vision API key from the OS keyring.
pub fn build_engine_from_config(
    cfg: &AppConfig,
    frames: Arc<dyn FrameSource>,
    store: Arc<dyn KeyValueStore>,
) -> anyhow::Result<StrikeEngine> {
    let api_key = get_secret(SecretKey::VisionApiKey)?.unwrap_or_default();
    Ok(build_engine_with_key(cfg, &api_key, frames, store)?)
}

/// Same as `build_engine_from_config` with an explicit key (CLI, tests).
pub fn build_engine_with_key(
    cfg: &AppConfig,
    api_key: &str,
    frames: Arc<dyn FrameSource>,
    store: Arc<dyn KeyValueStore>,
) -> Result<StrikeEngine, EngineError> {
    validate_classifier(&cfg.classifier)?;
    let session = SessionConfig::from_defaults(&cfg.session)?;

    if api_key.trim().is_empty() {
        log::warn!(
            "no API key configured for {}; requests will be unauthenticated",
            cfg.classifier.provider.as_str()
        );
    }

    let classifier: Arc<dyn StrikeClassifier> =
        Arc::new(VisionStrikeClassifier::new(cfg.classifier.clone(), api_key));

    StrikeEngine::new(session, classifier, frames, store)
}

fn validate_classifier(settings: &ClassifierSettings) -> Result<(), EngineError> {
    let url = settings.base_url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(EngineError::InvalidConfig(format!(
            "classifier base URL must be http(s): {url:?}"
        )));
    }
    if settings.model.trim().is_empty() {
        return Err(EngineError::InvalidConfig("classifier model is empty".into()));
    }
    Ok(())
}
