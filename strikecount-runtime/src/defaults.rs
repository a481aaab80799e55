use strikecount_core::config::{
    AppConfig, ClassifierKind, ClassifierSettings, CoachSettings, SessionDefaults,
};
use strikecount_providers::gemini::DEFAULT_GEMINI_BASE_URL;

pub const DEFAULT_VISION_MODEL: &str = "gemini-1.5-flash";

pub fn default_classifier_settings() -> ClassifierSettings {
    ClassifierSettings {
        provider: ClassifierKind::Gemini,
        base_url: DEFAULT_GEMINI_BASE_URL.into(),
        model: DEFAULT_VISION_MODEL.into(),
        timeout_secs: 10,
    }
}

pub fn default_coach_settings() -> CoachSettings {
    CoachSettings {
        provider: ClassifierKind::Gemini,
        base_url: DEFAULT_GEMINI_BASE_URL.into(),
        model: DEFAULT_VISION_MODEL.into(),
    }
}

pub fn default_app_config() -> AppConfig {
    AppConfig {
        session: SessionDefaults::default(),
        classifier: default_classifier_settings(),
        coach: default_coach_settings(),
        api_key_present: false,
    }
}
