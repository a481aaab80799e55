use crate::types::Goal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub session: SessionDefaults,
    pub classifier: ClassifierSettings,
    pub coach: CoachSettings,

    // Secrets are stored outside this struct at rest.
    #[serde(default)]
    pub api_key_present: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDefaults {
    pub duration_secs: u32,
    pub capture_interval_ms: u64,
    #[serde(default)]
    pub goal: Option<Goal>,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            duration_secs: 30,
            capture_interval_ms: 500,
            goal: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassifierKind {
    Gemini,
    OpenaiCompatible,
}

impl ClassifierKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ClassifierKind::Gemini => "gemini",
            ClassifierKind::OpenaiCompatible => "openai-compatible",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierSettings {
    pub provider: ClassifierKind,
    pub base_url: String,
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoachSettings {
    pub provider: ClassifierKind,
    pub base_url: String,
    pub model: String,
}
