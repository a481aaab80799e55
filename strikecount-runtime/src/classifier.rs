use strikecount_core::coach::STRIKE_DETECTION_PROMPT;
use strikecount_core::config::{ClassifierKind, ClassifierSettings};
use strikecount_core::types::Strike;
use strikecount_engine::traits::{FrameSample, StrikeClassifier};
use strikecount_providers::gemini::{GeminiConfig, build_strike_classification_request};
use strikecount_providers::image::InlineImage;
use strikecount_providers::openai_compatible::{
    OpenAiCompatibleConfig, build_vision_classification_request,
};
use strikecount_providers::parse::{
    parse_gemini_generate_content, parse_openai_chat_completion, parse_strike_label,
};
use strikecount_providers::runtime::{HttpTimeouts, execute_with};

/// Vision-model strike classifier. Dispatches on the configured provider.
#[derive(Clone)]
pub struct VisionStrikeClassifier {
    settings: ClassifierSettings,
    api_key: String,
}

impl std::fmt::Debug for VisionStrikeClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionStrikeClassifier")
            .field("settings", &self.settings)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl VisionStrikeClassifier {
    pub fn new(settings: ClassifierSettings, api_key: impl Into<String>) -> Self {
        Self {
            settings,
            api_key: api_key.into(),
        }
    }

    pub fn provider(&self) -> ClassifierKind {
        self.settings.provider
    }
}

#[async_trait::async_trait]
impl StrikeClassifier for VisionStrikeClassifier {
    async fn classify(&self, frame: &FrameSample) -> anyhow::Result<Strike> {
        let image = InlineImage::encode(&frame.bytes)?;
        let timeouts = HttpTimeouts::total_secs(self.settings.timeout_secs);
        let provider = self.settings.provider.as_str();

        let text = match self.settings.provider {
            ClassifierKind::Gemini => {
                let cfg = GeminiConfig {
                    base_url: self.settings.base_url.clone(),
                    api_key: self.api_key.clone(),
                    model: self.settings.model.clone(),
                };
                let req = build_strike_classification_request(&cfg, STRIKE_DETECTION_PROMPT, &image)?;
                let body = execute_with(&req, timeouts).await?.into_success_body(provider)?;
                parse_gemini_generate_content(&body)?
            }
            ClassifierKind::OpenaiCompatible => {
                let cfg = OpenAiCompatibleConfig {
                    base_url: self.settings.base_url.clone(),
                    api_key: self.api_key.clone(),
                    model: self.settings.model.clone(),
                };
                let req = build_vision_classification_request(&cfg, STRIKE_DETECTION_PROMPT, &image);
                let body = execute_with(&req, timeouts).await?.into_success_body(provider)?;
                parse_openai_chat_completion(&body)?
            }
        };

        let strike = parse_strike_label(&text)?;
        log::debug!("{provider} labelled frame as {}", strike.as_str());
        Ok(strike)
    }
}
