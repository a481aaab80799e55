use crate::image::InlineImage;
use crate::request::HttpRequest;
use anyhow::Context;
use serde_json::{Value, json};
use url::Url;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Clone, PartialEq, Eq)]
pub struct GeminiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

fn generate_content_url(cfg: &GeminiConfig) -> anyhow::Result<String> {
    let base = Url::parse(cfg.base_url.trim())
        .with_context(|| format!("invalid Gemini base URL: {}", cfg.base_url))?;
    let model = cfg.model.trim().trim_start_matches("models/");
    Ok(format!(
        "{}/models/{}:generateContent",
        base.as_str().trim_end_matches('/'),
        model
    ))
}

fn build(cfg: &GeminiConfig, payload: Value) -> anyhow::Result<HttpRequest> {
    let url = generate_content_url(cfg)?;
    Ok(HttpRequest::post_json(
        url,
        vec![("x-goog-api-key".into(), cfg.api_key.clone())],
        &payload,
    ))
}

/// Vision request constrained to `{"strike": "punch" | "kick" | "none"}` JSON output.
pub fn build_strike_classification_request(
    cfg: &GeminiConfig,
    instruction: &str,
    image: &InlineImage,
) -> anyhow::Result<HttpRequest> {
    let payload = json!({
        "contents": [{
            "role": "user",
            "parts": [
                {"text": instruction},
                {"inline_data": {"mime_type": image.mime_type, "data": image.base64}},
            ],
        }],
        "generationConfig": {
            "temperature": 0.0,
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "OBJECT",
                "properties": {
                    "strike": {"type": "STRING", "enum": ["punch", "kick", "none"]},
                },
                "required": ["strike"],
            },
        },
    });
    build(cfg, payload)
}

pub fn build_text_request(
    cfg: &GeminiConfig,
    system_message: &str,
    user_message: &str,
) -> anyhow::Result<HttpRequest> {
    let payload = json!({
        "systemInstruction": {"parts": [{"text": system_message}]},
        "contents": [{"role": "user", "parts": [{"text": user_message}]}],
        "generationConfig": {"temperature": 0.3},
    });
    build(cfg, payload)
}
