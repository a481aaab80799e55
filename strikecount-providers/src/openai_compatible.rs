use crate::image::InlineImage;
use crate::request::HttpRequest;
use serde_json::json;

#[derive(Clone, PartialEq, Eq)]
pub struct OpenAiCompatibleConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl std::fmt::Debug for OpenAiCompatibleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

fn auth_headers(cfg: &OpenAiCompatibleConfig) -> Vec<(String, String)> {
    if cfg.api_key.trim().is_empty() {
        // Local OpenAI-compatible servers (e.g. Ollama) accept unauthenticated requests.
        return vec![];
    }
    vec![("Authorization".into(), format!("Bearer {}", cfg.api_key))]
}

pub fn build_chat_completions_request(
    cfg: &OpenAiCompatibleConfig,
    messages: &[ChatMessage],
) -> HttpRequest {
    let url = join_url(&cfg.base_url, "/chat/completions");

    let payload = json!({
        "model": cfg.model,
        "messages": messages.iter().map(|m| json!({"role": m.role, "content": m.content})).collect::<Vec<_>>(),
        "temperature": 0.3,
    });

    HttpRequest::post_json(url, auth_headers(cfg), &payload)
}

/// Single-turn vision request: one user message with the instruction and the frame.
pub fn build_vision_classification_request(
    cfg: &OpenAiCompatibleConfig,
    instruction: &str,
    image: &InlineImage,
) -> HttpRequest {
    let url = join_url(&cfg.base_url, "/chat/completions");

    let payload = json!({
        "model": cfg.model,
        "messages": [{
            "role": "user",
            "content": [
                {"type": "text", "text": instruction},
                {"type": "image_url", "image_url": {"url": image.data_uri()}},
            ],
        }],
        "temperature": 0.0,
        "max_tokens": 16,
    });

    HttpRequest::post_json(url, auth_headers(cfg), &payload)
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{}/{}", base, path)
}
