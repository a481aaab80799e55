use anyhow::{Context, anyhow};
use serde::Deserialize;
use strikecount_core::types::Strike;

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

pub fn parse_openai_chat_completion(body: &[u8]) -> anyhow::Result<String> {
    let resp: OpenAiChatResponse = serde_json::from_slice(body).context("decode chat JSON")?;
    let content = resp
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| anyhow!("no content in chat completion response"))?;
    Ok(content)
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

pub fn parse_gemini_generate_content(body: &[u8]) -> anyhow::Result<String> {
    let resp: GeminiResponse = serde_json::from_slice(body).context("decode Gemini JSON")?;
    let text: String = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(anyhow!("no text in Gemini response"));
    }
    Ok(text)
}

#[derive(Debug, Deserialize)]
struct StrikeJson {
    strike: String,
}

/// Maps model output to a label.
///
/// Accepts a bare word (`"Punch."`) or a JSON object `{"strike": "kick"}`, optionally inside
/// a markdown code fence. Anything else is an error.
pub fn parse_strike_label(text: &str) -> anyhow::Result<Strike> {
    let trimmed = strip_code_fence(text.trim());

    if trimmed.starts_with('{') {
        let obj: StrikeJson =
            serde_json::from_str(trimmed).context("decode strike JSON object")?;
        return obj.strike.parse().map_err(anyhow::Error::new);
    }

    let word = trimmed.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, '"' | '\'' | '`' | '.' | ',' | '!' | '*')
    });
    word.parse::<Strike>()
        .map_err(|e| anyhow!("malformed classifier output {text:?}: {e}"))
}

fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    // Drop an optional language tag on the opening fence line.
    match rest.split_once('\n') {
        Some((tag, body)) if !tag.trim().starts_with('{') => body.trim(),
        _ => rest.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_openai_chat_content() {
        let body = br#"{"choices":[{"message":{"content":"hi"}}]}"#;
        assert_eq!(parse_openai_chat_completion(body).unwrap(), "hi");
    }

    #[test]
    fn openai_missing_content_errors() {
        let body = br#"{"choices":[{"message":{}}]}"#;
        assert!(parse_openai_chat_completion(body).is_err());
    }

    #[test]
    fn parses_gemini_parts() {
        let body = br#"{"candidates":[{"content":{"parts":[{"text":"{\"strike\":"},{"text":"\"kick\"}"}]}}]}"#;
        assert_eq!(parse_gemini_generate_content(body).unwrap(), r#"{"strike":"kick"}"#);
    }

    #[test]
    fn gemini_blocked_response_errors() {
        let body = br#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        assert!(parse_gemini_generate_content(body).is_err());
    }

    #[test]
    fn strike_label_accepts_bare_words() {
        assert_eq!(parse_strike_label("punch").unwrap(), Strike::Punch);
        assert_eq!(parse_strike_label(" \"Kick.\"\n").unwrap(), Strike::Kick);
        assert_eq!(parse_strike_label("**none**").unwrap(), Strike::None);
    }

    #[test]
    fn strike_label_accepts_json_and_fences() {
        assert_eq!(parse_strike_label(r#"{"strike": "kick"}"#).unwrap(), Strike::Kick);
        assert_eq!(
            parse_strike_label("```json\n{\"strike\":\"punch\"}\n```").unwrap(),
            Strike::Punch
        );
    }

    #[test]
    fn strike_label_rejects_prose() {
        assert!(parse_strike_label("The fighter throws a punch").is_err());
        assert!(parse_strike_label(r#"{"strike": "elbow"}"#).is_err());
        assert!(parse_strike_label("").is_err());
    }
}
