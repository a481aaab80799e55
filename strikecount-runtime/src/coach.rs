use strikecount_core::coach::{
    StrikeStats, build_drills_prompt, build_summary_prompt, describe_session, post_process_drills,
    post_process_summary,
};
use strikecount_core::config::{ClassifierKind, CoachSettings};
use strikecount_core::history::SessionRecord;
use strikecount_engine::traits::{CoachProvider, CoachText};
use strikecount_providers::gemini::{GeminiConfig, build_text_request};
use strikecount_providers::openai_compatible::{
    ChatMessage, OpenAiCompatibleConfig, build_chat_completions_request,
};
use strikecount_providers::parse::{parse_gemini_generate_content, parse_openai_chat_completion};
use strikecount_providers::runtime::execute;

#[derive(Clone)]
pub struct LlmCoach {
    settings: CoachSettings,
    api_key: String,
}

impl std::fmt::Debug for LlmCoach {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmCoach")
            .field("settings", &self.settings)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl LlmCoach {
    pub fn new(settings: CoachSettings, api_key: impl Into<String>) -> Self {
        Self {
            settings,
            api_key: api_key.into(),
        }
    }
}

#[async_trait::async_trait]
impl CoachProvider for LlmCoach {
    async fn complete(
        &self,
        system_message: &str,
        user_message: &str,
    ) -> anyhow::Result<CoachText> {
        let provider = self.settings.provider.as_str();

        let text = match self.settings.provider {
            ClassifierKind::Gemini => {
                let cfg = GeminiConfig {
                    base_url: self.settings.base_url.clone(),
                    api_key: self.api_key.clone(),
                    model: self.settings.model.clone(),
                };
                let req = build_text_request(&cfg, system_message, user_message)?;
                let body = execute(&req).await?.into_success_body(provider)?;
                parse_gemini_generate_content(&body)?
            }
            ClassifierKind::OpenaiCompatible => {
                let cfg = OpenAiCompatibleConfig {
                    base_url: self.settings.base_url.clone(),
                    api_key: self.api_key.clone(),
                    model: self.settings.model.clone(),
                };
                let messages = vec![
                    ChatMessage {
                        role: "system".into(),
                        content: system_message.to_string(),
                    },
                    ChatMessage {
                        role: "user".into(),
                        content: user_message.to_string(),
                    },
                ];
                let req = build_chat_completions_request(&cfg, &messages);
                let body = execute(&req).await?.into_success_body(provider)?;
                parse_openai_chat_completion(&body)?
            }
        };

        Ok(CoachText {
            text,
            provider: provider.into(),
            model: self.settings.model.clone(),
        })
    }
}

/// Short coach feedback on one session, guided by the user's stated goals.
pub async fn summarize_session(
    coach: &dyn CoachProvider,
    record: &SessionRecord,
    user_goals: &str,
) -> anyhow::Result<String> {
    let prompt = build_summary_prompt(&describe_session(record), user_goals);
    let out = coach
        .complete(&prompt.system_message, &prompt.user_message)
        .await?;
    let summary = post_process_summary(&out.text);
    if summary.is_empty() {
        return Err(anyhow::anyhow!("{} returned an empty summary", out.provider));
    }
    Ok(summary)
}

/// Three drills targeting the session's strike mix.
pub async fn suggest_drills(
    coach: &dyn CoachProvider,
    stats: &StrikeStats,
) -> anyhow::Result<Vec<String>> {
    let prompt = build_drills_prompt(stats);
    let out = coach
        .complete(&prompt.system_message, &prompt.user_message)
        .await?;
    let drills = post_process_drills(&out.text);
    if drills.is_empty() {
        return Err(anyhow::anyhow!("{} returned no drills", out.provider));
    }
    Ok(drills)
}
