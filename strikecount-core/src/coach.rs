use crate::history::SessionRecord;
use crate::text::{filter_coach_output, parse_numbered_list};
use serde::{Deserialize, Serialize};

/// Instruction sent with every frame to the vision classifier.
pub const STRIKE_DETECTION_PROMPT: &str = "You are an expert Muay Thai referee. Your task is to analyze an image and determine if the person is throwing a punch or a kick.

Analyze the provided image.

Your primary focus is to identify the moment of full extension for a strike.
- A \"punch\" is only counted at the point of full arm extension.
- A \"kick\" is only counted at the point of full leg extension.
- If an arm or leg is bent, in motion but not extended, or in a resting stance, respond with \"none\".

Only respond with one of the three options: \"punch\", \"kick\", or \"none\".";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltPrompt {
    pub system_message: String,
    pub user_message: String,
    pub messages: Vec<LlmMessage>,
}

impl BuiltPrompt {
    fn new(system: String, user: String) -> Self {
        let messages = vec![
            LlmMessage {
                role: "system".into(),
                content: system.clone(),
            },
            LlmMessage {
                role: "user".into(),
                content: user.clone(),
            },
        ];
        Self {
            system_message: system,
            user_message: user,
            messages,
        }
    }
}

/// Strike mix for one session, as fed to the drill coach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrikeStats {
    pub total_strikes: u32,
    pub kick_ratio: f64,
    pub punch_ratio: f64,
    // Not measurable from single-frame labels; left for callers that know it.
    pub dominant_hand_ratio: Option<f64>,
    pub dominant_leg_ratio: Option<f64>,
}

impl StrikeStats {
    pub fn from_counts(punches: u32, kicks: u32) -> Self {
        let total = punches.saturating_add(kicks);
        let ratio = |n: u32| {
            if total == 0 {
                0.0
            } else {
                f64::from(n) / f64::from(total)
            }
        };
        Self {
            total_strikes: total,
            kick_ratio: ratio(kicks),
            punch_ratio: ratio(punches),
            dominant_hand_ratio: None,
            dominant_leg_ratio: None,
        }
    }
}

pub fn describe_session(record: &SessionRecord) -> String {
    let ended = match record.reason {
        crate::types::FinishReason::TimerExpired => "timer expired",
        crate::types::FinishReason::GoalReached => "goal reached",
        crate::types::FinishReason::Stopped => "stopped early",
    };
    format!(
        "Planned duration: {}s. Time trained: {}s. Punches: {}. Kicks: {}. Total strikes: {}. Session ended: {}.",
        record.duration_secs,
        record.elapsed_secs,
        record.punches,
        record.kicks,
        record.tally().total(),
        ended
    )
}

pub fn build_summary_prompt(session_details: &str, user_goals: &str) -> BuiltPrompt {
    let system = "You are an expert Muay Thai coach summarizing training sessions for athletes.\n\n\
Based on the session details and the user's goals, provide a concise summary of the session, \
highlighting key moments, overall performance, and areas for improvement. The summary should be \
actionable and help the user understand their progress without watching the entire video.\n\n\
Provide a summary with at most 5 sentences."
        .to_string();

    let goals = if user_goals.trim().is_empty() {
        "(none given)"
    } else {
        user_goals.trim()
    };
    let user = format!("Session Details: {}\nUser Goals: {}", session_details.trim(), goals);

    BuiltPrompt::new(system, user)
}

pub fn build_drills_prompt(stats: &StrikeStats) -> BuiltPrompt {
    let system = "You are an expert Muay Thai coach providing feedback to a student after a training session.\n\n\
Based on the strike statistics provided, suggest 3 specific drills to improve the student's technique \
and address any weaknesses.\n\n\
Consider these factors when suggesting drills:\n\
- Balance between kicks and punches.\n\
- Usage of both dominant and non-dominant limbs.\n\
- Overall strike variety.\n\n\
Focus on actionable drills that the student can immediately incorporate into their training.\n\
Return the answer as a numbered list."
        .to_string();

    let mut user = format!(
        "Total Strikes: {}\nKick Ratio: {:.2}\nPunch Ratio: {:.2}",
        stats.total_strikes, stats.kick_ratio, stats.punch_ratio
    );
    if let Some(r) = stats.dominant_hand_ratio {
        user.push_str(&format!("\nDominant Hand Ratio: {r:.2}"));
    }
    if let Some(r) = stats.dominant_leg_ratio {
        user.push_str(&format!("\nDominant Leg Ratio: {r:.2}"));
    }

    BuiltPrompt::new(system, user)
}

pub fn post_process_summary(text: &str) -> String {
    filter_coach_output(text)
}

pub fn post_process_drills(text: &str) -> Vec<String> {
    parse_numbered_list(&filter_coach_output(text))
}
