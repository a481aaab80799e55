use crate::history::{SessionRecord, lifetime_strikes, longest_streak_days};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementKind {
    CenturyStriker,
    PerfectSession,
    TrainingStreak,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub kind: AchievementKind,
    pub title: String,
    pub description: String,
    pub progress: u64,
    pub target: u64,
    pub unlocked: bool,
}

const CENTURY_STRIKES: u64 = 100;
const PERFECT_SESSION_SCORE: u64 = 50;
const STREAK_DAYS: u64 = 3;

pub fn evaluate_achievements(records: &[SessionRecord], top_score: u32) -> Vec<Achievement> {
    let card = |kind, title: &str, description: &str, progress: u64, target: u64| Achievement {
        kind,
        title: title.into(),
        description: description.into(),
        progress: progress.min(target),
        target,
        unlocked: progress >= target,
    };

    vec![
        card(
            AchievementKind::CenturyStriker,
            "Century Striker",
            "Land 100 total strikes.",
            lifetime_strikes(records),
            CENTURY_STRIKES,
        ),
        card(
            AchievementKind::PerfectSession,
            "Perfect Session",
            "Achieve a top score of 50.",
            u64::from(top_score),
            PERFECT_SESSION_SCORE,
        ),
        card(
            AchievementKind::TrainingStreak,
            "Training Streak",
            "Train 3 days in a row.",
            u64::from(longest_streak_days(records)),
            STREAK_DAYS,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MS_PER_DAY;
    use crate::types::FinishReason;

    fn rec(day: i64, punches: u32) -> SessionRecord {
        SessionRecord {
            ts_unix_ms: day * MS_PER_DAY,
            punches,
            kicks: 0,
            duration_secs: 30,
            elapsed_secs: 30,
            reason: FinishReason::TimerExpired,
        }
    }

    #[test]
    fn nothing_unlocked_without_history() {
        let cards = evaluate_achievements(&[], 0);
        assert_eq!(cards.len(), 3);
        assert!(cards.iter().all(|c| !c.unlocked));
    }

    #[test]
    fn unlocks_and_clamps_progress() {
        let records = vec![rec(1, 60), rec(2, 60), rec(3, 1)];
        let cards = evaluate_achievements(&records, 49);

        let century = &cards[0];
        assert!(century.unlocked);
        assert_eq!(century.progress, 100);

        assert!(!cards[1].unlocked);
        assert_eq!(cards[1].progress, 49);

        assert!(cards[2].unlocked);
    }
}
