use crate::profile::{DEFAULT_DISPLAY_NAME, UserProfile};
use serde::{Deserialize, Serialize};

/// Stored entry for the local user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub score: u32,
    #[serde(default)]
    pub instagram: Option<String>,
}

impl LeaderboardEntry {
    pub fn from_profile(profile: &UserProfile, score: u32) -> Self {
        Self {
            name: profile.display_name().to_string(),
            score,
            instagram: profile.instagram.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub rank: u32,
    pub name: String,
    pub score: u32,
    pub avatar: String,
    pub instagram: Option<String>,
    pub is_current_user: bool,
}

pub fn default_roster() -> Vec<LeaderboardRow> {
    let row = |name: &str, score: u32, avatar: &str, instagram: Option<&str>| LeaderboardRow {
        rank: 0,
        name: name.into(),
        score,
        avatar: avatar.into(),
        instagram: instagram.map(Into::into),
        is_current_user: false,
    };

    vec![
        row("Ryu", 124, "R", Some("ryu")),
        row("Chun-Li", 118, "CL", None),
        row("Sagat", 112, "S", Some("sagat")),
        row("Ken", 58, "K", None),
    ]
}

fn avatar_for(name: &str) -> String {
    name.chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_else(|| "Y".into())
}

/// Merges the current user into the roster and ranks by score, highest first.
///
/// Equal scores keep roster order, with the current user after existing players.
pub fn build_leaderboard(you: Option<&LeaderboardEntry>) -> Vec<LeaderboardRow> {
    let mut rows = default_roster();

    if let Some(you) = you {
        let name = if you.name.trim().is_empty() {
            DEFAULT_DISPLAY_NAME.to_string()
        } else {
            you.name.trim().to_string()
        };
        rows.push(LeaderboardRow {
            rank: 0,
            avatar: avatar_for(&name),
            name,
            score: you.score,
            instagram: you.instagram.clone().filter(|h| !h.trim().is_empty()),
            is_current_user: true,
        });
    }

    // `sort_by` is stable.
    rows.sort_by(|a, b| b.score.cmp(&a.score));
    for (i, row) in rows.iter_mut().enumerate() {
        row.rank = i as u32 + 1;
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_alone_is_ranked() {
        let rows = build_leaderboard(None);
        let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Ryu", "Chun-Li", "Sagat", "Ken"]);
        assert_eq!(rows[3].rank, 4);
    }

    #[test]
    fn current_user_is_slotted_by_score() {
        let you = LeaderboardEntry {
            name: "nong".into(),
            score: 115,
            instagram: Some("nong".into()),
        };
        let rows = build_leaderboard(Some(&you));
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[2].name, "nong");
        assert_eq!(rows[2].rank, 3);
        assert_eq!(rows[2].avatar, "N");
        assert!(rows[2].is_current_user);
        assert_eq!(rows[3].name, "Sagat");
    }

    #[test]
    fn ties_keep_existing_players_first() {
        let you = LeaderboardEntry {
            name: "".into(),
            score: 58,
            instagram: None,
        };
        let rows = build_leaderboard(Some(&you));
        assert_eq!(rows[3].name, "Ken");
        assert_eq!(rows[4].name, "You");
        assert_eq!(rows[4].avatar, "Y");
    }
}
