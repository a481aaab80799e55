use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Label produced for a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Strike {
    Punch,
    Kick,
    #[default]
    None,
}

impl Strike {
    pub fn as_str(self) -> &'static str {
        match self {
            Strike::Punch => "punch",
            Strike::Kick => "kick",
            Strike::None => "none",
        }
    }

    pub fn is_strike(self) -> bool {
        !matches!(self, Strike::None)
    }
}

impl fmt::Display for Strike {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown strike label: {0:?}")]
pub struct UnknownStrike(pub String);

impl FromStr for Strike {
    type Err = UnknownStrike;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "punch" => Ok(Strike::Punch),
            "kick" => Ok(Strike::Kick),
            "none" => Ok(Strike::None),
            other => Err(UnknownStrike(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    Running,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CameraPermission {
    #[default]
    Unknown,
    Granted,
    Denied,
}

/// Which count a goal-based session tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrikeTarget {
    Punches,
    Kicks,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub target: StrikeTarget,
    pub count: u32,
}

impl Goal {
    pub fn punches(count: u32) -> Self {
        Self {
            target: StrikeTarget::Punches,
            count,
        }
    }

    pub fn kicks(count: u32) -> Self {
        Self {
            target: StrikeTarget::Kicks,
            count,
        }
    }

    pub fn any(count: u32) -> Self {
        Self {
            target: StrikeTarget::Any,
            count,
        }
    }

    pub fn tracked(&self, tally: &Tally) -> u32 {
        match self.target {
            StrikeTarget::Punches => tally.punches,
            StrikeTarget::Kicks => tally.kicks,
            StrikeTarget::Any => tally.total(),
        }
    }

    pub fn is_reached(&self, tally: &Tally) -> bool {
        self.tracked(tally) >= self.count
    }
}

impl FromStr for Goal {
    type Err = String;

    /// Parses `kicks:5`, `punches:10` or `any:20`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (target, count) = s
            .split_once(':')
            .ok_or_else(|| format!("expected <target>:<count>, got {s:?}"))?;
        let count: u32 = count
            .trim()
            .parse()
            .map_err(|_| format!("invalid goal count: {count:?}"))?;
        let target = match target.trim().to_ascii_lowercase().as_str() {
            "punch" | "punches" => StrikeTarget::Punches,
            "kick" | "kicks" => StrikeTarget::Kicks,
            "any" | "strikes" => StrikeTarget::Any,
            other => return Err(format!("unknown goal target: {other:?}")),
        };
        Ok(Self { target, count })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tally {
    pub punches: u32,
    pub kicks: u32,
}

impl Tally {
    pub fn total(&self) -> u32 {
        self.punches.saturating_add(self.kicks)
    }

    pub fn record(&mut self, strike: Strike) {
        match strike {
            Strike::Punch => self.punches = self.punches.saturating_add(1),
            Strike::Kick => self.kicks = self.kicks.saturating_add(1),
            Strike::None => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    TimerExpired,
    GoalReached,
    Stopped,
}

impl FinishReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FinishReason::TimerExpired => "timer_expired",
            FinishReason::GoalReached => "goal_reached",
            FinishReason::Stopped => "stopped",
        }
    }
}
