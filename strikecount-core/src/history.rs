use crate::types::{FinishReason, Tally};
use serde::{Deserialize, Serialize};

pub const MS_PER_DAY: i64 = 86_400_000;

/// Longest window `daily_totals` will build.
pub const MAX_CHART_DAYS: u32 = 366;

/// One finished (or stopped) session as kept in history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub ts_unix_ms: i64,
    pub punches: u32,
    pub kicks: u32,
    pub duration_secs: u32,
    pub elapsed_secs: u32,
    pub reason: FinishReason,
}

impl SessionRecord {
    pub fn tally(&self) -> Tally {
        Tally {
            punches: self.punches,
            kicks: self.kicks,
        }
    }

    pub fn day(&self) -> i64 {
        self.ts_unix_ms.div_euclid(MS_PER_DAY)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTotals {
    /// Days since the Unix epoch (UTC).
    pub day: i64,
    pub punches: u32,
    pub kicks: u32,
    pub sessions: u32,
}

/// Per-day totals for the `days` days ending at `now_ms`, oldest first.
///
/// Days without sessions are present with zero counts so a chart has a fixed x-axis.
/// `days` is capped at [`MAX_CHART_DAYS`].
pub fn daily_totals(records: &[SessionRecord], now_ms: i64, days: u32) -> Vec<DailyTotals> {
    let days = days.min(MAX_CHART_DAYS);
    let today = now_ms.div_euclid(MS_PER_DAY);
    let first = today - i64::from(days) + 1;

    let mut out: Vec<DailyTotals> = (first..=today)
        .map(|day| DailyTotals {
            day,
            punches: 0,
            kicks: 0,
            sessions: 0,
        })
        .collect();

    for r in records {
        let day = r.day();
        if day < first || day > today {
            continue;
        }
        let slot = &mut out[(day - first) as usize];
        slot.punches = slot.punches.saturating_add(r.punches);
        slot.kicks = slot.kicks.saturating_add(r.kicks);
        slot.sessions += 1;
    }

    out
}

pub fn lifetime_strikes(records: &[SessionRecord]) -> u64 {
    records.iter().map(|r| u64::from(r.tally().total())).sum()
}

/// Longest run of consecutive UTC days with at least one session.
pub fn longest_streak_days(records: &[SessionRecord]) -> u32 {
    let mut days: Vec<i64> = records.iter().map(SessionRecord::day).collect();
    days.sort_unstable();
    days.dedup();

    let mut best = 0;
    let mut run = 0;
    let mut prev: Option<i64> = None;
    for d in days {
        run = match prev {
            Some(p) if d == p + 1 => run + 1,
            _ => 1,
        };
        best = best.max(run);
        prev = Some(d);
    }
    best
}
