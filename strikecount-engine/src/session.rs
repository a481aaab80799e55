use serde::{Deserialize, Serialize};
use std::time::Duration;
use strikecount_core::types::{FinishReason, Goal, SessionId, SessionState, Strike, Tally};

/// Session record mutated only by the session loop.
///
/// Counters only grow while `Running` and are cleared on `start`. The countdown reaching
/// zero (or the goal being met) moves `Running -> Finished` exactly once per run; events
/// arriving after that are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: SessionId,
    state: SessionState,
    duration_secs: u32,
    remaining_secs: u32,
    tally: Tally,
    goal: Option<Goal>,
    finish_reason: Option<FinishReason>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub state: SessionState,
    pub remaining_secs: u32,
    pub punches: u32,
    pub kicks: u32,
    pub goal: Option<Goal>,
}

impl SessionSnapshot {
    pub fn idle(duration_secs: u32, goal: Option<Goal>) -> Self {
        Session::new(duration_secs, goal).snapshot()
    }
}

impl Session {
    pub fn new(duration_secs: u32, goal: Option<Goal>) -> Self {
        Self {
            id: SessionId::new(),
            state: SessionState::Idle,
            duration_secs,
            remaining_secs: duration_secs,
            tally: Tally::default(),
            goal,
            finish_reason: None,
        }
    }

    /// `Idle | Finished -> Running`. Returns false (and changes nothing) if already running.
    pub fn start(&mut self) -> bool {
        if self.state == SessionState::Running {
            return false;
        }
        self.id = SessionId::new();
        self.state = SessionState::Running;
        self.remaining_secs = self.duration_secs;
        self.tally = Tally::default();
        self.finish_reason = None;
        true
    }

    /// One countdown second. Returns the finish reason if this tick ended the session.
    pub fn tick(&mut self) -> Option<FinishReason> {
        if self.state != SessionState::Running {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            return self.finish(FinishReason::TimerExpired);
        }
        None
    }

    /// Applies one classifier result. Results arriving outside `Running` are discarded.
    pub fn record(&mut self, strike: Strike) -> Option<FinishReason> {
        if self.state != SessionState::Running {
            return None;
        }
        self.tally.record(strike);
        if self.goal.is_some_and(|g| g.is_reached(&self.tally)) {
            return self.finish(FinishReason::GoalReached);
        }
        None
    }

    /// User stop: `Running -> Idle`. Returns the tally reached before stopping.
    pub fn stop(&mut self) -> Option<Tally> {
        if self.state != SessionState::Running {
            return None;
        }
        let tally = self.tally;
        self.finish_reason = Some(FinishReason::Stopped);
        self.reset();
        Some(tally)
    }

    /// Back to `Idle` with cleared counters.
    pub fn reset(&mut self) {
        self.state = SessionState::Idle;
        self.remaining_secs = self.duration_secs;
        self.tally = Tally::default();
    }

    fn finish(&mut self, reason: FinishReason) -> Option<FinishReason> {
        self.state = SessionState::Finished;
        self.finish_reason = Some(reason);
        Some(reason)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn tally(&self) -> Tally {
        self.tally
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            state: self.state,
            remaining_secs: self.remaining_secs,
            punches: self.tally.punches,
            kicks: self.tally.kicks,
            goal: self.goal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub id: SessionId,
    pub reason: FinishReason,
    pub punches: u32,
    pub kicks: u32,
    pub duration_secs: u32,
    pub remaining_secs: u32,
    pub elapsed_ms: u64,
    pub samples_taken: u32,
    pub samples_skipped: u32,
    pub classification_failures: u32,

    // True if this run set a new best score.
    pub new_best: bool,
}

impl SessionOutcome {
    pub fn score(&self) -> u32 {
        self.punches.saturating_add(self.kicks)
    }

    pub fn elapsed_secs(&self) -> u32 {
        (self.elapsed_ms / 1000).try_into().unwrap_or(u32::MAX)
    }
}

pub fn ms(d: Duration) -> u64 {
    d.as_millis().try_into().unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_resets_previous_run() {
        let mut s = Session::new(3, None);
        assert!(s.start());
        s.record(Strike::Punch);
        s.tick();
        s.tick();
        assert_eq!(s.tick(), Some(FinishReason::TimerExpired));
        assert_eq!(s.state(), SessionState::Finished);
        assert_eq!(s.tally().punches, 1);

        let first = s.id();
        assert!(s.start());
        assert_ne!(s.id(), first);
        assert_eq!(s.state(), SessionState::Running);
        assert_eq!(s.remaining_secs(), 3);
        assert_eq!(s.tally(), Tally::default());
    }

    #[test]
    fn start_while_running_is_rejected() {
        let mut s = Session::new(10, None);
        assert!(s.start());
        s.record(Strike::Kick);
        assert!(!s.start());
        assert_eq!(s.tally().kicks, 1);
    }

    #[test]
    fn finishes_exactly_once() {
        let mut s = Session::new(1, Some(Goal::kicks(1)));
        s.start();
        assert_eq!(s.tick(), Some(FinishReason::TimerExpired));
        assert_eq!(s.tick(), None);
        assert_eq!(s.record(Strike::Kick), None);
        assert_eq!(s.tally().kicks, 0);
        assert_eq!(s.finish_reason(), Some(FinishReason::TimerExpired));
    }

    #[test]
    fn goal_finishes_before_timer() {
        let mut s = Session::new(60, Some(Goal::kicks(2)));
        s.start();
        assert_eq!(s.record(Strike::Kick), None);
        assert_eq!(s.record(Strike::Punch), None);
        assert_eq!(s.record(Strike::Kick), Some(FinishReason::GoalReached));
        assert_eq!(s.remaining_secs(), 60);
        assert_eq!(s.record(Strike::Kick), None);
        assert_eq!(s.tally(), Tally { punches: 1, kicks: 2 });
    }

    #[test]
    fn results_outside_running_are_discarded() {
        let mut s = Session::new(30, None);
        assert_eq!(s.record(Strike::Punch), None);
        assert_eq!(s.tick(), None);
        assert_eq!(s.snapshot().punches, 0);
        assert_eq!(s.snapshot().remaining_secs, 30);
    }

    #[test]
    fn stop_returns_tally_and_goes_idle() {
        let mut s = Session::new(30, None);
        s.start();
        s.record(Strike::Punch);
        s.record(Strike::Kick);
        assert_eq!(s.stop(), Some(Tally { punches: 1, kicks: 1 }));
        assert_eq!(s.state(), SessionState::Idle);
        assert_eq!(s.tally(), Tally::default());
        assert_eq!(s.remaining_secs(), 30);
        assert_eq!(s.stop(), None);
    }
}
