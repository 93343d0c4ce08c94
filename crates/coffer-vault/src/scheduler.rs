//! Cooperative inactivity poll.
//!
//! The host calls [`InactivityPoll::tick`] from its own event loop as often
//! as it likes. The check runs at most once per interval and the next run is
//! armed only after the current one returns, so runs never overlap.

use std::time::Duration;

use crate::session::VaultSession;

/// Default spacing between inactivity checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Result of one [`InactivityPoll::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The interval has not elapsed; nothing was checked.
    NotDue,
    /// The check ran and the session stayed as it was.
    Checked,
    /// The check ran and locked the session.
    Locked,
}

/// Single repeating inactivity task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InactivityPoll {
    interval_ms: u64,
    next_due_ms: u64,
}

impl InactivityPoll {
    /// Poll whose first check is due one interval after `now_ms`.
    #[must_use]
    pub fn new(interval: Duration, now_ms: u64) -> Self {
        let interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX).max(1);
        Self {
            interval_ms,
            next_due_ms: now_ms.saturating_add(interval_ms),
        }
    }

    /// Spacing between checks.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// How long the host may sleep before the next check is due.
    #[must_use]
    pub fn time_until_due(&self, now_ms: u64) -> Duration {
        Duration::from_millis(self.next_due_ms.saturating_sub(now_ms))
    }

    /// Run the inactivity check if due, then re-arm from `now_ms`.
    pub fn tick(&mut self, now_ms: u64, session: &mut VaultSession) -> PollOutcome {
        if now_ms < self.next_due_ms {
            return PollOutcome::NotDue;
        }
        let locked = session.check_inactivity(now_ms);
        self.next_due_ms = now_ms.saturating_add(self.interval_ms);
        if locked {
            PollOutcome::Locked
        } else {
            PollOutcome::Checked
        }
    }
}

impl Default for InactivityPoll {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionState;

    const SECOND: u64 = 1_000;

    fn session(minutes: u32) -> VaultSession {
        let mut s = VaultSession::new(SessionState::Locked, minutes, 0);
        s.unlock(0);
        s
    }

    #[test]
    fn not_due_before_first_interval() {
        let mut poll = InactivityPoll::new(DEFAULT_POLL_INTERVAL, 0);
        let mut s = session(5);
        assert_eq!(poll.tick(9 * SECOND, &mut s), PollOutcome::NotDue);
        assert_eq!(poll.tick(10 * SECOND, &mut s), PollOutcome::Checked);
        assert_eq!(poll.tick(15 * SECOND, &mut s), PollOutcome::NotDue);
        assert_eq!(poll.time_until_due(15 * SECOND), Duration::from_secs(5));
    }

    #[test]
    fn rearms_from_completion_time() {
        let mut poll = InactivityPoll::new(DEFAULT_POLL_INTERVAL, 0);
        let mut s = session(5);
        // A late tick pushes the next run out from when it actually ran.
        assert_eq!(poll.tick(25 * SECOND, &mut s), PollOutcome::Checked);
        assert_eq!(poll.tick(30 * SECOND, &mut s), PollOutcome::NotDue);
        assert_eq!(poll.tick(35 * SECOND, &mut s), PollOutcome::Checked);
    }

    #[test]
    fn locks_within_one_interval_of_threshold() {
        let mut poll = InactivityPoll::new(DEFAULT_POLL_INTERVAL, 0);
        let mut s = session(5);
        let mut now = 0;
        let locked_at = loop {
            now += SECOND;
            if poll.tick(now, &mut s) == PollOutcome::Locked {
                break now;
            }
        };
        assert!(locked_at >= 5 * 60 * SECOND);
        assert!(locked_at < 5 * 60 * SECOND + poll.interval_ms);
        assert_eq!(s.state(), SessionState::Locked);
    }

    #[test]
    fn zero_interval_is_clamped() {
        let poll = InactivityPoll::new(Duration::ZERO, 0);
        assert_eq!(poll.interval(), Duration::from_millis(1));
    }
}
