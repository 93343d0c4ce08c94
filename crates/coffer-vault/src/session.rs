//! Session Guard state machine.
//!
//! ```text
//! Uninitialized ──set password──▶ Unlocked ◀──unlock── Locked
//!                                    │                   ▲
//!                                    └──lock / timeout───┘
//! ```
//!
//! `Uninitialized` is only re-entered through an explicit password reset.
//! The session is memory-only and rebuilt on every start. Password checks
//! happen in [`Vault`](crate::Vault); this type only tracks state and time.

use tracing::info;

/// Where the session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No master password is stored.
    Uninitialized,
    /// A master password exists and has not been entered.
    Locked,
    /// Decryption is allowed.
    Unlocked,
}

/// In-memory session: lock state plus inactivity bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultSession {
    state: SessionState,
    last_activity_ms: u64,
    auto_lock_minutes: u32,
}

impl VaultSession {
    /// Fresh session. `auto_lock_minutes == 0` disables the inactivity lock.
    #[must_use]
    pub const fn new(state: SessionState, auto_lock_minutes: u32, now_ms: u64) -> Self {
        Self {
            state,
            last_activity_ms: now_ms,
            auto_lock_minutes,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Whether decryption is currently allowed.
    #[must_use]
    pub fn is_unlocked(&self) -> bool {
        self.state == SessionState::Unlocked
    }

    /// Time of the last recorded interaction.
    #[must_use]
    pub const fn last_activity_ms(&self) -> u64 {
        self.last_activity_ms
    }

    /// Inactivity threshold in minutes (0 = disabled).
    #[must_use]
    pub const fn auto_lock_minutes(&self) -> u32 {
        self.auto_lock_minutes
    }

    /// Change the inactivity threshold. Takes effect at the next check.
    pub fn set_auto_lock_minutes(&mut self, minutes: u32) {
        self.auto_lock_minutes = minutes;
    }

    /// Enter `Unlocked` and restart the inactivity window.
    pub fn unlock(&mut self, now_ms: u64) {
        if self.state != SessionState::Unlocked {
            info!("vault unlocked");
        }
        self.state = SessionState::Unlocked;
        self.last_activity_ms = now_ms;
    }

    /// Enter `Locked`. No-op unless currently unlocked.
    ///
    /// Returns whether the state changed.
    pub fn lock(&mut self) -> bool {
        if self.state != SessionState::Unlocked {
            return false;
        }
        self.state = SessionState::Locked;
        info!("vault locked");
        true
    }

    /// Return to `Uninitialized` after the master hash was removed.
    pub fn reset(&mut self) {
        self.state = SessionState::Uninitialized;
    }

    /// Record a user interaction.
    pub fn record_activity(&mut self, now_ms: u64) {
        self.last_activity_ms = now_ms;
    }

    /// Whether the inactivity threshold has been reached at `now_ms`.
    #[must_use]
    pub fn is_inactivity_expired(&self, now_ms: u64) -> bool {
        if self.auto_lock_minutes == 0 {
            return false;
        }
        let threshold_ms = u64::from(self.auto_lock_minutes).saturating_mul(60_000);
        now_ms.saturating_sub(self.last_activity_ms) >= threshold_ms
    }

    /// Lock if unlocked and idle for at least the threshold.
    ///
    /// Returns whether this call locked the session.
    pub fn check_inactivity(&mut self, now_ms: u64) -> bool {
        if !self.is_unlocked() || !self.is_inactivity_expired(now_ms) {
            return false;
        }
        info!(
            idle_ms = now_ms.saturating_sub(self.last_activity_ms),
            "inactivity timeout reached"
        );
        self.lock()
    }
}
