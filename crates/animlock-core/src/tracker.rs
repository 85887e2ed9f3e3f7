//! Action-lock tracker (C4): per-connection state correlating outstanding
//! action requests with server responses and rewriting the animation-lock
//! field using a deterministic policy with a built-in anti-abuse clamp.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::clock::Clock;

/// Server-initiated periodic action that must never consume a pending slot.
pub const AUTO_ATTACK: u32 = 0x0007;

/// Safety margin retained on top of the server's reported duration.
pub const DEFAULT_EXTRA_DELAY_SECS: f64 = 0.075;

/// Below this floor, the anti-tamper clamp may activate. Set above it to
/// disable the clamp entirely.
pub const ANTI_TAMPER_FLOOR_SECS: f64 = 0.07;

/// Extra delay substituted by the anti-tamper clamp when it activates.
pub const ANTI_TAMPER_REPLACEMENT_SECS: f64 = 5.0;

/// Probability the anti-tamper clamp activates on a given response, when
/// `extra_delay` is at or below [`ANTI_TAMPER_FLOOR_SECS`].
pub const ANTI_TAMPER_CHANCE: f64 = 0.005;

/// One entry in the pending-request queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingEntry {
    /// Timestamp (wall-clock instant) of a `REQUEST_ACTION` seen client→server.
    Request(Instant),
    /// The outstanding request was a cast; don't shorten its lock.
    CastSentinel,
}

/// Outcome of observing a `RESPONSE_ACTION_RESULT`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EffectOutcome {
    /// The gate was not satisfied (no pending request, or an auto-attack);
    /// the frame passes through unchanged and nothing is popped.
    PassThrough,
    /// The matched request was a cast; popped, but the frame is unchanged.
    CastPassThrough,
    /// The lock duration was rewritten to this value.
    Rewritten(f32),
}

/// Per-connection tracker state: the pending queue and running lock
/// deadline. Shared by both direction loops behind one mutex; see the
/// relay's concurrency notes.
pub struct AnimLockTracker<C: Clock> {
    pending: VecDeque<PendingEntry>,
    lock_deadline: Option<Instant>,
    extra_delay_secs: f64,
    clock: C,
}

impl<C: Clock> AnimLockTracker<C> {
    /// Create a tracker with the default extra-delay margin.
    #[must_use]
    pub fn new(clock: C) -> Self {
        Self::with_extra_delay(clock, DEFAULT_EXTRA_DELAY_SECS)
    }

    /// Create a tracker with an overridden extra-delay margin. Values at or
    /// below [`ANTI_TAMPER_FLOOR_SECS`] activate the anti-tamper clamp.
    #[must_use]
    pub fn with_extra_delay(clock: C, extra_delay_secs: f64) -> Self {
        Self { pending: VecDeque::new(), lock_deadline: None, extra_delay_secs, clock }
    }

    /// Number of outstanding entries. Exposed for tests and diagnostics.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Client → server: `REQUEST_ACTION`. Never mutates the frame.
    pub fn observe_request(&mut self) {
        let now = self.clock.now();
        if self.pending.is_empty() {
            self.lock_deadline = Some(now);
        }
        self.pending.push_back(PendingEntry::Request(now));
    }

    /// Server → client: `RESPONSE_ACTION_RESULT`. Caller has already applied
    /// the `source_actor == target_actor` gate.
    pub fn observe_action_effect(&mut self, action_id: u32, duration_in: f32) -> EffectOutcome {
        if self.pending.is_empty() || action_id == AUTO_ATTACK {
            return EffectOutcome::PassThrough;
        }

        if matches!(self.pending.front(), Some(PendingEntry::CastSentinel)) {
            self.pending.pop_front();
            return EffectOutcome::CastPassThrough;
        }

        let now = self.clock.now();
        let extra = self.effective_extra_delay();
        let delay = Duration::from_secs_f64((extra + f64::from(duration_in)).max(0.0));

        let deadline = self.lock_deadline.unwrap_or(now) + delay;
        self.lock_deadline = Some(deadline);

        let new_duration = deadline.saturating_duration_since(now).as_secs_f64().max(0.0);

        self.pending.pop_front();
        #[allow(clippy::cast_possible_truncation)]
        EffectOutcome::Rewritten(new_duration as f32)
    }

    /// Server → client: `RESPONSE_ACTOR_CONTROL_SELF` with the rollback
    /// category. Never mutates the frame. Returns whether an entry popped.
    pub fn observe_rollback(&mut self) -> bool {
        self.pending.pop_front().is_some()
    }

    /// Server → client: `RESPONSE_ACTOR_CONTROL` with the cancel-cast
    /// category. Never mutates the frame. Returns whether an entry popped.
    pub fn observe_cancel_cast(&mut self) -> bool {
        self.pending.pop_front().is_some()
    }

    /// Server → client: `RESPONSE_ACTOR_CAST`. Never mutates the frame.
    /// Replaces the head with the cast sentinel; returns whether there was
    /// a head to replace.
    pub fn observe_cast(&mut self) -> bool {
        if self.pending.pop_front().is_some() {
            self.pending.push_front(PendingEntry::CastSentinel);
            true
        } else {
            false
        }
    }

    /// `extra_delay`, substituting the anti-tamper value with probability
    /// [`ANTI_TAMPER_CHANCE`] when below [`ANTI_TAMPER_FLOOR_SECS`].
    fn effective_extra_delay(&self) -> f64 {
        if self.extra_delay_secs <= ANTI_TAMPER_FLOOR_SECS
            && self.clock.random_unit() < ANTI_TAMPER_CHANCE
        {
            tracing::warn!(
                configured = self.extra_delay_secs,
                "anti-tamper clamp activated: extra delay below safety floor"
            );
            ANTI_TAMPER_REPLACEMENT_SECS
        } else {
            self.extra_delay_secs
        }
    }
}
