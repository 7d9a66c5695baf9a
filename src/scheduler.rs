//! Cooperative timer queue.
//!
//! The grid never sleeps or spawns. Deferred work (coalesced renders, async
//! post-render batches, cleanup batches, deferred editor loading) is recorded
//! here with a due time on a virtual clock, and the host advances the clock.
//! Each kind has at most one pending timer; scheduling a kind again replaces
//! the previous one. Timers due at the same instant fire in the order they
//! were scheduled.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Render,
    PostRender,
    PostRenderCleanup,
    EditorLoader,
}

#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    now: f64,
    /// Due time and scheduling sequence number per kind
    pending: HashMap<TimerKind, (f64, u64)>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time in milliseconds
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Schedule `kind` to fire after `delay` ms, cancelling any pending timer of that kind.
    pub fn schedule(&mut self, kind: TimerKind, delay: f64) {
        let due = self.now + delay.max(0.0);
        tracing::trace!(?kind, due, "timer scheduled");
        self.pending.insert(kind, (due, self.next_seq));
        self.next_seq += 1;
    }

    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        self.pending.remove(&kind).is_some()
    }

    pub fn is_pending(&self, kind: TimerKind) -> bool {
        self.pending.contains_key(&kind)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Due time of the earliest pending timer
    pub fn next_due(&self) -> Option<f64> {
        self.pending.values().map(|(due, _)| *due).reduce(f64::min)
    }

    /// Pop the earliest timer due at or before `deadline`, moving the clock to its due time.
    pub fn pop_due(&mut self, deadline: f64) -> Option<TimerKind> {
        let (kind, due) = self
            .pending
            .iter()
            .filter(|(_, (due, _))| *due <= deadline)
            .min_by(|(_, (a_due, a_seq)), (_, (b_due, b_seq))| {
                a_due.total_cmp(b_due).then(a_seq.cmp(b_seq))
            })
            .map(|(kind, (due, _))| (*kind, *due))?;
        self.pending.remove(&kind);
        self.now = self.now.max(due);
        tracing::trace!(?kind, now = self.now, "timer fired");
        Some(kind)
    }

    /// Move the clock forward without firing anything.
    pub fn advance_clock(&mut self, to: f64) {
        self.now = self.now.max(to);
    }
}
