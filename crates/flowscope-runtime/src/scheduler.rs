//! Generation-stamped deferred work queue.
//!
//! Layout runs and viewport fits are deferred so the host can observe the
//! intermediate state of a transaction. Each task carries the session
//! generation current when it was scheduled; the session discards tasks
//! whose stamp is older than its current generation when they come due.
//!
//! # Invariants
//!
//! - **Latest-wins**: at most one task per kind is pending. Scheduling a
//!   kind that is already queued replaces it (a forced fit stays forced).
//! - **Ordered**: due tasks come out in `(due, sequence)` order.
//! - **Deterministic**: all timing goes through explicit `Instant`s.

#![forbid(unsafe_code)]

use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Layout,
    FitView { forced: bool },
}

impl TaskKind {
    fn same_slot(self, other: TaskKind) -> bool {
        matches!(
            (self, other),
            (Self::Layout, Self::Layout) | (Self::FitView { .. }, Self::FitView { .. })
        )
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Layout => "layout",
            Self::FitView { .. } => "fit_view",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeferredTask {
    pub kind: TaskKind,
    pub generation: u64,
    pub due: Instant,
    seq: u64,
}

#[derive(Debug, Clone, Default)]
pub struct DeferredQueue {
    tasks: Vec<DeferredTask>,
    next_seq: u64,
    coalesced: u64,
}

impl DeferredQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `kind`, replacing any pending task of the same kind.
    pub fn schedule(&mut self, kind: TaskKind, generation: u64, due: Instant) {
        let seq = self.next_seq;
        self.next_seq += 1;
        if let Some(slot) = self.tasks.iter_mut().find(|t| t.kind.same_slot(kind)) {
            let kind = match (slot.kind, kind) {
                (TaskKind::FitView { forced: a }, TaskKind::FitView { forced: b }) => {
                    TaskKind::FitView { forced: a || b }
                }
                _ => kind,
            };
            *slot = DeferredTask {
                kind,
                generation,
                due,
                seq,
            };
            self.coalesced += 1;
            return;
        }
        self.tasks.push(DeferredTask {
            kind,
            generation,
            due,
            seq,
        });
    }

    /// Remove and return every task due at `now`.
    pub fn take_due(&mut self, now: Instant) -> Vec<DeferredTask> {
        let (mut due, rest): (Vec<_>, Vec<_>) = self.tasks.drain(..).partition(|t| t.due <= now);
        self.tasks = rest;
        due.sort_by_key(|t| (t.due, t.seq));
        due
    }

    /// Remove and return every pending task regardless of due time.
    pub fn drain_all(&mut self) -> Vec<DeferredTask> {
        let mut all: Vec<_> = self.tasks.drain(..).collect();
        all.sort_by_key(|t| (t.due, t.seq));
        all
    }

    #[must_use]
    pub fn next_due(&self) -> Option<Instant> {
        self.tasks.iter().map(|t| t.due).min()
    }

    #[must_use]
    pub fn has_pending(&self, kind: TaskKind) -> bool {
        self.tasks.iter().any(|t| t.kind.same_slot(kind))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks replaced before they ran.
    #[must_use]
    pub fn coalesced(&self) -> u64 {
        self.coalesced
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }
}
