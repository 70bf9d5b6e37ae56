//! Coalescing queue of pending re-solve requests.

use std::collections::{BTreeSet, HashMap};

use crate::circuit::{BranchId, SimTime};

/// What happened to a scheduling request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheduled {
    /// No request was pending for the branch; a new one was queued.
    Queued,
    /// A request at the same or an earlier time was already pending.
    Coalesced,
    /// A later pending request was moved up to the new time.
    Advanced,
}

/// Pending re-solve requests, at most one per branch.
///
/// A branch that already waits for a re-solve keeps its earliest request,
/// so repeated scheduling never grows the queue beyond one entry per
/// branch. Popped times never go backwards.
#[derive(Debug, Default)]
pub struct ResolveQueue {
    /// Pending request time per branch
    pending: HashMap<BranchId, SimTime>,
    /// The same requests ordered by due time
    order: BTreeSet<(SimTime, BranchId)>,
    /// Latest time already handed out by `pop_due`
    horizon: SimTime,
}

impl ResolveQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a re-solve of `branch` at `at`.
    ///
    /// Requests earlier than the last popped time are moved up to it.
    pub fn schedule(&mut self, branch: BranchId, at: SimTime) -> Scheduled {
        let at = at.max(self.horizon);
        match self.pending.get(&branch).copied() {
            Some(existing) if existing <= at => Scheduled::Coalesced,
            Some(existing) => {
                self.order.remove(&(existing, branch));
                self.order.insert((at, branch));
                self.pending.insert(branch, at);
                Scheduled::Advanced
            }
            None => {
                self.order.insert((at, branch));
                self.pending.insert(branch, at);
                Scheduled::Queued
            }
        }
    }

    /// Remove and return every request due at or before `now`, in time order.
    pub fn pop_due(&mut self, now: SimTime) -> Vec<(SimTime, BranchId)> {
        let mut due = Vec::new();
        while let Some(&(at, branch)) = self.order.first() {
            if at > now {
                break;
            }
            self.order.remove(&(at, branch));
            self.pending.remove(&branch);
            self.horizon = self.horizon.max(at);
            due.push((at, branch));
        }
        due
    }

    /// Time of the earliest pending request.
    pub fn next_due(&self) -> Option<SimTime> {
        self.order.first().map(|&(at, _)| at)
    }

    /// Pending request time for a branch.
    pub fn pending_for(&self, branch: BranchId) -> Option<SimTime> {
        self.pending.get(&branch).copied()
    }

    /// Number of pending requests.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Check if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop all pending requests. The popped-time horizon is kept.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.order.clear();
    }
}
