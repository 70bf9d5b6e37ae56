//! Variable resistor element owned by a switch device.
//!
//! The element stores the branch resistance locally and pushes it into the
//! solver only through [`SolverService`] calls. The order of those calls
//! when the value changes is selected by [`ApplyPolicy`].

use crate::circuit::{BranchId, SimTime};
use crate::solver::SolverService;

/// Ordering of the synchronize / write / re-solve steps on a value change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ApplyPolicy {
    /// Synchronize the branch with its old value, write the new value, then
    /// schedule a re-solve after a short delay. For branches in a
    /// time-stepped net, where a solve may be in progress.
    #[default]
    Deferred,
    /// Write the new value, then synchronize so it is solved immediately.
    /// No re-solve is scheduled. Only for branches outside any
    /// time-stepped solve.
    Immediate,
}

impl ApplyPolicy {
    /// Policy matching a branch's network participation mode.
    pub fn for_network(timestep: bool) -> Self {
        if timestep {
            Self::Deferred
        } else {
            Self::Immediate
        }
    }
}

/// One resistive branch of the solved network.
///
/// The resistance is always strictly positive and finite.
#[derive(Debug, Clone)]
pub struct VariableResistor {
    branch: BranchId,
    resistance: f64,
}

impl VariableResistor {
    /// Create an element for `branch` holding `ohms`.
    ///
    /// # Panics
    /// If `ohms` is not strictly positive and finite.
    pub fn new(branch: BranchId, ohms: f64) -> Self {
        assert_valid(branch, ohms);
        Self {
            branch,
            resistance: ohms,
        }
    }

    /// The branch this element occupies.
    pub fn branch(&self) -> BranchId {
        self.branch
    }

    /// Locally stored resistance in ohms.
    pub fn current_value(&self) -> f64 {
        self.resistance
    }

    /// Conductance of the stored resistance.
    pub fn conductance(&self) -> f64 {
        1.0 / self.resistance
    }

    /// Store a new resistance without touching the solver.
    ///
    /// # Panics
    /// If `ohms` is not strictly positive and finite.
    pub fn set_value(&mut self, ohms: f64) {
        assert_valid(self.branch, ohms);
        self.resistance = ohms;
    }

    /// Reconcile solver-side state for the branch before a change.
    pub fn synchronize_with_network<S: SolverService + ?Sized>(&self, solver: &mut S) {
        solver.synchronize_branch(self.branch);
    }

    /// Push the stored resistance into the solver.
    pub fn commit<S: SolverService + ?Sized>(&self, solver: &mut S) {
        solver.set_branch_resistance(self.branch, self.resistance);
    }

    /// Change the resistance following `policy`.
    ///
    /// `Deferred`: synchronize, write, schedule a re-solve `delay` later.
    /// `Immediate`: write, synchronize.
    pub fn apply<S: SolverService + ?Sized>(
        &mut self,
        solver: &mut S,
        ohms: f64,
        policy: ApplyPolicy,
        delay: SimTime,
    ) {
        let previous = self.resistance;
        match policy {
            ApplyPolicy::Deferred => {
                self.synchronize_with_network(solver);
                self.set_value(ohms);
                self.commit(solver);
                solver.schedule_resolve_after(self.branch, delay);
            }
            ApplyPolicy::Immediate => {
                self.set_value(ohms);
                self.commit(solver);
                self.synchronize_with_network(solver);
            }
        }
        log::debug!(
            "{} at {}: {:.6e} -> {:.6e} ohm ({:?})",
            self.branch,
            solver.now(),
            previous,
            ohms,
            policy
        );
    }
}

fn assert_valid(branch: BranchId, ohms: f64) {
    assert!(
        ohms.is_finite() && ohms > 0.0,
        "branch {branch}: resistance must be positive and finite, got {ohms}"
    );
}
