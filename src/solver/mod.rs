//! Solver service boundary and a reference resistor-network host.
//!
//! Switch devices never own the equation solver. They call into it through
//! [`SolverService`], which covers everything a device may touch:
//!
//! - the minimum-conductance floor `gmin`, whose reciprocal is the largest
//!   resistance the solver treats as a numerically sane "open" branch
//! - the minimum representable resistance, below which values are clamped
//! - per-branch bookkeeping: synchronizing a branch before it changes and
//!   writing its new resistance
//! - scheduling a re-solve at a later simulated time
//!
//! [`Network`] is a small dense MNA host implementing the service. It is
//! what the integration tests drive, and a starting point for embedding the
//! devices in a larger simulator.

mod mna;
mod network;
mod queue;

pub use mna::MnaMatrix;
pub use network::{Network, NetworkConfig};
pub use queue::{ResolveQueue, Scheduled};

use crate::circuit::{BranchId, SimTime};

/// Default minimum conductance floor (siemens).
pub const DEFAULT_GMIN: f64 = 1e-9;

/// Default smallest resistance a branch may take (ohms).
pub const DEFAULT_MIN_RESISTANCE: f64 = 1e-3;

/// Delay between a resistance change and the re-solve it requests.
pub const RESOLVE_DELAY: SimTime = SimTime::from_ns(1);

/// Pivot magnitude below which the matrix is treated as singular.
pub const SINGULAR_PIVOT: f64 = 1e-15;

/// Smallest conductance floor the reference network accepts (siemens).
///
/// Keeps a node held only by open branches and its shunt well clear of
/// [`SINGULAR_PIVOT`].
pub const MIN_GMIN: f64 = 1e-12;

/// Services a switch device consumes from the host solver.
///
/// Implementations own all solver-side state. Devices only reach it through
/// these calls.
pub trait SolverService {
    /// Current minimum conductance floor. Must be strictly positive.
    fn gmin(&self) -> f64;

    /// Smallest resistance the solver can represent without losing
    /// numerical stability.
    fn min_resistance(&self) -> f64 {
        DEFAULT_MIN_RESISTANCE
    }

    /// Current simulated time.
    fn now(&self) -> SimTime;

    /// Whether the branch belongs to a time-stepped net.
    fn is_timestep(&self, branch: BranchId) -> bool;

    /// Reconcile solver-side state for the branch with its current value.
    fn synchronize_branch(&mut self, branch: BranchId);

    /// Write a new resistance for the branch.
    fn set_branch_resistance(&mut self, branch: BranchId, ohms: f64);

    /// Request a re-solve of the branch's network `delay` after `now()`.
    ///
    /// Repeated requests must not grow pending work without bound.
    fn schedule_resolve_after(&mut self, branch: BranchId, delay: SimTime);
}

impl<S: SolverService + ?Sized> SolverService for &mut S {
    fn gmin(&self) -> f64 {
        (**self).gmin()
    }

    fn min_resistance(&self) -> f64 {
        (**self).min_resistance()
    }

    fn now(&self) -> SimTime {
        (**self).now()
    }

    fn is_timestep(&self, branch: BranchId) -> bool {
        (**self).is_timestep(branch)
    }

    fn synchronize_branch(&mut self, branch: BranchId) {
        (**self).synchronize_branch(branch)
    }

    fn set_branch_resistance(&mut self, branch: BranchId, ohms: f64) {
        (**self).set_branch_resistance(branch, ohms)
    }

    fn schedule_resolve_after(&mut self, branch: BranchId, delay: SimTime) {
        (**self).schedule_resolve_after(branch, delay)
    }
}
