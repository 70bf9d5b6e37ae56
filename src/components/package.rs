//! The CD4066 quad package: four gates on one VDD/VSS pair.

use std::rc::Rc;

use crate::circuit::BranchId;
use crate::error::Result;
use crate::solver::SolverService;

use super::control::ControlVoltage;
use super::supply::SupplyRail;
use super::switch::{Cd4066Gate, Decision, SwitchConfig};

/// Number of independent switches in one package.
pub const GATES_PER_PACKAGE: usize = 4;

/// A quad bilateral switch.
///
/// The four gates are independent except that they share the supply.
///
/// ```text
///         +---+--+---+
///      A1 |1  +--+ 14| VDD
///      B1 |2       13| X1
///      B2 |3       12| X4
///      A2 |4  4066 11| A4
///      X2 |5       10| B4
///      X3 |6        9| B3
///     VSS |7        8| A3
///         +----------+
/// ```
#[derive(Debug)]
pub struct Cd4066<P, C> {
    supply: Rc<P>,
    gates: [Cd4066Gate<Rc<P>, C>; GATES_PER_PACKAGE],
}

impl<P: SupplyRail, C: ControlVoltage> Cd4066<P, C> {
    /// Create a package. Each channel is the branch a gate drives and its
    /// control input.
    pub fn new(
        supply: P,
        channels: [(BranchId, C); GATES_PER_PACKAGE],
        config: SwitchConfig,
    ) -> Result<Self> {
        let supply = Rc::new(supply);
        let make = |(branch, control): (BranchId, C)| {
            Cd4066Gate::with_config(branch, Rc::clone(&supply), control, config.clone())
        };
        let [a, b, c, d] = channels;
        let gates = [make(a)?, make(b)?, make(c)?, make(d)?];
        Ok(Self { supply, gates })
    }

    /// Reset every gate to open.
    pub fn reset<S: SolverService + ?Sized>(&mut self, solver: &S) {
        for gate in &mut self.gates {
            gate.reset(solver);
        }
    }

    /// Push every gate's stored resistance into the solver.
    pub fn commit<S: SolverService + ?Sized>(&self, solver: &mut S) {
        for gate in &self.gates {
            gate.commit(solver);
        }
    }

    /// Evaluate all four gates in pin order.
    ///
    /// The supply is shared, so a degenerate supply fails on the first gate
    /// before any branch is written.
    pub fn evaluate<S: SolverService + ?Sized>(
        &mut self,
        solver: &mut S,
    ) -> Result<[Decision; GATES_PER_PACKAGE]> {
        let mut decisions = [Decision::Hold; GATES_PER_PACKAGE];
        for (gate, decision) in self.gates.iter_mut().zip(decisions.iter_mut()) {
            *decision = gate.evaluate(solver)?;
        }
        Ok(decisions)
    }

    /// Take every gate's apply policy from the solver's participation
    /// mode.
    pub fn follow_network<S: SolverService + ?Sized>(&mut self, solver: &S) {
        for gate in &mut self.gates {
            gate.follow_network(solver);
        }
    }

    /// Gate at a pin-order index, `None` past the fourth.
    pub fn gate(&self, index: usize) -> Option<&Cd4066Gate<Rc<P>, C>> {
        self.gates.get(index)
    }

    /// Mutable gate at a pin-order index.
    pub fn gate_mut(&mut self, index: usize) -> Option<&mut Cd4066Gate<Rc<P>, C>> {
        self.gates.get_mut(index)
    }

    /// All four gates in pin order.
    pub fn gates(&self) -> &[Cd4066Gate<Rc<P>, C>; GATES_PER_PACKAGE] {
        &self.gates
    }

    /// The shared supply.
    pub fn supply(&self) -> &P {
        &self.supply
    }
}
