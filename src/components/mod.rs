//! Device models for the analog switch.
//!
//! This module provides:
//! - Supply-rail references: [`DcSupply`], [`VddVss`]
//! - Control-voltage inputs (any [`ControlVoltage`], including nets)
//! - The variable resistor element a switch owns: [`VariableResistor`]
//! - The switch itself: [`Cd4066Gate`], and the quad package [`Cd4066`]
//!
//! Devices read their inputs and write their branch through the
//! [`SolverService`](crate::solver::SolverService) boundary only.

mod control;
mod package;
mod resistor;
mod supply;
mod switch;

pub use control::ControlVoltage;
pub use package::{Cd4066, GATES_PER_PACKAGE};
pub use resistor::{ApplyPolicy, VariableResistor};
pub use supply::{DcSupply, SupplyRail, VddVss};
pub use switch::{
    on_resistance, Cd4066Gate, Decision, SwitchConfig, SwitchState, HIGH_THRESHOLD_RATIO,
    LOW_THRESHOLD_RATIO,
};
