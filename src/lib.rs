//! # cmos_switch
//!
//! A CD4066-style CMOS analog switch model for time-stepped resistor
//! network solvers.
//!
//! This library provides:
//! - The switch gate, modelled as a variable resistor whose value is
//!   recomputed from a control voltage on every evaluation
//! - The quad CD4066 package sharing one supply
//! - The [`SolverService`] boundary a host solver implements
//! - A small reference network host for tests and embedding
//!
//! ## Architecture
//!
//! - [`circuit`] - node/branch identifiers, simulated time, shared nets
//! - [`components`] - supply rails, control inputs, the resistor element
//!   and the switch devices
//! - [`solver`] - the service trait, re-solve queue and reference network
//!
//! ## Usage
//!
//! ```
//! use cmos_switch::circuit::NodeId;
//! use cmos_switch::components::{Cd4066Gate, DcSupply, Decision};
//! use cmos_switch::solver::Network;
//!
//! let mut net = Network::new();
//! let sig = net.add_node();
//! let branch = net.add_branch(sig, NodeId::GROUND, 1e9).unwrap();
//!
//! let mut gate = Cd4066Gate::new(branch, DcSupply::five_volt(), 4.0);
//! gate.reset(&net);
//! assert_eq!(gate.evaluate(&mut net).unwrap(), Decision::On);
//! assert_eq!(gate.resistance(), 270.0);
//! assert_eq!(net.pending_resolves(), 1);
//! ```
//!
//! ## Switching Model
//!
//! With `span = VDD - VSS` and `v = control - VSS`:
//!
//! 1. `v < 0.45 * span`: open, resistance `1 / gmin`
//! 2. `v > 0.55 * span`: on, resistance `BASER * 5 V / span`
//! 3. otherwise the previous resistance is kept
//!
//! A change is applied by synchronizing the branch, writing the value and
//! scheduling a re-solve 1 ns of simulated time later.

pub mod circuit;
pub mod components;
pub mod error;
pub mod solver;

// Re-export main types for convenience
pub use components::{Cd4066, Cd4066Gate, Decision, SwitchConfig, SwitchState};
pub use error::{Result, SwitchError};
pub use solver::{Network, SolverService};

/// Default on-resistance at a 5 V supply (ohms).
pub const DEFAULT_BASE_ON_RESISTANCE: f64 = 270.0;

/// Supply span the on-resistance is calibrated against (volts).
pub const NOMINAL_SUPPLY_SPAN: f64 = 5.0;
