//! Network identifiers, simulated time and shared nets.
//!
//! These are the small value types every other module speaks in: nodes and
//! branches of the solved resistor network, the solver's virtual clock, and
//! the [`AnalogNet`] handle through which devices sample voltages.

mod net;
mod types;

pub use net::AnalogNet;
pub use types::*;
