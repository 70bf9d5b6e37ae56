//! Error types for the analog switch model.
//!
//! This module provides a unified error type [`SwitchError`] that covers
//! configuration problems detected by the switch devices and the failures
//! the reference network host can report.

use thiserror::Error;

use crate::circuit::{BranchId, NodeId, SimTime};

/// Result type alias using [`SwitchError`].
pub type Result<T> = std::result::Result<T, SwitchError>;

/// Unified error type for all switch and network operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SwitchError {
    // ============ Configuration Errors ============
    /// Supply span is zero, negative or not a number
    #[error("Degenerate supply: high = {high} V, low = {low} V (span must be positive)")]
    DegenerateSupply { high: f64, low: f64 },

    /// Invalid construction-time parameter
    #[error("Invalid parameter '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    // ============ Topology Errors ============
    /// Node not present in the network
    #[error("Node '{node}' not found in network")]
    UnknownNode { node: NodeId },

    /// Branch not present in the network
    #[error("Branch '{branch}' not found in network")]
    UnknownBranch { branch: BranchId },

    // ============ Simulation Errors ============
    /// Matrix is singular and cannot be solved
    #[error("Singular matrix - network may have a floating node or a source loop")]
    SingularMatrix,

    /// Attempt to move simulated time backwards
    #[error("Cannot advance from {now} back to {requested}")]
    CausalityViolation { now: SimTime, requested: SimTime },
}

impl SwitchError {
    /// Create an invalid parameter error
    pub fn invalid_parameter(param: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }

    /// Create a degenerate supply error
    pub fn degenerate_supply(high: f64, low: f64) -> Self {
        Self::DegenerateSupply { high, low }
    }
}
