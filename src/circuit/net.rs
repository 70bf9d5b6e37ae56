//! Shared net handles.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// A shared, single-threaded handle to the voltage of one analog net.
///
/// The network that owns the net writes the solved voltage; devices hold
/// clones and only ever read. Clones refer to the same net.
#[derive(Clone, Default)]
pub struct AnalogNet(Rc<Cell<f64>>);

impl AnalogNet {
    /// Create a net at the given voltage.
    pub fn new(voltage: f64) -> Self {
        Self(Rc::new(Cell::new(voltage)))
    }

    /// Sample the net voltage.
    pub fn voltage(&self) -> f64 {
        self.0.get()
    }

    /// Overwrite the net voltage. Reserved for the owning network.
    pub fn set_voltage(&self, voltage: f64) {
        self.0.set(voltage);
    }

    /// Check whether two handles refer to the same net.
    pub fn same_net(&self, other: &AnalogNet) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for AnalogNet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnalogNet({} V)", self.voltage())
    }
}
