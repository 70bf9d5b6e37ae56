//! Control-voltage inputs.

use crate::circuit::AnalogNet;

/// A read-only sample of the voltage at a control terminal.
pub trait ControlVoltage {
    /// Instantaneous control voltage (absolute, not relative to a rail).
    fn voltage(&self) -> f64;
}

impl ControlVoltage for AnalogNet {
    fn voltage(&self) -> f64 {
        AnalogNet::voltage(self)
    }
}

/// A constant control level.
impl ControlVoltage for f64 {
    fn voltage(&self) -> f64 {
        *self
    }
}

impl<T: ControlVoltage + ?Sized> ControlVoltage for &T {
    fn voltage(&self) -> f64 {
        (**self).voltage()
    }
}
