//! Supply-rail references.

use std::rc::Rc;

use crate::circuit::AnalogNet;

/// The two DC rails bounding a device's logic-level window.
pub trait SupplyRail {
    /// Positive rail voltage (VDD).
    fn high(&self) -> f64;

    /// Negative or ground rail voltage (VSS).
    fn low(&self) -> f64;

    /// Supply span `high - low`.
    fn span(&self) -> f64 {
        self.high() - self.low()
    }
}

/// Fixed rail voltages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DcSupply {
    pub high: f64,
    pub low: f64,
}

impl DcSupply {
    /// Create a fixed supply.
    pub fn new(high: f64, low: f64) -> Self {
        Self { high, low }
    }

    /// The 5 V / 0 V supply the on-resistance is calibrated against.
    pub fn five_volt() -> Self {
        Self::new(5.0, 0.0)
    }
}

impl SupplyRail for DcSupply {
    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }
}

/// Rails sampled from the VDD and VSS nets of the surrounding circuit.
#[derive(Debug, Clone)]
pub struct VddVss {
    vdd: AnalogNet,
    vss: AnalogNet,
}

impl VddVss {
    /// Create a supply reference from two nets.
    pub fn new(vdd: AnalogNet, vss: AnalogNet) -> Self {
        Self { vdd, vss }
    }

    /// The VDD net.
    pub fn vdd(&self) -> &AnalogNet {
        &self.vdd
    }

    /// The VSS net.
    pub fn vss(&self) -> &AnalogNet {
        &self.vss
    }
}

impl SupplyRail for VddVss {
    fn high(&self) -> f64 {
        self.vdd.voltage()
    }

    fn low(&self) -> f64 {
        self.vss.voltage()
    }
}

impl<T: SupplyRail + ?Sized> SupplyRail for &T {
    fn high(&self) -> f64 {
        (**self).high()
    }

    fn low(&self) -> f64 {
        (**self).low()
    }
}

impl<T: SupplyRail + ?Sized> SupplyRail for Rc<T> {
    fn high(&self) -> f64 {
        (**self).high()
    }

    fn low(&self) -> f64 {
        (**self).low()
    }
}
