//! CD4066-style CMOS analog switch gate.
//!
//! The gate is a variable resistor between its two signal terminals. Each
//! evaluation compares the control voltage, measured from VSS, against a
//! window around mid-rail:
//!
//! ```text
//!   control - VSS < 0.45 * span   ->  open   (R = 1 / gmin)
//!   control - VSS > 0.55 * span   ->  on     (R = BASER * 5 V / span)
//!   otherwise                     ->  hold   (R unchanged)
//! ```
//!
//! There is no ramp between the two regimes. The on-resistance is
//! calibrated at a 5 V supply and falls as the supply span grows.

use crate::circuit::{BranchId, SimTime};
use crate::error::{Result, SwitchError};
use crate::solver::{SolverService, DEFAULT_GMIN, RESOLVE_DELAY};
use crate::{DEFAULT_BASE_ON_RESISTANCE, NOMINAL_SUPPLY_SPAN};

use super::control::ControlVoltage;
use super::resistor::{ApplyPolicy, VariableResistor};
use super::supply::SupplyRail;

/// Fraction of the supply span below which the control input reads low.
pub const LOW_THRESHOLD_RATIO: f64 = 0.45;

/// Fraction of the supply span above which the control input reads high.
pub const HIGH_THRESHOLD_RATIO: f64 = 0.55;

/// Conduction state of a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchState {
    /// Resistance at the solver's open value `1 / gmin`.
    Open,
    /// Resistance at the supply-scaled on value.
    On,
}

/// Outcome of classifying the control input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Control is low: switch opens.
    Open,
    /// Control is high: switch conducts.
    On,
    /// Control is inside the indeterminate band: nothing changes.
    Hold,
}

/// Configuration for a gate.
#[derive(Debug, Clone)]
pub struct SwitchConfig {
    /// On-resistance at a 5 V supply (ohms), the `BASER` parameter.
    pub base_on_resistance: f64,
    /// Ordering used when the resistance changes.
    pub policy: ApplyPolicy,
    /// Delay before the re-solve requested by a deferred change.
    pub resolve_delay: SimTime,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            base_on_resistance: DEFAULT_BASE_ON_RESISTANCE,
            policy: ApplyPolicy::Deferred,
            resolve_delay: RESOLVE_DELAY,
        }
    }
}

impl SwitchConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the on-resistance at a 5 V supply.
    ///
    /// Realistic analog switches sit between 1 ohm and 10 kohm.
    pub fn with_base_on_resistance(mut self, ohms: f64) -> Self {
        self.base_on_resistance = ohms;
        self
    }

    /// Set the apply policy.
    pub fn with_policy(mut self, policy: ApplyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the re-solve delay.
    pub fn with_resolve_delay(mut self, delay: SimTime) -> Self {
        self.resolve_delay = delay;
        self
    }

    /// Check the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(self.base_on_resistance.is_finite() && self.base_on_resistance > 0.0) {
            return Err(SwitchError::invalid_parameter(
                "BASER",
                format!(
                    "on-resistance must be positive and finite, got {}",
                    self.base_on_resistance
                ),
            ));
        }
        if !on_resistance(self.base_on_resistance, NOMINAL_SUPPLY_SPAN).is_finite() {
            return Err(SwitchError::invalid_parameter(
                "BASER",
                format!(
                    "on-resistance {} ohm overflows at a {} V supply",
                    self.base_on_resistance, NOMINAL_SUPPLY_SPAN
                ),
            ));
        }
        Ok(())
    }
}

/// On-resistance for a supply span, scaled from the 5 V calibration.
///
/// Doubling the span halves the resistance.
pub fn on_resistance(base_on_resistance: f64, span: f64) -> f64 {
    base_on_resistance * NOMINAL_SUPPLY_SPAN / span
}

/// One CD4066 analog switch gate.
///
/// Owns the resistor for its branch and reads the supply rails and the
/// control terminal. `P` and `C` are usually net-backed
/// ([`VddVss`](super::VddVss), [`AnalogNet`](crate::circuit::AnalogNet)).
#[derive(Debug, Clone)]
pub struct Cd4066Gate<P, C> {
    resistor: VariableResistor,
    supply: P,
    control: C,
    config: SwitchConfig,
    state: SwitchState,
}

impl<P: SupplyRail, C: ControlVoltage> Cd4066Gate<P, C> {
    /// Create a gate with the default configuration (`BASER` = 270 ohm).
    pub fn new(branch: BranchId, supply: P, control: C) -> Self {
        Self::build(branch, supply, control, SwitchConfig::default())
    }

    /// Create a gate with a custom configuration.
    pub fn with_config(
        branch: BranchId,
        supply: P,
        control: C,
        config: SwitchConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(branch, supply, control, config))
    }

    fn build(branch: BranchId, supply: P, control: C, config: SwitchConfig) -> Self {
        Self {
            resistor: VariableResistor::new(branch, 1.0 / DEFAULT_GMIN),
            supply,
            control,
            config,
            state: SwitchState::Open,
        }
    }

    /// Put the gate in the open state at the solver's current `gmin`.
    ///
    /// Only the local resistor value changes; call [`commit`](Self::commit)
    /// or evaluate to hand it to the solver.
    pub fn reset<S: SolverService + ?Sized>(&mut self, solver: &S) {
        self.resistor.set_value(open_resistance(solver));
        self.state = SwitchState::Open;
    }

    /// Push the locally stored resistance into the solver.
    pub fn commit<S: SolverService + ?Sized>(&self, solver: &mut S) {
        self.resistor.commit(solver);
    }

    /// Classify the current control input without changing anything.
    pub fn classify(&self) -> Result<Decision> {
        let span = self.checked_span()?;
        let relative = self.control.voltage() - self.supply.low();

        let decision = if relative < LOW_THRESHOLD_RATIO * span {
            Decision::Open
        } else if relative > HIGH_THRESHOLD_RATIO * span {
            Decision::On
        } else {
            Decision::Hold
        };
        log::trace!(
            "{}: control {:.4} V of {:.4} V span -> {:?}",
            self.branch(),
            relative,
            span,
            decision
        );
        Ok(decision)
    }

    /// Evaluate the control input and update the branch.
    ///
    /// A degenerate supply is reported before anything is written. In the
    /// hold band the solver is not touched at all.
    pub fn evaluate<S: SolverService + ?Sized>(&mut self, solver: &mut S) -> Result<Decision> {
        let target = self.target(solver).map_err(|err| {
            log::warn!("{}: {}", self.branch(), err);
            err
        })?;
        let decision = match target {
            Some((_, SwitchState::Open)) => Decision::Open,
            Some((_, SwitchState::On)) => Decision::On,
            None => Decision::Hold,
        };

        if let Some((ohms, state)) = target {
            self.resistor
                .apply(solver, ohms, self.config.policy, self.config.resolve_delay);
            self.state = state;
        }

        Ok(decision)
    }

    fn target<S: SolverService + ?Sized>(&self, solver: &S) -> Result<Option<(f64, SwitchState)>> {
        Ok(match self.classify()? {
            Decision::Open => Some((open_resistance(solver), SwitchState::Open)),
            Decision::On => Some((self.clamped_on_resistance(solver)?, SwitchState::On)),
            Decision::Hold => None,
        })
    }

    /// Take the apply policy from the solver's participation mode for
    /// this gate's branch.
    ///
    /// Call once while building the circuit, before the first evaluation.
    pub fn follow_network<S: SolverService + ?Sized>(&mut self, solver: &S) {
        self.config.policy = ApplyPolicy::for_network(solver.is_timestep(self.branch()));
    }

    /// On-resistance for the present supply, before clamping.
    ///
    /// A span too small to give a finite resistance is reported as a
    /// degenerate supply.
    pub fn on_resistance(&self) -> Result<f64> {
        let span = self.checked_span()?;
        let ohms = on_resistance(self.config.base_on_resistance, span);
        if ohms.is_finite() {
            Ok(ohms)
        } else {
            Err(SwitchError::degenerate_supply(
                self.supply.high(),
                self.supply.low(),
            ))
        }
    }

    fn clamped_on_resistance<S: SolverService + ?Sized>(&self, solver: &S) -> Result<f64> {
        let ohms = self.on_resistance()?;
        let floor = solver.min_resistance();
        if ohms <= floor {
            log::warn!(
                "{}: on-resistance {:.3e} ohm clamped to solver floor {:.3e} ohm",
                self.branch(),
                ohms,
                floor
            );
            return Ok(floor);
        }
        Ok(ohms)
    }

    fn checked_span(&self) -> Result<f64> {
        let span = self.supply.span();
        if span.is_finite() && span > 0.0 {
            Ok(span)
        } else {
            Err(SwitchError::degenerate_supply(
                self.supply.high(),
                self.supply.low(),
            ))
        }
    }

    /// Locally stored branch resistance (ohms).
    pub fn resistance(&self) -> f64 {
        self.resistor.current_value()
    }

    /// Current conduction state.
    pub fn state(&self) -> SwitchState {
        self.state
    }

    /// The branch this gate drives.
    pub fn branch(&self) -> BranchId {
        self.resistor.branch()
    }

    /// The owned resistor element.
    pub fn resistor(&self) -> &VariableResistor {
        &self.resistor
    }

    /// Get the configuration.
    pub fn config(&self) -> &SwitchConfig {
        &self.config
    }

    /// The supply rails this gate reads.
    pub fn supply(&self) -> &P {
        &self.supply
    }

    /// The control input this gate reads.
    pub fn control(&self) -> &C {
        &self.control
    }
}

fn open_resistance<S: SolverService + ?Sized>(solver: &S) -> f64 {
    1.0 / solver.gmin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::AnalogNet;
    use crate::components::DcSupply;
    use approx::assert_relative_eq;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Synchronize(BranchId),
        SetResistance(BranchId, f64),
        Schedule(BranchId, SimTime),
    }

    struct RecordingSolver {
        gmin: f64,
        min_resistance: f64,
        timestep: bool,
        calls: Vec<Call>,
    }

    impl RecordingSolver {
        fn new() -> Self {
            Self {
                gmin: 1e-9,
                min_resistance: 1e-3,
                timestep: true,
                calls: Vec::new(),
            }
        }

        fn schedules(&self) -> usize {
            self.calls
                .iter()
                .filter(|c| matches!(c, Call::Schedule(..)))
                .count()
        }
    }

    impl SolverService for RecordingSolver {
        fn gmin(&self) -> f64 {
            self.gmin
        }

        fn min_resistance(&self) -> f64 {
            self.min_resistance
        }

        fn now(&self) -> SimTime {
            SimTime::ZERO
        }

        fn is_timestep(&self, _branch: BranchId) -> bool {
            self.timestep
        }

        fn synchronize_branch(&mut self, branch: BranchId) {
            self.calls.push(Call::Synchronize(branch));
        }

        fn set_branch_resistance(&mut self, branch: BranchId, ohms: f64) {
            self.calls.push(Call::SetResistance(branch, ohms));
        }

        fn schedule_resolve_after(&mut self, branch: BranchId, delay: SimTime) {
            self.calls.push(Call::Schedule(branch, delay));
        }
    }

    fn gate(high: f64, low: f64, control: f64) -> Cd4066Gate<DcSupply, f64> {
        Cd4066Gate::new(BranchId(0), DcSupply::new(high, low), control)
    }

    fn with_control(g: &Cd4066Gate<DcSupply, f64>, control: f64) -> Cd4066Gate<DcSupply, f64> {
        let mut next = Cd4066Gate::with_config(g.branch(), *g.supply(), control, g.config().clone())
            .unwrap();
        next.resistor = g.resistor.clone();
        next.state = g.state;
        next
    }

    #[test]
    fn test_high_control_turns_on() {
        let mut solver = RecordingSolver::new();
        let mut g = gate(5.0, 0.0, 4.0);
        g.reset(&solver);

        assert_eq!(g.evaluate(&mut solver).unwrap(), Decision::On);
        assert_relative_eq!(g.resistance(), 270.0);
        assert_eq!(g.state(), SwitchState::On);
    }

    #[test]
    fn test_low_control_opens() {
        let mut solver = RecordingSolver::new();
        let mut g = gate(5.0, 0.0, 1.0);
        g.reset(&solver);

        assert_eq!(g.evaluate(&mut solver).unwrap(), Decision::Open);
        assert_relative_eq!(g.resistance(), 1.0 / solver.gmin);
        assert_eq!(g.state(), SwitchState::Open);
    }

    #[test]
    fn test_mid_rail_holds_previous_value() {
        let mut solver = RecordingSolver::new();
        let mut g = gate(5.0, 0.0, 4.0);
        g.reset(&solver);
        g.evaluate(&mut solver).unwrap();
        solver.calls.clear();

        let mut held = with_control(&g, 2.5);
        for _ in 0..5 {
            assert_eq!(held.evaluate(&mut solver).unwrap(), Decision::Hold);
        }
        assert_relative_eq!(held.resistance(), 270.0);
        assert_eq!(held.state(), SwitchState::On);
        assert!(solver.calls.is_empty());
    }

    #[test]
    fn test_band_edges_hold() {
        let mut solver = RecordingSolver::new();
        for control in [LOW_THRESHOLD_RATIO * 5.0, HIGH_THRESHOLD_RATIO * 5.0] {
            let mut g = gate(5.0, 0.0, control);
            g.reset(&solver);
            let before = g.resistance();
            assert_eq!(g.evaluate(&mut solver).unwrap(), Decision::Hold);
            assert_eq!(g.resistance(), before);
        }
        assert!(solver.calls.is_empty());
    }

    #[test]
    fn test_decision_ignores_prior_state() {
        let mut solver = RecordingSolver::new();
        let on = {
            let mut g = gate(5.0, 0.0, 4.5);
            g.reset(&solver);
            g.evaluate(&mut solver).unwrap();
            g
        };

        let mut opened = with_control(&on, 0.5);
        assert_eq!(opened.evaluate(&mut solver).unwrap(), Decision::Open);
        assert_relative_eq!(opened.resistance(), 1e9, max_relative = 1e-12);

        let mut still_on = with_control(&on, 4.9);
        assert_eq!(still_on.evaluate(&mut solver).unwrap(), Decision::On);
        assert_relative_eq!(still_on.resistance(), 270.0);
    }

    #[test]
    fn test_on_resistance_scales_with_span() {
        let mut solver = RecordingSolver::new();
        let mut g = gate(10.0, 0.0, 9.0);
        g.reset(&solver);

        assert_eq!(g.evaluate(&mut solver).unwrap(), Decision::On);
        assert_relative_eq!(g.resistance(), 135.0);

        assert_relative_eq!(on_resistance(270.0, 2.5), 540.0);
        assert!(on_resistance(270.0, 6.0) < on_resistance(270.0, 5.0));
        assert_relative_eq!(on_resistance(100.0, 3.0), 2.0 * on_resistance(100.0, 6.0));
    }

    #[test]
    fn test_relative_to_low_rail() {
        let mut solver = RecordingSolver::new();
        // Span 5 V from -5 V to 0 V; -1 V is 80% up the span
        let mut g = gate(0.0, -5.0, -1.0);
        g.reset(&solver);
        assert_eq!(g.evaluate(&mut solver).unwrap(), Decision::On);
        assert_relative_eq!(g.resistance(), 270.0);

        // 0 V control on a 12 V / 2 V supply is below VSS entirely
        let mut g = gate(12.0, 2.0, 0.0);
        g.reset(&solver);
        assert_eq!(g.evaluate(&mut solver).unwrap(), Decision::Open);
    }

    #[test]
    fn test_deferred_ordering_contract() {
        let mut solver = RecordingSolver::new();
        let mut g = gate(5.0, 0.0, 4.0);
        g.reset(&solver);
        g.evaluate(&mut solver).unwrap();

        assert_eq!(
            solver.calls,
            vec![
                Call::Synchronize(BranchId(0)),
                Call::SetResistance(BranchId(0), 270.0),
                Call::Schedule(BranchId(0), SimTime::from_ns(1)),
            ]
        );
    }

    #[test]
    fn test_immediate_ordering_contract() {
        let mut solver = RecordingSolver::new();
        let config = SwitchConfig::new().with_policy(ApplyPolicy::Immediate);
        let mut g =
            Cd4066Gate::with_config(BranchId(3), DcSupply::five_volt(), 0.2, config).unwrap();
        g.reset(&solver);
        g.evaluate(&mut solver).unwrap();

        assert_eq!(
            solver.calls,
            vec![
                Call::SetResistance(BranchId(3), 1.0 / solver.gmin),
                Call::Synchronize(BranchId(3)),
            ]
        );
    }

    #[test]
    fn test_one_resolve_per_evaluation() {
        let mut solver = RecordingSolver::new();
        let mut g = gate(5.0, 0.0, 4.0);
        g.reset(&solver);

        for n in 1..=4 {
            g.evaluate(&mut solver).unwrap();
            assert_eq!(solver.schedules(), n);
        }

        let config = SwitchConfig::new().with_resolve_delay(SimTime::from_ps(250));
        let mut g = Cd4066Gate::with_config(BranchId(1), DcSupply::five_volt(), 0.0, config).unwrap();
        solver.calls.clear();
        g.evaluate(&mut solver).unwrap();
        assert_eq!(solver.calls.last(), Some(&Call::Schedule(BranchId(1), SimTime::from_ps(250))));
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut solver = RecordingSolver::new();
        let mut g = gate(5.0, 0.0, 4.0);
        g.reset(&solver);
        g.evaluate(&mut solver).unwrap();
        solver.calls.clear();

        for _ in 0..3 {
            g.reset(&solver);
            assert_eq!(g.state(), SwitchState::Open);
            assert_relative_eq!(g.resistance(), 1.0 / solver.gmin);
        }

        // Open value follows gmin at the time of the call
        solver.gmin = 1e-12;
        g.reset(&solver);
        assert_relative_eq!(g.resistance(), 1e12, max_relative = 1e-12);
        assert!(solver.calls.is_empty());
    }

    #[test]
    fn test_open_value_tracks_gmin_between_passes() {
        let mut solver = RecordingSolver::new();
        let mut g = gate(5.0, 0.0, 0.0);
        g.reset(&solver);

        solver.gmin = 1e-6;
        g.evaluate(&mut solver).unwrap();
        assert_relative_eq!(g.resistance(), 1e6, max_relative = 1e-12);
    }

    #[test]
    fn test_degenerate_supply_is_rejected() {
        let mut solver = RecordingSolver::new();
        for (high, low) in [(5.0, 5.0), (0.0, 5.0), (f64::NAN, 0.0), (f64::INFINITY, 0.0)] {
            let mut g = gate(high, low, 4.0);
            g.reset(&solver);
            let before = g.resistance();

            assert!(matches!(
                g.evaluate(&mut solver),
                Err(SwitchError::DegenerateSupply { .. })
            ));
            assert!(g.on_resistance().is_err());
            assert_eq!(g.resistance(), before);
        }
        assert!(solver.calls.is_empty());
    }

    #[test]
    fn test_on_resistance_clamped_to_floor() {
        let mut solver = RecordingSolver::new();
        solver.min_resistance = 10.0;
        let config = SwitchConfig::new().with_base_on_resistance(1.0);
        let mut g = Cd4066Gate::with_config(BranchId(0), DcSupply::new(15.0, 0.0), 14.0, config)
            .unwrap();
        g.reset(&solver);

        assert_relative_eq!(g.on_resistance().unwrap(), 1.0 / 3.0);
        g.evaluate(&mut solver).unwrap();
        assert_eq!(g.resistance(), 10.0);
    }

    #[test]
    fn test_tiny_span_is_rejected() {
        let mut solver = RecordingSolver::new();
        let mut g = gate(1e-310, 0.0, 1e-310);
        g.reset(&solver);
        let before = g.resistance();

        assert_eq!(g.classify().unwrap(), Decision::On);
        assert!(matches!(
            g.evaluate(&mut solver),
            Err(SwitchError::DegenerateSupply { .. })
        ));
        assert_eq!(g.resistance(), before);
        assert_eq!(g.state(), SwitchState::Open);
        assert!(solver.calls.is_empty());
    }

    #[test]
    fn test_large_base_overflowing_small_span() {
        let mut solver = RecordingSolver::new();
        let config = SwitchConfig::new().with_base_on_resistance(1e307);
        let mut g =
            Cd4066Gate::with_config(BranchId(0), DcSupply::new(0.01, 0.0), 0.01, config).unwrap();
        g.reset(&solver);

        assert!(matches!(
            g.evaluate(&mut solver),
            Err(SwitchError::DegenerateSupply { .. })
        ));
        assert!(solver.calls.is_empty());
    }

    #[test]
    fn test_invalid_base_resistance() {
        for base in [0.0, -270.0, f64::NAN, f64::INFINITY, 1e308] {
            let config = SwitchConfig::new().with_base_on_resistance(base);
            let result = Cd4066Gate::with_config(BranchId(0), DcSupply::five_volt(), 0.0, config);
            assert!(matches!(result, Err(SwitchError::InvalidParameter { .. })));
        }
    }

    #[test]
    fn test_nan_control_holds() {
        let mut solver = RecordingSolver::new();
        let ctl = AnalogNet::new(4.0);
        let mut g = Cd4066Gate::new(BranchId(0), DcSupply::five_volt(), ctl.clone());
        g.reset(&solver);
        g.evaluate(&mut solver).unwrap();
        solver.calls.clear();

        ctl.set_voltage(f64::NAN);
        assert_eq!(g.evaluate(&mut solver).unwrap(), Decision::Hold);
        assert_relative_eq!(g.resistance(), 270.0);
        assert_eq!(g.state(), SwitchState::On);
        assert!(solver.calls.is_empty());
    }

    #[test]
    fn test_policy_follows_network() {
        let mut solver = RecordingSolver::new();
        solver.timestep = false;
        let mut g = gate(5.0, 0.0, 4.0);
        g.follow_network(&solver);
        assert_eq!(g.config().policy, ApplyPolicy::Immediate);

        g.reset(&solver);
        g.evaluate(&mut solver).unwrap();
        assert_eq!(
            solver.calls,
            vec![
                Call::SetResistance(BranchId(0), 270.0),
                Call::Synchronize(BranchId(0)),
            ]
        );

        solver.timestep = true;
        g.follow_network(&solver);
        assert_eq!(g.config().policy, ApplyPolicy::Deferred);
    }

    #[test]
    fn test_net_driven_control() {
        let mut solver = RecordingSolver::new();
        let ctl = AnalogNet::new(0.0);
        let mut g = Cd4066Gate::new(BranchId(0), DcSupply::five_volt(), ctl.clone());
        g.reset(&solver);

        assert_eq!(g.classify().unwrap(), Decision::Open);
        ctl.set_voltage(5.0);
        assert_eq!(g.evaluate(&mut solver).unwrap(), Decision::On);
        ctl.set_voltage(2.6);
        assert_eq!(g.evaluate(&mut solver).unwrap(), Decision::Hold);
        assert_eq!(g.state(), SwitchState::On);
        ctl.set_voltage(2.0);
        assert_eq!(g.evaluate(&mut solver).unwrap(), Decision::Open);
        assert_eq!(g.state(), SwitchState::Open);
    }
}
