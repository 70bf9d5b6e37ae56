//! Reference resistor-network host.

use crate::circuit::{AnalogNet, BranchId, NodeId, SimTime};
use crate::error::{Result, SwitchError};

use super::mna::MnaMatrix;
use super::queue::{ResolveQueue, Scheduled};
use super::{SolverService, DEFAULT_GMIN, DEFAULT_MIN_RESISTANCE, MIN_GMIN};

/// Configuration for the reference network.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Minimum conductance from every node to ground (siemens).
    pub gmin: f64,
    /// Smallest resistance a branch may take (ohms).
    pub min_resistance: f64,
    /// Whether the network is time-stepped.
    pub timestep: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            gmin: DEFAULT_GMIN,
            min_resistance: DEFAULT_MIN_RESISTANCE,
            timestep: true,
        }
    }
}

impl NetworkConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum conductance floor.
    ///
    /// Larger values make the open resistance `1 / gmin` smaller and the
    /// system better conditioned.
    pub fn with_gmin(mut self, gmin: f64) -> Self {
        self.gmin = gmin;
        self
    }

    /// Set the minimum branch resistance.
    pub fn with_min_resistance(mut self, min_resistance: f64) -> Self {
        self.min_resistance = min_resistance;
        self
    }

    /// Mark the network as time-stepped or not.
    pub fn with_timestep(mut self, timestep: bool) -> Self {
        self.timestep = timestep;
        self
    }

    /// Check the configuration for values the solver cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(self.gmin.is_finite() && self.gmin > 0.0) {
            return Err(SwitchError::invalid_parameter(
                "gmin",
                format!("must be positive and finite, got {}", self.gmin),
            ));
        }
        if self.gmin < MIN_GMIN {
            return Err(SwitchError::invalid_parameter(
                "gmin",
                format!("must be at least {MIN_GMIN:e}, got {:e}", self.gmin),
            ));
        }
        if !(self.min_resistance.is_finite() && self.min_resistance > 0.0) {
            return Err(SwitchError::invalid_parameter(
                "min_resistance",
                format!("must be positive and finite, got {}", self.min_resistance),
            ));
        }
        if self.min_resistance >= 1.0 / self.gmin {
            return Err(SwitchError::invalid_parameter(
                "min_resistance",
                "must be below the open resistance 1 / gmin",
            ));
        }
        Ok(())
    }
}

/// A resistive branch between two nodes.
#[derive(Debug, Clone)]
struct Branch {
    nodes: [NodeId; 2],
    resistance: f64,
}

/// An ideal DC source from a node to ground.
#[derive(Debug, Clone)]
struct Source {
    node: NodeId,
    voltage: f64,
}

/// A small dense resistor network implementing [`SolverService`].
///
/// Nodes are exposed as [`AnalogNet`] handles that are refreshed on every
/// solve. Every non-ground node carries a `gmin` shunt to ground, so the
/// system stays solvable even with all switches open.
pub struct Network {
    config: NetworkConfig,
    /// Node voltages, index 0 is ground
    nets: Vec<AnalogNet>,
    branches: Vec<Branch>,
    sources: Vec<Source>,
    queue: ResolveQueue,
    now: SimTime,
    /// Branch values changed since the last solve
    dirty: bool,
    /// Error from a solve triggered through the service interface
    fault: Option<SwitchError>,
    solve_count: usize,
    coalesced: usize,
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

impl Network {
    /// Create an empty network with default configuration.
    pub fn new() -> Self {
        Self::build(NetworkConfig::default())
    }

    /// Create an empty network with custom configuration.
    pub fn with_config(config: NetworkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: NetworkConfig) -> Self {
        Self {
            config,
            nets: vec![AnalogNet::new(0.0)],
            branches: Vec::new(),
            sources: Vec::new(),
            queue: ResolveQueue::new(),
            now: SimTime::ZERO,
            dirty: true,
            fault: None,
            solve_count: 0,
            coalesced: 0,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Change the conductance floor between solver passes.
    pub fn set_gmin(&mut self, gmin: f64) -> Result<()> {
        let config = self.config.clone().with_gmin(gmin);
        config.validate()?;
        self.config = config;
        self.dirty = true;
        Ok(())
    }

    /// Add a node and return its ID.
    pub fn add_node(&mut self) -> NodeId {
        self.nets.push(AnalogNet::new(0.0));
        NodeId(self.nets.len() - 1)
    }

    /// Number of nodes, including ground.
    pub fn num_nodes(&self) -> usize {
        self.nets.len()
    }

    /// Get a handle to a node's net.
    pub fn net(&self, node: NodeId) -> Result<AnalogNet> {
        self.nets
            .get(node.0)
            .cloned()
            .ok_or(SwitchError::UnknownNode { node })
    }

    /// Get the last solved voltage at a node.
    pub fn voltage(&self, node: NodeId) -> Result<f64> {
        self.net(node).map(|net| net.voltage())
    }

    /// Add a resistive branch between two nodes.
    pub fn add_branch(&mut self, n1: NodeId, n2: NodeId, ohms: f64) -> Result<BranchId> {
        self.check_node(n1)?;
        self.check_node(n2)?;
        if !(ohms.is_finite() && ohms > 0.0) {
            return Err(SwitchError::invalid_parameter(
                "resistance",
                format!("must be positive and finite, got {ohms}"),
            ));
        }
        self.branches.push(Branch {
            nodes: [n1, n2],
            resistance: ohms,
        });
        self.dirty = true;
        Ok(BranchId(self.branches.len() - 1))
    }

    /// Get a branch's current resistance.
    pub fn branch_resistance(&self, branch: BranchId) -> Result<f64> {
        self.branches
            .get(branch.0)
            .map(|b| b.resistance)
            .ok_or(SwitchError::UnknownBranch { branch })
    }

    /// Drive a node with an ideal DC source to ground.
    ///
    /// Driving an already driven node replaces the source voltage.
    pub fn drive(&mut self, node: NodeId, voltage: f64) -> Result<()> {
        self.check_node(node)?;
        if node.is_ground() {
            return Err(SwitchError::invalid_parameter(
                "node",
                "ground cannot be driven",
            ));
        }
        match self.sources.iter_mut().find(|s| s.node == node) {
            Some(source) => source.voltage = voltage,
            None => self.sources.push(Source { node, voltage }),
        }
        self.dirty = true;
        Ok(())
    }

    fn check_node(&self, node: NodeId) -> Result<()> {
        if node.0 < self.nets.len() {
            Ok(())
        } else {
            Err(SwitchError::UnknownNode { node })
        }
    }

    fn node_index(node: NodeId) -> Option<usize> {
        if node.is_ground() {
            None
        } else {
            Some(node.0 - 1)
        }
    }

    /// Assemble and solve the network, refreshing every net.
    pub fn solve(&mut self) -> Result<()> {
        let num_nodes = self.nets.len() - 1;
        let mut matrix = MnaMatrix::new(num_nodes + self.sources.len());

        for branch in &self.branches {
            matrix.stamp_conductance(
                Self::node_index(branch.nodes[0]),
                Self::node_index(branch.nodes[1]),
                1.0 / branch.resistance,
            );
        }

        for i in 0..num_nodes {
            matrix.add(i, i, self.config.gmin);
        }

        for (k, source) in self.sources.iter().enumerate() {
            matrix.stamp_voltage_source(Self::node_index(source.node), None, num_nodes + k, source.voltage);
        }

        matrix.factor()?;
        matrix.solve()?;

        for (i, net) in self.nets.iter().enumerate().skip(1) {
            net.set_voltage(matrix.voltage(Self::node_index(NodeId(i))));
        }

        self.dirty = false;
        self.solve_count += 1;
        log::debug!("network solved at {} ({} nodes)", self.now, num_nodes);
        Ok(())
    }

    /// Advance simulated time, running every re-solve that falls due.
    ///
    /// Returns the number of solves performed. Requests due at the same
    /// time share one solve. If a solve fails, time stops at that request,
    /// which stays pending along with every later one.
    pub fn advance_to(&mut self, time: SimTime) -> Result<usize> {
        if let Some(fault) = self.fault.take() {
            return Err(fault);
        }
        if time < self.now {
            return Err(SwitchError::CausalityViolation {
                now: self.now,
                requested: time,
            });
        }

        let mut solves = 0;
        while let Some(at) = self.queue.next_due().filter(|&at| at <= time) {
            self.now = at;
            self.solve()?;
            let served = self.queue.pop_due(at);
            log::debug!("ran scheduled re-solve at {at} for {} branches", served.len());
            solves += 1;
        }
        self.now = time;
        Ok(solves)
    }

    /// Advance simulated time by `delta`.
    pub fn step(&mut self, delta: SimTime) -> Result<usize> {
        self.advance_to(self.now + delta)
    }

    /// Number of pending re-solve requests.
    pub fn pending_resolves(&self) -> usize {
        self.queue.len()
    }

    /// Time of the earliest pending re-solve.
    pub fn next_resolve(&self) -> Option<SimTime> {
        self.queue.next_due()
    }

    /// Number of solves performed so far.
    pub fn solve_count(&self) -> usize {
        self.solve_count
    }

    /// Number of scheduling requests merged into an existing one.
    pub fn coalesced_requests(&self) -> usize {
        self.coalesced
    }

    fn branch_mut(&mut self, branch: BranchId) -> &mut Branch {
        let count = self.branches.len();
        self.branches
            .get_mut(branch.0)
            .unwrap_or_else(|| panic!("branch {branch} out of range ({count} branches)"))
    }
}

impl SolverService for Network {
    fn gmin(&self) -> f64 {
        self.config.gmin
    }

    fn min_resistance(&self) -> f64 {
        self.config.min_resistance
    }

    fn now(&self) -> SimTime {
        self.now
    }

    fn is_timestep(&self, _branch: BranchId) -> bool {
        self.config.timestep
    }

    fn synchronize_branch(&mut self, branch: BranchId) {
        self.branch_mut(branch);
        if !self.dirty {
            return;
        }
        if let Err(err) = self.solve() {
            log::warn!("solve while synchronizing {branch} failed: {err}");
            self.fault = Some(err);
        }
    }

    fn set_branch_resistance(&mut self, branch: BranchId, ohms: f64) {
        assert!(
            ohms.is_finite() && ohms > 0.0,
            "branch {branch}: resistance must be positive and finite, got {ohms}"
        );
        let b = self.branch_mut(branch);
        if b.resistance != ohms {
            b.resistance = ohms;
            self.dirty = true;
        }
    }

    fn schedule_resolve_after(&mut self, branch: BranchId, delay: SimTime) {
        let at = self.now + delay;
        match self.queue.schedule(branch, at) {
            Scheduled::Coalesced => {
                self.coalesced += 1;
                log::debug!("re-solve for {branch} at {at} coalesced");
            }
            Scheduled::Queued | Scheduled::Advanced => {
                log::debug!("re-solve for {branch} scheduled at {at}");
            }
        }
    }
}
