//! Scheduling policies
//!
//! All policies implement [`SchedulingPolicy`]: given the phase a node holds
//! a unit in and the flow it belongs to, return the `(phase, port)` to buffer
//! it for. Every returned port is owned by the querying node.

pub mod capacity;
pub mod fixed;
pub mod random_top_k;

pub use capacity::CapacityTopK;
pub use fixed::Fixed;
pub use random_top_k::{hash_bounded, RandomTopK};

use crate::config::{ConfigError, Params};
use crate::load::LoadAccessor;
use crate::network::{Flow, Network};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use temporal_graph::{NodeId, Phase, RankedOption, ScheduleChoice, Topology};
use tracing::warn;

/// A per-step scheduling decision policy
pub trait SchedulingPolicy: Send {
    /// Registry name of the policy
    fn name(&self) -> &'static str;

    /// Precompute whatever the policy needs for `network`. Replaces any
    /// state from a previous setup.
    fn setup(&mut self, network: &Network);

    /// Reset per-run state at the start of a simulation run.
    fn begin(&mut self) {}

    /// Refresh per-step state before the step's queries.
    fn prepare_choices(&mut self) {}

    /// Where `node` should buffer a unit of `flow` it holds in `phase`.
    fn choice(
        &mut self,
        network: &Network,
        phase: Phase,
        node: NodeId,
        flow: &Flow,
        loads: &dyn LoadAccessor,
    ) -> ScheduleChoice;
}

/// Built-in policy families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    Fixed,
    RandomTopK,
    CapacityTopK,
}

impl PolicyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::Fixed => "fixed",
            PolicyKind::RandomTopK => "random_top_k",
            PolicyKind::CapacityTopK => "capacity_top_k",
        }
    }

    /// Prefix of the configuration keys read by this policy
    pub fn env_prefix(&self) -> &'static str {
        match self {
            PolicyKind::Fixed | PolicyKind::RandomTopK => "CHOICE_",
            PolicyKind::CapacityTopK => "CAPACITY_",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" => Ok(PolicyKind::Fixed),
            "random_top_k" => Ok(PolicyKind::RandomTopK),
            "capacity_top_k" => Ok(PolicyKind::CapacityTopK),
            other => Err(ConfigError::UnknownPolicy(other.to_string())),
        }
    }
}

/// Create a policy of `kind` with validated `params`.
pub fn policy_for(kind: PolicyKind, params: Params) -> Box<dyn SchedulingPolicy> {
    match kind {
        PolicyKind::Fixed => Box::new(Fixed::new(params.approach)),
        PolicyKind::RandomTopK => Box::new(RandomTopK::new(params.approach, params.num_paths)),
        PolicyKind::CapacityTopK => Box::new(CapacityTopK::new(
            params.approach,
            params.num_paths,
            params.threshold,
        )),
    }
}

/// List all available policy names.
pub fn available_policies() -> Vec<&'static str> {
    vec![
        PolicyKind::Fixed.as_str(),
        PolicyKind::RandomTopK.as_str(),
        PolicyKind::CapacityTopK.as_str(),
    ]
}

/// Choice used when no ranked option exists for a query: the node's first
/// owned port, one phase ahead.
pub(crate) fn first_port_next_phase(topology: &Topology, phase: Phase, node: NodeId) -> ScheduleChoice {
    ScheduleChoice::new(topology.phase_add(phase, 1), topology.first_owned_port(node))
}

/// `options` or, if empty, the first-port fallback
pub(crate) fn nonempty_options<'a>(
    options: &'a [RankedOption],
    topology: &Topology,
    phase: Phase,
    node: NodeId,
    flow: &Flow,
) -> Result<&'a [RankedOption], ScheduleChoice> {
    if options.is_empty() {
        warn!(
            phase,
            node,
            egress = flow.egress,
            "No ranked options for query, using first owned port"
        );
        return Err(first_port_next_phase(topology, phase, node));
    }
    Ok(options)
}
