//! Temporal Graph - phase-expanded routing graph
//!
//! Expands a rotor switching network, whose port-to-node wiring changes
//! every phase of a repeating cycle, into a directed weighted graph:
//!
//! - Topology (ports, owners, per-phase targets)
//! - Temporal graph over node, phase-node and phase-port vertices
//! - Shortest-path oracle per egress node (exact-best and top-K queries)
//! - Export to Graphviz DOT

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod export;
pub mod graph;
pub mod oracle;
pub mod topology;

pub use export::DotOptions;
pub use graph::{GraphStats, TemporalEdge, TemporalGraph, TemporalVertex};
pub use oracle::{
    Approach, Cost, EgressSolve, ParseApproachError, RankedOption, RankedTable, METRIC_SCALE,
    UNREACHABLE,
};
pub use topology::Topology;

/// Index of a phase within the cycle.
pub type Phase = usize;
/// Index of a switching node.
pub type NodeId = usize;
/// Index of a port.
pub type PortId = usize;

/// Topology construction errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TopologyError {
    #[error("Topology needs at least one {0}")]
    Empty(&'static str),
    #[error("Port owner table has {actual} entries, expected {expected}")]
    OwnerCount { expected: usize, actual: usize },
    #[error("Phase {phase} has {actual} port targets, expected {expected}")]
    TargetCount {
        phase: Phase,
        expected: usize,
        actual: usize,
    },
    #[error("Port {port} is owned by node {node}, but there are only {num_nodes} nodes")]
    OwnerOutOfRange {
        port: PortId,
        node: NodeId,
        num_nodes: usize,
    },
    #[error("Port {port} targets node {node} in phase {phase}, but there are only {num_nodes} nodes")]
    TargetOutOfRange {
        phase: Phase,
        port: PortId,
        node: NodeId,
        num_nodes: usize,
    },
    #[error("Node {0} owns no port")]
    NoOwnedPort(NodeId),
}

pub type Result<T> = std::result::Result<T, TopologyError>;

/// Where a querying node should buffer a unit: the phase it is sent in and
/// the port it is sent through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScheduleChoice {
    pub phase: Phase,
    pub port: PortId,
}

impl ScheduleChoice {
    pub fn new(phase: Phase, port: PortId) -> Self {
        Self { phase, port }
    }
}
