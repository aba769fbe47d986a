//! Phase Scheduler
//!
//! Decision engine consulted by a rotor-network buffer simulator. For every
//! `(phase, node, flow)` it answers where the node should buffer a unit:
//! the phase to send it in and the owned port to send it through.
//!
//! # Policies
//!
//! | Policy | Strategy | Cache |
//! |--------|----------|-------|
//! | [`Fixed`] | Exact shortest path | Lazy, per egress |
//! | [`RandomTopK`] | Hashed pick among K ranked ports, redrawn each step | Eager, per egress |
//! | [`CapacityTopK`] | First of K ranked ports under the load threshold | Eager, per egress |
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized --setup--> Ready --begin--> Stepping
//!                                  (prepare_choices -> choice*)*
//! ```

use temporal_graph::{NodeId, Phase, TopologyError};
use thiserror::Error;

pub mod cache;
pub mod config;
pub mod engine;
pub mod load;
pub mod loader;
pub mod network;
pub mod policy;

pub use config::{ConfigError, Params};
pub use engine::{Engine, EngineState};
pub use load::{Buffers, LoadAccessor, NoLoad};
pub use loader::{load_network, LoaderError, NetworkFile};
pub use network::{Flow, FlowId, Network};
pub use policy::{
    available_policies, policy_for, CapacityTopK, Fixed, PolicyKind, RandomTopK,
    SchedulingPolicy,
};
pub use temporal_graph::{Approach, ScheduleChoice, Topology};

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),
    #[error("Engine used before setup")]
    NotReady,
    #[error("Engine used before begin")]
    NotStepping,
    #[error("choice requested before prepare_choices in this run")]
    StepNotPrepared,
    #[error("Flow {flow} names node {node}, but there are only {num_nodes} nodes")]
    FlowNodeOutOfRange {
        flow: FlowId,
        node: NodeId,
        num_nodes: usize,
    },
    #[error("Unknown flow: {0}")]
    UnknownFlow(FlowId),
    #[error("Phase {phase} out of range ({num_phases} phases)")]
    PhaseOutOfRange { phase: Phase, num_phases: usize },
    #[error("Node {node} out of range ({num_nodes} nodes)")]
    NodeOutOfRange { node: NodeId, num_nodes: usize },
}

pub type Result<T> = std::result::Result<T, EngineError>;
