//! Static network topology
//!
//! Ports are owned by exactly one node. In every phase each port is wired to
//! exactly one target node; the wiring repeats after `num_phases` phases.

use crate::{NodeId, Phase, PortId, Result, TopologyError};
use serde::Serialize;

/// Reference rotor wiring: 4 phases, 5 nodes, 10 ports (two per node).
const TEST_TOPOLOGY: [[NodeId; 10]; 4] = [
    [1, 3, 2, 4, 3, 0, 4, 1, 0, 2],
    [2, 4, 3, 0, 4, 1, 0, 2, 1, 3],
    [3, 1, 4, 2, 0, 3, 1, 4, 2, 0],
    [4, 2, 0, 3, 1, 4, 2, 0, 3, 1],
];

/// Phase-varying port/node wiring of a rotor network
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Topology {
    num_phases: usize,
    num_nodes: usize,
    num_ports: usize,
    port_owner: Vec<NodeId>,
    /// `targets[phase * num_ports + port]`
    targets: Vec<NodeId>,
}

impl Topology {
    /// Build a topology from the port owner table and `targets[phase][port]`.
    pub fn new(num_nodes: usize, port_owner: Vec<NodeId>, targets: Vec<Vec<NodeId>>) -> Result<Self> {
        let num_phases = targets.len();
        let num_ports = port_owner.len();

        if num_phases == 0 {
            return Err(TopologyError::Empty("phase"));
        }
        if num_nodes == 0 {
            return Err(TopologyError::Empty("node"));
        }
        if num_ports == 0 {
            return Err(TopologyError::Empty("port"));
        }

        for (port, &node) in port_owner.iter().enumerate() {
            if node >= num_nodes {
                return Err(TopologyError::OwnerOutOfRange {
                    port,
                    node,
                    num_nodes,
                });
            }
        }

        let mut flat = Vec::with_capacity(num_phases * num_ports);
        for (phase, row) in targets.into_iter().enumerate() {
            if row.len() != num_ports {
                return Err(TopologyError::TargetCount {
                    phase,
                    expected: num_ports,
                    actual: row.len(),
                });
            }
            for (port, &node) in row.iter().enumerate() {
                if node >= num_nodes {
                    return Err(TopologyError::TargetOutOfRange {
                        phase,
                        port,
                        node,
                        num_nodes,
                    });
                }
            }
            flat.extend(row);
        }

        let mut owns_port = vec![false; num_nodes];
        for &node in &port_owner {
            owns_port[node] = true;
        }
        if let Some(node) = owns_port.iter().position(|owned| !owned) {
            return Err(TopologyError::NoOwnedPort(node));
        }

        Ok(Self {
            num_phases,
            num_nodes,
            num_ports,
            port_owner,
            targets: flat,
        })
    }

    /// The 4-phase, 5-node reference topology; ports `2n` and `2n + 1`
    /// belong to node `n`.
    pub fn from_test_data() -> Self {
        Self {
            num_phases: TEST_TOPOLOGY.len(),
            num_nodes: 5,
            num_ports: 10,
            port_owner: (0..10).map(|port| port / 2).collect(),
            targets: TEST_TOPOLOGY.iter().flatten().copied().collect(),
        }
    }

    pub fn num_phases(&self) -> usize {
        self.num_phases
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn num_ports(&self) -> usize {
        self.num_ports
    }

    /// Node that owns `port`
    pub fn owner(&self, port: PortId) -> NodeId {
        self.port_owner[port]
    }

    /// Node that `port` is wired to during `phase`
    pub fn target(&self, phase: Phase, port: PortId) -> NodeId {
        self.targets[phase * self.num_ports + port]
    }

    /// Ports owned by `node`, in port order
    pub fn owned_ports(&self, node: NodeId) -> impl Iterator<Item = PortId> + '_ {
        self.port_owner
            .iter()
            .enumerate()
            .filter(move |&(_, &owner)| owner == node)
            .map(|(port, _)| port)
    }

    /// Lowest-numbered port owned by `node`
    pub fn first_owned_port(&self, node: NodeId) -> PortId {
        self.owned_ports(node).next().unwrap_or_default()
    }

    /// `(phase + add) mod num_phases`
    #[inline]
    pub fn phase_add(&self, phase: Phase, add: usize) -> Phase {
        (phase + add) % self.num_phases
    }

    /// `(phase, port)` pairs where a port is wired back to its own owner.
    pub fn self_loops(&self) -> Vec<(Phase, PortId)> {
        let mut loops = Vec::new();
        for phase in 0..self.num_phases {
            for port in 0..self.num_ports {
                if self.target(phase, port) == self.owner(port) {
                    loops.push((phase, port));
                }
            }
        }
        loops
    }
}
