//! Phase-expanded temporal graph
//!
//! Vertices come in three kinds:
//! - `Node(n)`: phase-independent collector for node `n`
//! - `PhaseNode(p, n)`: node `n` holding a unit during phase `p`
//! - `PortPhase(p, q)`: a unit queued at port `q` for transmission in phase `p`
//!
//! Vertices live in a flat arena whose offsets are computed from the
//! topology, so lookups never go through a map.

use crate::topology::Topology;
use crate::{NodeId, Phase, PortId};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Vertex of the temporal graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemporalVertex {
    Node { node: NodeId },
    PhaseNode { phase: Phase, node: NodeId },
    PortPhase { phase: Phase, port: PortId },
}

impl fmt::Display for TemporalVertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemporalVertex::Node { node } => write!(f, "N({})", node),
            TemporalVertex::PhaseNode { phase, node } => write!(f, "PN({},{})", phase, node),
            TemporalVertex::PortPhase { phase, port } => write!(f, "P({},{})", phase, port),
        }
    }
}

/// Edge weight: phases consumed, hops taken, and whether the edge models
/// buffering at a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalEdge {
    pub time: u32,
    pub hop: u32,
    pub wait: bool,
}

impl TemporalEdge {
    /// `PhaseNode(p, n) -> Node(n)`
    pub const COLLECTOR: TemporalEdge = TemporalEdge {
        time: 0,
        hop: 0,
        wait: false,
    };

    /// `PortPhase(p, q) -> PhaseNode(p + 1, target)`
    pub const TRANSFER: TemporalEdge = TemporalEdge {
        time: 1,
        hop: 1,
        wait: false,
    };

    /// `PhaseNode(p, n) -> PortPhase(p + phases, q)`
    pub fn wait(phases: u32) -> Self {
        Self {
            time: phases,
            hop: 0,
            wait: true,
        }
    }
}

impl fmt::Display for TemporalEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.wait {
            write!(f, "wait {}", self.time)
        } else {
            write!(f, "t={} h={}", self.time, self.hop)
        }
    }
}

/// The temporal graph, built once per topology
#[derive(Debug, Clone)]
pub struct TemporalGraph {
    topology: Topology,
    graph: DiGraph<TemporalVertex, TemporalEdge>,
}

impl TemporalGraph {
    /// Expand `topology` into the temporal graph.
    pub fn build(topology: Topology) -> Self {
        let mut tg = Self {
            graph: DiGraph::with_capacity(vertex_count(&topology), edge_count(&topology)),
            topology,
        };

        tg.create_vertices();
        tg.create_transfers();
        tg.create_waits();
        tg.create_collector_edges();

        debug!(
            vertices = tg.graph.node_count(),
            edges = tg.graph.edge_count(),
            "Built temporal graph"
        );

        tg
    }

    fn create_vertices(&mut self) {
        let phases = self.topology.num_phases();
        let nodes = self.topology.num_nodes();
        let ports = self.topology.num_ports();

        for node in 0..nodes {
            self.graph.add_node(TemporalVertex::Node { node });
        }
        for phase in 0..phases {
            for node in 0..nodes {
                self.graph.add_node(TemporalVertex::PhaseNode { phase, node });
            }
        }
        for phase in 0..phases {
            for port in 0..ports {
                self.graph.add_node(TemporalVertex::PortPhase { phase, port });
            }
        }
    }

    /// Crossing a port takes one phase and one hop.
    fn create_transfers(&mut self) {
        for phase in 0..self.topology.num_phases() {
            for port in 0..self.topology.num_ports() {
                let target = self.topology.target(phase, port);
                let arrive = self.topology.phase_add(phase, 1);
                let from = self.port_phase_vertex(phase, port);
                let to = self.phase_node_vertex(arrive, target);
                self.graph.add_edge(from, to, TemporalEdge::TRANSFER);
            }
        }
    }

    /// A node may hold a unit for 1..=P phases before queueing it at an owned
    /// port. The P-phase edge wraps the full cycle.
    fn create_waits(&mut self) {
        let phases = self.topology.num_phases();
        for phase in 0..phases {
            for port in 0..self.topology.num_ports() {
                let owner = self.topology.owner(port);
                let from = self.phase_node_vertex(phase, owner);
                for wait in 1..=phases {
                    let to = self.port_phase_vertex(self.topology.phase_add(phase, wait), port);
                    self.graph.add_edge(from, to, TemporalEdge::wait(wait as u32));
                }
            }
        }
    }

    /// Lets one search rooted at `Node(egress)` cover arrival in any phase.
    fn create_collector_edges(&mut self) {
        for phase in 0..self.topology.num_phases() {
            for node in 0..self.topology.num_nodes() {
                let from = self.phase_node_vertex(phase, node);
                let to = self.node_vertex(node);
                self.graph.add_edge(from, to, TemporalEdge::COLLECTOR);
            }
        }
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Underlying petgraph graph
    pub fn graph(&self) -> &DiGraph<TemporalVertex, TemporalEdge> {
        &self.graph
    }

    #[inline]
    pub fn node_vertex(&self, node: NodeId) -> NodeIndex {
        NodeIndex::new(node)
    }

    #[inline]
    pub fn phase_node_vertex(&self, phase: Phase, node: NodeId) -> NodeIndex {
        let nodes = self.topology.num_nodes();
        NodeIndex::new(nodes + phase * nodes + node)
    }

    #[inline]
    pub fn port_phase_vertex(&self, phase: Phase, port: PortId) -> NodeIndex {
        let nodes = self.topology.num_nodes();
        let base = nodes + self.topology.num_phases() * nodes;
        NodeIndex::new(base + phase * self.topology.num_ports() + port)
    }

    /// Vertex stored at `index`
    pub fn vertex(&self, index: NodeIndex) -> TemporalVertex {
        self.graph[index]
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Outgoing wait edges of `PhaseNode(phase, node)` in insertion order,
    /// as `(edge, PortPhase vertex, weight)`.
    pub fn wait_edges(
        &self,
        phase: Phase,
        node: NodeId,
    ) -> Vec<(EdgeIndex, NodeIndex, TemporalEdge)> {
        let from = self.phase_node_vertex(phase, node);
        let mut edges: Vec<_> = self
            .graph
            .edges(from)
            .filter(|e| e.weight().wait)
            .map(|e| (e.id(), e.target(), *e.weight()))
            .collect();
        // petgraph walks adjacency lists newest first
        edges.sort_by_key(|(id, _, _)| *id);
        edges
    }

    /// Get graph statistics
    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            total_vertices: self.graph.node_count(),
            total_edges: self.graph.edge_count(),
            ..GraphStats::default()
        };

        for vertex in self.graph.node_weights() {
            match vertex {
                TemporalVertex::Node { .. } => stats.node_vertices += 1,
                TemporalVertex::PhaseNode { .. } => stats.phase_node_vertices += 1,
                TemporalVertex::PortPhase { .. } => stats.port_phase_vertices += 1,
            }
        }

        for edge in self.graph.edge_references() {
            let weight = edge.weight();
            if weight.wait {
                stats.wait_edges += 1;
            } else if weight.hop > 0 {
                stats.transfer_edges += 1;
            } else {
                stats.collector_edges += 1;
            }
        }

        stats
    }
}

fn vertex_count(topology: &Topology) -> usize {
    let (p, n, q) = (topology.num_phases(), topology.num_nodes(), topology.num_ports());
    n + p * n + p * q
}

fn edge_count(topology: &Topology) -> usize {
    let (p, n, q) = (topology.num_phases(), topology.num_nodes(), topology.num_ports());
    p * n + p * q + p * q * p
}

/// Graph statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_vertices: usize,
    pub node_vertices: usize,
    pub phase_node_vertices: usize,
    pub port_phase_vertices: usize,
    pub total_edges: usize,
    pub collector_edges: usize,
    pub transfer_edges: usize,
    pub wait_edges: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use petgraph::Direction;

    #[test]
    fn test_vertex_and_edge_counts() {
        let tg = TemporalGraph::build(Topology::from_test_data());
        let stats = tg.stats();

        // 5 + 4*5 + 4*10
        assert_eq!(stats.total_vertices, 65);
        assert_eq!(stats.node_vertices, 5);
        assert_eq!(stats.phase_node_vertices, 20);
        assert_eq!(stats.port_phase_vertices, 40);

        assert_eq!(stats.collector_edges, 20);
        assert_eq!(stats.transfer_edges, 40);
        assert_eq!(stats.wait_edges, 160);
        assert_eq!(stats.total_edges, 220);
    }

    #[test]
    fn test_arena_offsets() {
        let tg = TemporalGraph::build(Topology::from_test_data());

        assert_eq!(tg.vertex(tg.node_vertex(3)), TemporalVertex::Node { node: 3 });
        assert_eq!(
            tg.vertex(tg.phase_node_vertex(2, 4)),
            TemporalVertex::PhaseNode { phase: 2, node: 4 }
        );
        assert_eq!(
            tg.vertex(tg.port_phase_vertex(3, 9)),
            TemporalVertex::PortPhase { phase: 3, port: 9 }
        );
    }

    #[test]
    fn test_transfer_edges_arrive_next_phase() {
        let topology = Topology::from_test_data();
        let tg = TemporalGraph::build(topology.clone());

        for phase in 0..topology.num_phases() {
            for port in 0..topology.num_ports() {
                let from = tg.port_phase_vertex(phase, port);
                let targets: Vec<_> = tg
                    .graph()
                    .neighbors_directed(from, Direction::Outgoing)
                    .collect();
                assert_eq!(targets.len(), 1);
                assert_eq!(
                    tg.vertex(targets[0]),
                    TemporalVertex::PhaseNode {
                        phase: (phase + 1) % 4,
                        node: topology.target(phase, port)
                    }
                );
            }
        }
    }

    #[test]
    fn test_wait_edges_cover_full_cycle() {
        let tg = TemporalGraph::build(Topology::from_test_data());

        // Node 1 owns ports 2 and 3
        let waits = tg.wait_edges(1, 1);
        assert_eq!(waits.len(), 8);

        for (i, (_, target, weight)) in waits.iter().enumerate() {
            let port = 2 + i / 4;
            let wait = (i % 4) + 1;
            assert_eq!(weight.time as usize, wait);
            assert_eq!(weight.hop, 0);
            assert_eq!(
                tg.vertex(*target),
                TemporalVertex::PortPhase {
                    phase: (1 + wait) % 4,
                    port
                }
            );
        }

        // The full-cycle edge lands in the starting phase
        let (_, target, weight) = waits[3];
        assert_eq!(weight.time, 4);
        assert_eq!(tg.vertex(target), TemporalVertex::PortPhase { phase: 1, port: 2 });
    }

    #[test]
    fn test_phase_node_only_reaches_owned_ports_and_collector() {
        let topology = Topology::from_test_data();
        let tg = TemporalGraph::build(topology.clone());

        for phase in 0..topology.num_phases() {
            for node in 0..topology.num_nodes() {
                for next in tg.graph().neighbors(tg.phase_node_vertex(phase, node)) {
                    match tg.vertex(next) {
                        TemporalVertex::Node { node: n } => assert_eq!(n, node),
                        TemporalVertex::PortPhase { port, .. } => {
                            assert_eq!(topology.owner(port), node)
                        }
                        TemporalVertex::PhaseNode { .. } => panic!("phase node adjacent to phase node"),
                    }
                }
            }
        }
    }

    #[test]
    fn test_vertex_labels() {
        assert_eq!(TemporalVertex::Node { node: 2 }.to_string(), "N(2)");
        assert_eq!(TemporalVertex::PhaseNode { phase: 1, node: 0 }.to_string(), "PN(1,0)");
        assert_eq!(TemporalVertex::PortPhase { phase: 3, port: 7 }.to_string(), "P(3,7)");
    }
}
