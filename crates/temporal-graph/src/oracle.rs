//! Shortest-path oracle
//!
//! One Dijkstra run per egress node on the reversed temporal graph, rooted at
//! the collector `Node(egress)`, yields the cost-to-egress of every vertex.
//! Two queries are derived from a solve:
//!
//! - exact-best: the successor of `PhaseNode(phase, node)` on the shortest
//!   path tree
//! - top-K: every wait edge out of `PhaseNode(phase, node)`, costed as edge +
//!   remaining distance, ranked, one entry per port
//!
//! Edge costs fold `(time, hop)` into one scalar, primary metric times
//! [`METRIC_SCALE`] plus secondary metric. Ordering is only lexicographic
//! while the secondary metric of any feasible path stays below the scale.

use crate::graph::{TemporalEdge, TemporalGraph, TemporalVertex};
use crate::{NodeId, Phase, PortId, ScheduleChoice};
use petgraph::algo::dijkstra;
use petgraph::graph::NodeIndex;
use petgraph::visit::{EdgeRef, Reversed};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Scalar path cost
pub type Cost = u64;

/// Distance of a vertex that cannot reach the egress
pub const UNREACHABLE: Cost = Cost::MAX;

/// Weight of the primary metric in the scalar cost
pub const METRIC_SCALE: Cost = 10_000;

/// Which metric a route minimises first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Approach {
    /// Fewest phases until arrival, then fewest hops
    #[default]
    Quickest,
    /// Fewest hops, then fewest phases
    FewestHops,
}

impl Approach {
    /// Scalar cost of one edge under this approach
    #[inline]
    pub fn edge_cost(&self, edge: &TemporalEdge) -> Cost {
        let (time, hop) = (Cost::from(edge.time), Cost::from(edge.hop));
        match self {
            Approach::Quickest => METRIC_SCALE * time + hop,
            Approach::FewestHops => METRIC_SCALE * hop + time,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Approach::Quickest => "QUICKEST",
            Approach::FewestHops => "FEWEST_HOPS",
        }
    }
}

impl fmt::Display for Approach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Unknown routing approach: {0:?} (expected QUICKEST or FEWEST_HOPS)")]
pub struct ParseApproachError(pub String);

impl FromStr for Approach {
    type Err = ParseApproachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QUICKEST" => Ok(Approach::Quickest),
            "FEWEST_HOPS" => Ok(Approach::FewestHops),
            other => Err(ParseApproachError(other.to_string())),
        }
    }
}

/// One ranked next-hop alternative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedOption {
    pub port: PortId,
    pub phase: Phase,
    /// Edge cost plus the remaining distance to the egress
    pub cost: Cost,
}

impl RankedOption {
    pub fn choice(&self) -> ScheduleChoice {
        ScheduleChoice::new(self.phase, self.port)
    }
}

/// Ranked options for every `(phase, node)` toward one egress
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedTable {
    num_nodes: usize,
    entries: Vec<Vec<RankedOption>>,
}

impl RankedTable {
    /// Options for a node holding a unit in `phase`, cheapest first.
    pub fn options(&self, phase: Phase, node: NodeId) -> &[RankedOption] {
        &self.entries[phase * self.num_nodes + node]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of one reversed shortest-path solve toward an egress node
#[derive(Debug, Clone)]
pub struct EgressSolve {
    egress: NodeId,
    approach: Approach,
    distances: Vec<Cost>,
    /// Forward successor on the shortest-path tree (predecessor in the
    /// reversed solve). `None` for the root and unreachable vertices.
    successors: Vec<Option<NodeIndex>>,
}

impl EgressSolve {
    /// Solve toward `egress` for every vertex of `tg`.
    pub fn solve(tg: &TemporalGraph, egress: NodeId, approach: Approach) -> Self {
        let graph = tg.graph();
        let root = tg.node_vertex(egress);

        let reached = dijkstra(Reversed(graph), root, None, |e| approach.edge_cost(e.weight()));

        let mut distances = vec![UNREACHABLE; graph.node_count()];
        for (vertex, distance) in &reached {
            distances[vertex.index()] = *distance;
        }

        let mut successors = vec![None; graph.node_count()];
        for vertex in graph.node_indices() {
            let distance = distances[vertex.index()];
            if vertex == root || distance == UNREACHABLE {
                continue;
            }
            let mut edges: Vec<_> = graph.edges(vertex).collect();
            edges.sort_by_key(|e| e.id());
            successors[vertex.index()] = edges
                .into_iter()
                .find(|e| {
                    distances[e.target().index()].saturating_add(approach.edge_cost(e.weight()))
                        == distance
                })
                .map(|e| e.target());
        }

        debug!(
            egress,
            %approach,
            reached = reached.len(),
            vertices = graph.node_count(),
            "Solved temporal graph toward egress"
        );

        Self {
            egress,
            approach,
            distances,
            successors,
        }
    }

    pub fn egress(&self) -> NodeId {
        self.egress
    }

    pub fn approach(&self) -> Approach {
        self.approach
    }

    /// Cost from `vertex` to the egress, [`UNREACHABLE`] if there is no path.
    pub fn distance(&self, vertex: NodeIndex) -> Cost {
        self.distances[vertex.index()]
    }

    /// Forward successor of `vertex` on the shortest-path tree
    pub fn successor(&self, vertex: NodeIndex) -> Option<NodeIndex> {
        self.successors[vertex.index()]
    }

    /// Tree successor of `PhaseNode(phase, node)` when it is a port queue.
    ///
    /// Returns `None` when `node` is the egress itself (its successor is the
    /// collector) or when the egress cannot be reached.
    pub fn next_hop(&self, tg: &TemporalGraph, phase: Phase, node: NodeId) -> Option<ScheduleChoice> {
        let next = self.successor(tg.phase_node_vertex(phase, node))?;
        match tg.vertex(next) {
            TemporalVertex::PortPhase { phase, port } => Some(ScheduleChoice::new(phase, port)),
            TemporalVertex::PhaseNode { .. } => {
                debug_assert!(false, "phase node successor of a phase node");
                None
            }
            TemporalVertex::Node { .. } => None,
        }
    }

    /// Exact-best choice, falling back to the node's first owned port in the
    /// next phase when [`next_hop`](Self::next_hop) has no answer.
    pub fn best_choice(&self, tg: &TemporalGraph, phase: Phase, node: NodeId) -> ScheduleChoice {
        self.next_hop(tg, phase, node).unwrap_or_else(|| {
            let topology = tg.topology();
            ScheduleChoice::new(topology.phase_add(phase, 1), topology.first_owned_port(node))
        })
    }

    /// Up to `k` distinct-port options out of `PhaseNode(phase, node)`,
    /// cheapest first. Ties keep wait-edge insertion order.
    pub fn ranked_options(
        &self,
        tg: &TemporalGraph,
        phase: Phase,
        node: NodeId,
        k: usize,
    ) -> Vec<RankedOption> {
        let mut neighbours: Vec<RankedOption> = tg
            .wait_edges(phase, node)
            .into_iter()
            .filter_map(|(_, target, weight)| match tg.vertex(target) {
                TemporalVertex::PortPhase { phase, port } => Some(RankedOption {
                    port,
                    phase,
                    cost: self
                        .approach
                        .edge_cost(&weight)
                        .saturating_add(self.distance(target)),
                }),
                _ => None,
            })
            .collect();
        debug_assert!(!neighbours.is_empty(), "node {} has no wait edges", node);

        neighbours.sort_by_key(|option| option.cost);

        let mut options: Vec<RankedOption> = Vec::with_capacity(k);
        for option in neighbours {
            if options.iter().any(|taken| taken.port == option.port) {
                continue;
            }
            options.push(option);
            if options.len() >= k {
                break;
            }
        }
        options
    }

    /// Ranked options for every `(phase, node)`.
    pub fn ranked_table(&self, tg: &TemporalGraph, k: usize) -> RankedTable {
        let topology = tg.topology();
        let mut entries = Vec::with_capacity(topology.num_phases() * topology.num_nodes());
        for phase in 0..topology.num_phases() {
            for node in 0..topology.num_nodes() {
                entries.push(self.ranked_options(tg, phase, node, k));
            }
        }
        RankedTable {
            num_nodes: topology.num_nodes(),
            entries,
        }
    }
}
