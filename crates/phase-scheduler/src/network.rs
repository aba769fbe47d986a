//! Flows over a temporal graph

use serde::{Deserialize, Serialize};
use temporal_graph::{NodeId, TemporalGraph, Topology};

/// Index of a flow in the setup order
pub type FlowId = usize;

/// A traffic flow between two nodes. Only `egress` steers scheduling
/// decisions; `ingress` and `amount` describe the injected traffic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Flow {
    pub ingress: NodeId,
    pub egress: NodeId,
    /// Units injected per phase
    #[serde(default)]
    pub amount: f64,
}

impl Flow {
    pub fn new(ingress: NodeId, egress: NodeId, amount: f64) -> Self {
        Self {
            ingress,
            egress,
            amount,
        }
    }
}

/// Temporal graph plus the flows routed over it
#[derive(Debug, Clone)]
pub struct Network {
    graph: TemporalGraph,
    flows: Vec<Flow>,
}

impl Network {
    pub fn new(graph: TemporalGraph, flows: Vec<Flow>) -> Self {
        Self { graph, flows }
    }

    pub fn graph(&self) -> &TemporalGraph {
        &self.graph
    }

    pub fn topology(&self) -> &Topology {
        self.graph.topology()
    }

    pub fn flows(&self) -> &[Flow] {
        &self.flows
    }

    pub fn flow(&self, flow: FlowId) -> Option<&Flow> {
        self.flows.get(flow)
    }

    /// Distinct egress nodes in first-use order
    pub fn egress_nodes(&self) -> Vec<NodeId> {
        let mut nodes = Vec::new();
        for flow in &self.flows {
            if !nodes.contains(&flow.egress) {
                nodes.push(flow.egress);
            }
        }
        nodes
    }
}
