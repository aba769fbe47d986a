//! Graph export for visualization
//!
//! Renders the temporal graph as Graphviz DOT. Vertices are labelled
//! `N(node)`, `PN(phase,node)` and `P(phase,port)`.

use crate::graph::TemporalGraph;
use petgraph::dot::{Config, Dot};

/// DOT rendering options
#[derive(Debug, Clone, Copy, Default)]
pub struct DotOptions {
    /// Print edge weights as labels
    pub edge_labels: bool,
}

impl TemporalGraph {
    /// Render the graph in Graphviz DOT format.
    pub fn to_dot(&self, options: DotOptions) -> String {
        if options.edge_labels {
            format!("{}", Dot::new(self.graph()))
        } else {
            format!("{}", Dot::with_config(self.graph(), &[Config::EdgeNoLabel]))
        }
    }
}
