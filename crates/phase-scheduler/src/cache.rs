//! Oracle result caches
//!
//! - [`ChoiceCache`]: exact-best choices, solved lazily per egress on first
//!   query
//! - [`EgressTables`]: ranked option tables, solved eagerly for every egress
//!   used by a flow

use crate::network::Network;
use std::collections::HashMap;
use temporal_graph::{
    Approach, EgressSolve, NodeId, Phase, RankedOption, RankedTable, ScheduleChoice,
    TemporalGraph, UNREACHABLE,
};
use tracing::{debug, warn};

/// Lazy `(phase, node, egress) -> ScheduleChoice` cache
#[derive(Debug, Clone)]
pub struct ChoiceCache {
    approach: Approach,
    /// Per egress, choices indexed `phase * num_nodes + node`
    choices: HashMap<NodeId, Vec<ScheduleChoice>>,
}

impl ChoiceCache {
    pub fn new(approach: Approach) -> Self {
        Self {
            approach,
            choices: HashMap::new(),
        }
    }

    /// Best choice toward `egress`, solving and filling every
    /// `(phase, node)` entry for that egress on a miss.
    pub fn get_or_solve(
        &mut self,
        graph: &TemporalGraph,
        phase: Phase,
        node: NodeId,
        egress: NodeId,
    ) -> ScheduleChoice {
        let approach = self.approach;
        let num_nodes = graph.topology().num_nodes();
        let choices = self
            .choices
            .entry(egress)
            .or_insert_with(|| solve_choices(graph, egress, approach));
        choices[phase * num_nodes + node]
    }

    /// Number of egress nodes solved so far
    pub fn solved(&self) -> usize {
        self.choices.len()
    }

    pub fn clear(&mut self) {
        self.choices.clear();
    }
}

fn solve_choices(graph: &TemporalGraph, egress: NodeId, approach: Approach) -> Vec<ScheduleChoice> {
    let topology = graph.topology();
    let solve = EgressSolve::solve(graph, egress, approach);

    let mut choices = Vec::with_capacity(topology.num_phases() * topology.num_nodes());
    let mut unreachable = 0;
    for phase in 0..topology.num_phases() {
        for node in 0..topology.num_nodes() {
            if solve.distance(graph.phase_node_vertex(phase, node)) == UNREACHABLE {
                unreachable += 1;
            }
            choices.push(solve.best_choice(graph, phase, node));
        }
    }
    if unreachable > 0 {
        warn!(egress, unreachable, "Egress unreachable from some nodes, using first-port fallback");
    }
    debug!(egress, entries = choices.len(), "Cached exact-best choices");
    choices
}

/// Ranked option tables, one per distinct egress
#[derive(Debug, Clone, Default)]
pub struct EgressTables {
    tables: HashMap<NodeId, RankedTable>,
}

impl EgressTables {
    /// Solve every egress used by a flow of `network`.
    pub fn build(network: &Network, approach: Approach, num_paths: usize) -> Self {
        let graph = network.graph();
        let tables: HashMap<NodeId, RankedTable> = network
            .egress_nodes()
            .into_iter()
            .map(|egress| {
                let solve = EgressSolve::solve(graph, egress, approach);
                (egress, solve.ranked_table(graph, num_paths))
            })
            .collect();

        debug!(egresses = tables.len(), num_paths, %approach, "Built ranked option tables");
        Self { tables }
    }

    /// Ranked options toward `egress`; empty if no flow leaves there.
    pub fn options(&self, egress: NodeId, phase: Phase, node: NodeId) -> &[RankedOption] {
        self.tables
            .get(&egress)
            .map(|table| table.options(phase, node))
            .unwrap_or(&[])
    }

    pub fn table(&self, egress: NodeId) -> Option<&RankedTable> {
        self.tables.get(&egress)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
