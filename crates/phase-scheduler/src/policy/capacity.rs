//! CapacityTopK policy: the cheapest ranked port that is not congested.

use super::{nonempty_options, SchedulingPolicy};
use crate::cache::EgressTables;
use crate::load::LoadAccessor;
use crate::network::{Flow, Network};
use temporal_graph::{Approach, NodeId, Phase, ScheduleChoice};
use tracing::trace;

/// First of the top-K ranked options whose port load is below the threshold,
/// else the top option. Load is read live on every query.
#[derive(Debug, Clone)]
pub struct CapacityTopK {
    approach: Approach,
    num_paths: usize,
    threshold: f64,
    tables: EgressTables,
}

impl CapacityTopK {
    pub fn new(approach: Approach, num_paths: usize, threshold: f64) -> Self {
        Self {
            approach,
            num_paths,
            threshold,
            tables: EgressTables::default(),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl SchedulingPolicy for CapacityTopK {
    fn name(&self) -> &'static str {
        "capacity_top_k"
    }

    fn setup(&mut self, network: &Network) {
        self.tables = EgressTables::build(network, self.approach, self.num_paths);
    }

    fn choice(
        &mut self,
        network: &Network,
        phase: Phase,
        node: NodeId,
        flow: &Flow,
        loads: &dyn LoadAccessor,
    ) -> ScheduleChoice {
        let options = match nonempty_options(
            self.tables.options(flow.egress, phase, node),
            network.topology(),
            phase,
            node,
            flow,
        ) {
            Ok(options) => options,
            Err(fallback) => return fallback,
        };

        match options
            .iter()
            .find(|option| loads.port_load(option.port) < self.threshold)
        {
            Some(option) => option.choice(),
            None => {
                trace!(phase, node, egress = flow.egress, "All ranked ports congested");
                options[0].choice()
            }
        }
    }
}
