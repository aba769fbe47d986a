//! Fixed policy: always the exact shortest-path next hop.

use super::SchedulingPolicy;
use crate::cache::ChoiceCache;
use crate::load::LoadAccessor;
use crate::network::{Flow, Network};
use temporal_graph::{Approach, NodeId, Phase, ScheduleChoice};
use tracing::trace;

/// Exact-best choice per `(phase, node, egress)`, solved lazily and stable
/// for the lifetime of the setup.
#[derive(Debug, Clone)]
pub struct Fixed {
    approach: Approach,
    cache: ChoiceCache,
}

impl Fixed {
    pub fn new(approach: Approach) -> Self {
        Self {
            approach,
            cache: ChoiceCache::new(approach),
        }
    }

    pub fn approach(&self) -> Approach {
        self.approach
    }

    /// Egress nodes solved so far
    pub fn solved_egresses(&self) -> usize {
        self.cache.solved()
    }
}

impl SchedulingPolicy for Fixed {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn setup(&mut self, _network: &Network) {
        self.cache.clear();
    }

    fn choice(
        &mut self,
        network: &Network,
        phase: Phase,
        node: NodeId,
        flow: &Flow,
        _loads: &dyn LoadAccessor,
    ) -> ScheduleChoice {
        let choice = self.cache.get_or_solve(network.graph(), phase, node, flow.egress);
        trace!(phase, node, egress = flow.egress, ?choice, "Fixed choice");
        choice
    }
}
