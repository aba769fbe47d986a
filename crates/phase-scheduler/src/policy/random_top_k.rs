//! RandomTopK policy
//!
//! Spreads traffic over the K cheapest ports toward the flow's egress. The
//! pick is a hash of `(phase, node)` mixed with one random value drawn per
//! step, so repeated queries within a step agree while successive steps
//! rotate among the alternatives.

use super::{nonempty_options, SchedulingPolicy};
use crate::cache::EgressTables;
use crate::load::LoadAccessor;
use crate::network::{Flow, Network};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use temporal_graph::{Approach, NodeId, Phase, ScheduleChoice};
use tracing::{debug, trace};

/// Generator seed applied on every `begin`
pub const DEFAULT_SEED: u64 = 123_456;

const HASH_A: u64 = 0x28ec_0f22_2c79_fb46;
const HASH_B: u64 = 0x2179_c594_b7d5_4ca2;

/// Multiply-shift hash of `x` into `[0, m)`. `m` must be below `2^32`.
#[inline]
pub fn hash_bounded(x: u64, m: u64) -> u64 {
    let h = HASH_A.wrapping_mul(x).wrapping_add(HASH_B) >> 32;
    h.wrapping_mul(m) >> 32
}

/// Hashed pick among the top-K ranked options, redrawn every step
#[derive(Debug, Clone)]
pub struct RandomTopK {
    approach: Approach,
    num_paths: usize,
    seed: u64,
    rng: StdRng,
    step_random: u32,
    tables: EgressTables,
}

impl RandomTopK {
    pub fn new(approach: Approach, num_paths: usize) -> Self {
        Self::with_seed(approach, num_paths, DEFAULT_SEED)
    }

    pub fn with_seed(approach: Approach, num_paths: usize, seed: u64) -> Self {
        Self {
            approach,
            num_paths,
            seed,
            rng: StdRng::seed_from_u64(seed),
            step_random: 0,
            tables: EgressTables::default(),
        }
    }

    /// Random value of the current step
    pub fn step_random(&self) -> u32 {
        self.step_random
    }

    /// Override the random value of the current step, e.g. to replay a
    /// recorded run.
    pub fn set_step_random(&mut self, value: u32) {
        self.step_random = value;
    }
}

impl SchedulingPolicy for RandomTopK {
    fn name(&self) -> &'static str {
        "random_top_k"
    }

    fn setup(&mut self, network: &Network) {
        self.tables = EgressTables::build(network, self.approach, self.num_paths);
    }

    fn begin(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
        self.step_random = 0;
    }

    fn prepare_choices(&mut self) {
        self.step_random = self.rng.next_u32();
        debug!(step_random = self.step_random, "Drew step random value");
    }

    fn choice(
        &mut self,
        network: &Network,
        phase: Phase,
        node: NodeId,
        flow: &Flow,
        _loads: &dyn LoadAccessor,
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

        let key = ((phase as u64) << 16).wrapping_add(node as u64) ^ u64::from(self.step_random);
        let index = hash_bounded(key, options.len() as u64) as usize;
        let choice = options[index].choice();
        trace!(phase, node, egress = flow.egress, index, ?choice, "RandomTopK choice");
        choice
    }
}
