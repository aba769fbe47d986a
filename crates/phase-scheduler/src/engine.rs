//! Engine context and lifecycle
//!
//! The engine owns the temporal graph, the flows and one policy. A
//! simulator drives it through `setup -> begin -> (prepare_choices ->
//! choice*)*`; misuse of that order is reported as an [`EngineError`].

use crate::config::Params;
use crate::load::LoadAccessor;
use crate::network::{Flow, FlowId, Network};
use crate::policy::{policy_for, PolicyKind, SchedulingPolicy};
use crate::{EngineError, Result};
use serde::{Deserialize, Serialize};
use temporal_graph::{NodeId, Phase, ScheduleChoice, TemporalGraph, Topology};
use tracing::{debug, info, trace, warn};

/// Lifecycle state of an [`Engine`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    Uninitialized,
    Ready,
    Stepping,
}

/// Scheduling decision engine
pub struct Engine {
    kind: PolicyKind,
    params: Params,
    state: EngineState,
    network: Option<Network>,
    policy: Option<Box<dyn SchedulingPolicy>>,
    /// `prepare_choices` calls since the last `begin`
    steps: u64,
}

impl Engine {
    pub fn new(kind: PolicyKind) -> Self {
        Self {
            kind,
            params: Params::default(),
            state: EngineState::Uninitialized,
            network: None,
            policy: None,
            steps: 0,
        }
    }

    pub fn kind(&self) -> PolicyKind {
        self.kind
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn network(&self) -> Option<&Network> {
        self.network.as_ref()
    }

    /// `prepare_choices` calls in the current run
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Build the temporal graph and the policy's tables.
    ///
    /// Parameters and flows are checked before anything is built. A repeated
    /// setup discards the previous graph and caches.
    pub fn setup(&mut self, topology: Topology, flows: Vec<Flow>, params: Params) -> Result<()> {
        params.validate()?;

        let num_nodes = topology.num_nodes();
        for (flow, entry) in flows.iter().enumerate() {
            for node in [entry.ingress, entry.egress] {
                if node >= num_nodes {
                    return Err(EngineError::FlowNodeOutOfRange {
                        flow,
                        node,
                        num_nodes,
                    });
                }
            }
        }

        let self_loops = topology.self_loops();
        if !self_loops.is_empty() {
            warn!(
                count = self_loops.len(),
                first = ?self_loops[0],
                "Topology wires ports back to their owner"
            );
        }

        let graph = TemporalGraph::build(topology);
        let stats = graph.stats();
        let network = Network::new(graph, flows);

        let mut policy = policy_for(self.kind, params);
        policy.setup(&network);

        info!(
            policy = policy.name(),
            approach = %params.approach,
            num_paths = params.num_paths,
            threshold = params.threshold,
            vertices = stats.total_vertices,
            edges = stats.total_edges,
            flows = network.flows().len(),
            "Scheduling engine ready"
        );

        self.params = params;
        self.network = Some(network);
        self.policy = Some(policy);
        self.state = EngineState::Ready;
        self.steps = 0;
        Ok(())
    }

    /// Start a simulation run. Resets per-run state only.
    pub fn begin(&mut self) -> Result<()> {
        let policy = self.policy.as_mut().ok_or(EngineError::NotReady)?;
        policy.begin();
        self.state = EngineState::Stepping;
        self.steps = 0;
        debug!(policy = policy.name(), "Run started");
        Ok(())
    }

    /// Refresh per-step state. Call once per phase step before querying.
    pub fn prepare_choices(&mut self) -> Result<()> {
        self.require_stepping()?;
        let policy = self.policy.as_mut().ok_or(EngineError::NotReady)?;
        policy.prepare_choices();
        self.steps += 1;
        debug!(step = self.steps, "Prepared choices");
        Ok(())
    }

    /// Where `node` should buffer a unit of `flow` it holds in `phase`.
    pub fn choice(
        &mut self,
        phase: Phase,
        node: NodeId,
        flow: FlowId,
        loads: &dyn LoadAccessor,
    ) -> Result<ScheduleChoice> {
        self.require_stepping()?;
        if self.steps == 0 {
            return Err(EngineError::StepNotPrepared);
        }

        let (Some(network), Some(policy)) = (self.network.as_ref(), self.policy.as_mut()) else {
            return Err(EngineError::NotReady);
        };

        let topology = network.topology();
        if phase >= topology.num_phases() {
            return Err(EngineError::PhaseOutOfRange {
                phase,
                num_phases: topology.num_phases(),
            });
        }
        if node >= topology.num_nodes() {
            return Err(EngineError::NodeOutOfRange {
                node,
                num_nodes: topology.num_nodes(),
            });
        }
        let flow_entry = *network.flow(flow).ok_or(EngineError::UnknownFlow(flow))?;

        let choice = policy.choice(network, phase, node, &flow_entry, loads);
        debug_assert_eq!(topology.owner(choice.port), node);
        trace!(phase, node, flow, ?choice, "Choice");
        Ok(choice)
    }

    fn require_stepping(&self) -> Result<()> {
        match self.state {
            EngineState::Uninitialized => Err(EngineError::NotReady),
            EngineState::Ready => Err(EngineError::NotStepping),
            EngineState::Stepping => Ok(()),
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("kind", &self.kind)
            .field("params", &self.params)
            .field("state", &self.state)
            .field("steps", &self.steps)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::load::NoLoad;
    use temporal_graph::{Approach, TopologyError};

    fn flows() -> Vec<Flow> {
        vec![Flow::new(0, 3, 1.0), Flow::new(2, 1, 1.0)]
    }

    fn ready_engine(kind: PolicyKind) -> Engine {
        let mut engine = Engine::new(kind);
        engine
            .setup(Topology::from_test_data(), flows(), Params::default())
            .unwrap();
        engine
    }

    #[test]
    fn test_lifecycle_order() {
        let mut engine = Engine::new(PolicyKind::Fixed);
        assert_eq!(engine.state(), EngineState::Uninitialized);
        assert!(matches!(engine.begin(), Err(EngineError::NotReady)));
        assert!(matches!(engine.prepare_choices(), Err(EngineError::NotReady)));
        assert!(matches!(engine.choice(0, 0, 0, &NoLoad), Err(EngineError::NotReady)));

        engine
            .setup(Topology::from_test_data(), flows(), Params::default())
            .unwrap();
        assert_eq!(engine.state(), EngineState::Ready);
        assert!(matches!(engine.prepare_choices(), Err(EngineError::NotStepping)));
        assert!(matches!(engine.choice(0, 0, 0, &NoLoad), Err(EngineError::NotStepping)));

        engine.begin().unwrap();
        assert_eq!(engine.state(), EngineState::Stepping);
        assert!(matches!(engine.choice(0, 0, 0, &NoLoad), Err(EngineError::StepNotPrepared)));

        engine.prepare_choices().unwrap();
        assert!(engine.choice(0, 0, 0, &NoLoad).is_ok());

        // A new run needs a fresh prepare
        engine.begin().unwrap();
        assert_eq!(engine.steps(), 0);
        assert!(matches!(engine.choice(0, 0, 0, &NoLoad), Err(EngineError::StepNotPrepared)));
    }

    #[test]
    fn test_rejects_bad_params_before_building() {
        let mut engine = Engine::new(PolicyKind::RandomTopK);
        let err = engine
            .setup(
                Topology::from_test_data(),
                flows(),
                Params::new(Approach::Quickest, 9, 0.7),
            )
            .unwrap_err();

        assert!(matches!(err, EngineError::Config(ConfigError::NumPaths { .. })));
        assert_eq!(engine.state(), EngineState::Uninitialized);
        assert!(engine.network().is_none());
    }

    #[test]
    fn test_rejects_flow_outside_topology() {
        let mut engine = Engine::new(PolicyKind::Fixed);
        let err = engine
            .setup(
                Topology::from_test_data(),
                vec![Flow::new(0, 7, 1.0)],
                Params::default(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::FlowNodeOutOfRange { flow: 0, node: 7, .. }
        ));
    }

    #[test]
    fn test_query_range_checks() {
        let mut engine = ready_engine(PolicyKind::CapacityTopK);
        engine.begin().unwrap();
        engine.prepare_choices().unwrap();

        assert!(matches!(
            engine.choice(4, 0, 0, &NoLoad),
            Err(EngineError::PhaseOutOfRange { phase: 4, .. })
        ));
        assert!(matches!(
            engine.choice(0, 5, 0, &NoLoad),
            Err(EngineError::NodeOutOfRange { node: 5, .. })
        ));
        assert!(matches!(engine.choice(0, 0, 2, &NoLoad), Err(EngineError::UnknownFlow(2))));
    }

    #[test]
    fn test_resetup_replaces_network() {
        let mut engine = ready_engine(PolicyKind::RandomTopK);
        engine.begin().unwrap();
        engine.prepare_choices().unwrap();

        let topology = Topology::new(2, vec![0, 1], vec![vec![1, 0]]).unwrap();
        engine
            .setup(topology, vec![Flow::new(0, 1, 1.0)], Params::default())
            .unwrap();

        assert_eq!(engine.state(), EngineState::Ready);
        assert_eq!(engine.network().map(|n| n.topology().num_nodes()), Some(2));
    }

    #[test]
    fn test_topology_error_converts() {
        let err: EngineError = TopologyError::NoOwnedPort(1).into();
        assert_eq!(err.to_string(), "Topology error: Node 1 owns no port");
    }

    #[test]
    fn test_engine_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Engine>();
    }
}
