//! End-to-end scheduling scenarios through the public engine API

use phase_scheduler::{
    Approach, Engine, EngineError, Flow, Network, NoLoad, Params, PolicyKind, RandomTopK,
    ScheduleChoice, SchedulingPolicy, Topology,
};
use proptest::prelude::*;
use temporal_graph::{EgressSolve, PortId, TemporalGraph};

const A: usize = 0;
const B: usize = 1;
const C: usize = 2;

fn stepping_engine(kind: PolicyKind, topology: Topology, flows: Vec<Flow>, params: Params) -> Engine {
    let mut engine = Engine::new(kind);
    engine.setup(topology, flows, params).unwrap();
    engine.begin().unwrap();
    engine.prepare_choices().unwrap();
    engine
}

#[test]
fn test_fixed_two_node_quickest() {
    // Each node has one port that always reaches the other node
    let topology = Topology::new(2, vec![A, B], vec![vec![B, A], vec![B, A]]).unwrap();
    let mut engine = stepping_engine(
        PolicyKind::Fixed,
        topology,
        vec![Flow::new(A, B, 1.0)],
        Params::default(),
    );

    assert_eq!(engine.choice(0, A, 0, &NoLoad).unwrap(), ScheduleChoice::new(1, 0));

    // Stable across steps
    for _ in 0..3 {
        engine.prepare_choices().unwrap();
        assert_eq!(engine.choice(0, A, 0, &NoLoad).unwrap(), ScheduleChoice::new(1, 0));
    }
}

#[test]
fn test_fixed_waits_full_cycle_when_port_loops_back() {
    // Port 0 reaches B in phase 0 only
    let topology = Topology::new(2, vec![A, B], vec![vec![B, A], vec![A, B]]).unwrap();
    let mut engine = stepping_engine(
        PolicyKind::Fixed,
        topology,
        vec![Flow::new(A, B, 1.0)],
        Params::default(),
    );

    assert_eq!(engine.choice(0, A, 0, &NoLoad).unwrap(), ScheduleChoice::new(0, 0));
    assert_eq!(engine.choice(1, A, 0, &NoLoad).unwrap(), ScheduleChoice::new(0, 0));
}

#[test]
fn test_random_top_k_step_value_selects_option() {
    // A owns ports 0 and 1, both wired to B: two equal-cost options
    let topology = Topology::new(2, vec![A, A, B], vec![vec![B, B, A]]).unwrap();
    let network = Network::new(TemporalGraph::build(topology), vec![Flow::new(A, B, 1.0)]);
    let flow = network.flows()[0];

    let mut policy = RandomTopK::new(Approach::Quickest, 2);
    policy.setup(&network);
    policy.begin();

    policy.set_step_random(7);
    let first = policy.choice(&network, 0, A, &flow, &NoLoad);
    assert_eq!(first, ScheduleChoice::new(0, 0));
    for _ in 0..5 {
        assert_eq!(policy.choice(&network, 0, A, &flow, &NoLoad), first);
    }

    policy.set_step_random(3);
    assert_eq!(policy.choice(&network, 0, A, &flow, &NoLoad), ScheduleChoice::new(0, 1));
}

#[test]
fn test_capacity_skips_congested_port() {
    // A: port 0 -> B directly, port 1 -> C; C: port 2 -> B; B: port 3 -> A
    let topology = Topology::new(3, vec![A, A, C, B], vec![vec![B, C, B, A]]).unwrap();
    let graph = TemporalGraph::build(topology.clone());
    let solve = EgressSolve::solve(&graph, B, Approach::Quickest);
    let options = solve.ranked_options(&graph, 0, A, 2);
    assert_eq!(options[0].port, 0);
    assert_eq!(options[1].port, 1);
    assert!(options[0].cost < options[1].cost);

    let mut engine = stepping_engine(
        PolicyKind::CapacityTopK,
        topology,
        vec![Flow::new(A, B, 1.0)],
        Params::new(Approach::Quickest, 2, 0.7),
    );

    let congested = |port: PortId| if port == 0 { 0.9 } else { 0.0 };
    assert_eq!(engine.choice(0, A, 0, &congested).unwrap(), options[1].choice());
    assert_eq!(engine.choice(0, A, 0, &NoLoad).unwrap(), options[0].choice());

    let saturated = |_: PortId| f64::INFINITY;
    assert_eq!(engine.choice(0, A, 0, &saturated).unwrap(), options[0].choice());
}

#[test]
fn test_unreachable_egress_still_answers() {
    // Nothing is ever wired to node 2
    let topology = Topology::new(3, vec![A, B, C], vec![vec![B, A, A], vec![B, A, B]]).unwrap();
    for kind in [PolicyKind::Fixed, PolicyKind::RandomTopK, PolicyKind::CapacityTopK] {
        let mut engine = stepping_engine(
            kind,
            topology.clone(),
            vec![Flow::new(A, C, 1.0)],
            Params::default(),
        );
        for phase in 0..2 {
            for node in [A, B, C] {
                let choice = engine.choice(phase, node, 0, &NoLoad).unwrap();
                assert_eq!(topology.owner(choice.port), node, "{}", kind);
            }
        }
    }
}

#[test]
fn test_random_top_k_runs_replay() {
    let flows: Vec<Flow> = (0..5).map(|egress| Flow::new((egress + 2) % 5, egress, 1.0)).collect();
    let params = Params::new(Approach::FewestHops, 2, 0.7);

    let run = |engine: &mut Engine| -> Vec<ScheduleChoice> {
        engine.begin().unwrap();
        let mut choices = Vec::new();
        for _ in 0..6 {
            engine.prepare_choices().unwrap();
            for phase in 0..4 {
                for node in 0..5 {
                    for flow in 0..5 {
                        choices.push(engine.choice(phase, node, flow, &NoLoad).unwrap());
                    }
                }
            }
        }
        choices
    };

    let mut first = Engine::new(PolicyKind::RandomTopK);
    first.setup(Topology::from_test_data(), flows.clone(), params).unwrap();
    let mut second = Engine::new(PolicyKind::RandomTopK);
    second.setup(Topology::from_test_data(), flows, params).unwrap();

    let a = run(&mut first);
    assert_eq!(a, run(&mut second));
    // begin restarts the same sequence
    assert_eq!(a, run(&mut first));
}

#[test]
fn test_choice_before_prepare_is_rejected() {
    let mut engine = Engine::new(PolicyKind::RandomTopK);
    engine
        .setup(Topology::from_test_data(), vec![Flow::new(0, 1, 1.0)], Params::default())
        .unwrap();
    engine.begin().unwrap();
    assert!(matches!(
        engine.choice(0, 0, 0, &NoLoad),
        Err(EngineError::StepNotPrepared)
    ));
}

/// Random rotor-like topologies without self-loops, plus one flow per node
fn arb_network() -> impl Strategy<Value = (Topology, Vec<Flow>)> {
    (2usize..6, 1usize..3, 1usize..5).prop_flat_map(|(nodes, per_node, phases)| {
        let ports = nodes * per_node;
        prop::collection::vec(prop::collection::vec(1..nodes, ports), phases).prop_map(
            move |offsets| {
                let owner: Vec<usize> = (0..ports).map(|port| port / per_node).collect();
                let targets = offsets
                    .iter()
                    .map(|row| {
                        row.iter()
                            .enumerate()
                            .map(|(port, offset)| (owner[port] + offset) % nodes)
                            .collect()
                    })
                    .collect();
                let flows = (0..nodes).map(|egress| Flow::new((egress + 1) % nodes, egress, 1.0)).collect();
                (Topology::new(nodes, owner, targets).unwrap(), flows)
            },
        )
    })
}

fn arb_kind() -> impl Strategy<Value = PolicyKind> {
    prop_oneof![
        Just(PolicyKind::Fixed),
        Just(PolicyKind::RandomTopK),
        Just(PolicyKind::CapacityTopK),
    ]
}

proptest! {
    #[test]
    fn prop_choices_use_owned_ports(
        (topology, flows) in arb_network(),
        kind in arb_kind(),
        num_paths in 1usize..=8,
        loads in prop::collection::vec(0.0f64..2.0, 10),
    ) {
        let params = Params::new(Approach::Quickest, num_paths, 0.7);
        let mut engine = Engine::new(kind);
        engine.setup(topology.clone(), flows.clone(), params).unwrap();
        engine.begin().unwrap();

        let accessor = |port: PortId| loads[port % loads.len()];
        for _ in 0..3 {
            engine.prepare_choices().unwrap();
            for phase in 0..topology.num_phases() {
                for node in 0..topology.num_nodes() {
                    for flow in 0..flows.len() {
                        let choice = engine.choice(phase, node, flow, &accessor).unwrap();
                        prop_assert_eq!(topology.owner(choice.port), node);
                        prop_assert!(choice.phase < topology.num_phases());
                    }
                }
            }
        }
    }

    #[test]
    fn prop_random_top_k_stable_within_step(
        (topology, flows) in arb_network(),
        num_paths in 1usize..=8,
    ) {
        let mut engine = Engine::new(PolicyKind::RandomTopK);
        engine
            .setup(topology.clone(), flows.clone(), Params::new(Approach::Quickest, num_paths, 0.7))
            .unwrap();
        engine.begin().unwrap();
        engine.prepare_choices().unwrap();

        for phase in 0..topology.num_phases() {
            for node in 0..topology.num_nodes() {
                for flow in 0..flows.len() {
                    let first = engine.choice(phase, node, flow, &NoLoad).unwrap();
                    prop_assert_eq!(engine.choice(phase, node, flow, &NoLoad).unwrap(), first);
                }
            }
        }
    }
}
