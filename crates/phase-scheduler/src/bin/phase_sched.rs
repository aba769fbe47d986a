//! Phase scheduler CLI
//!
//! Usage:
//!   phase-sched dot [--network FILE] [--edge-labels]
//!   phase-sched stats [--network FILE]
//!   phase-sched choices [--network FILE] [--policy NAME] [--steps N]
//!   phase-sched list-policies
//!
//! Without `--network` the 4-phase, 5-node reference topology is used with
//! one flow toward every node. Policy parameters are read from the
//! `CHOICE_*` / `CAPACITY_*` environment keys.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use phase_scheduler::loader::{load_network, NetworkFile};
use phase_scheduler::{available_policies, Buffers, Engine, Flow, Params, PolicyKind};
use serde::Serialize;
use std::path::{Path, PathBuf};
use temporal_graph::{DotOptions, ScheduleChoice, TemporalGraph, Topology};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "phase-sched",
    about = "Buffering decisions for phase-cyclic rotor networks",
    version
)]
struct Cli {
    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the temporal graph in Graphviz DOT format.
    Dot {
        /// Path to a JSON network description.
        #[arg(short, long)]
        network: Option<PathBuf>,
        /// Label edges with their weights.
        #[arg(long)]
        edge_labels: bool,
    },
    /// Print temporal graph statistics as JSON.
    Stats {
        /// Path to a JSON network description.
        #[arg(short, long)]
        network: Option<PathBuf>,
    },
    /// Print the choice of a policy for every (phase, node, flow) as JSON.
    Choices {
        /// Path to a JSON network description.
        #[arg(short, long)]
        network: Option<PathBuf>,
        /// Scheduling policy name.
        #[arg(short, long, default_value = "fixed")]
        policy: PolicyKind,
        /// Number of phase steps to query.
        #[arg(short, long, default_value = "1")]
        steps: u64,
    },
    /// List available policies.
    ListPolicies,
}

#[derive(Serialize)]
struct ChoiceRecord {
    step: u64,
    phase: usize,
    node: usize,
    flow: usize,
    egress: usize,
    choice: ScheduleChoice,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Dot {
            network,
            edge_labels,
        } => {
            let network = network_or_reference(network.as_deref())?;
            let graph = TemporalGraph::build(network.topology);
            print!("{}", graph.to_dot(DotOptions { edge_labels }));
        }
        Commands::Stats { network } => {
            let network = network_or_reference(network.as_deref())?;
            let graph = TemporalGraph::build(network.topology);
            println!("{}", serde_json::to_string_pretty(&graph.stats())?);
        }
        Commands::Choices {
            network,
            policy,
            steps,
        } => {
            let network = network_or_reference(network.as_deref())?;
            let records = run_choices(network, policy, steps)?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Commands::ListPolicies => {
            for name in available_policies() {
                println!("{}", name);
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "phase_scheduler=debug,temporal_graph=debug"
    } else {
        "phase_scheduler=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn network_or_reference(path: Option<&Path>) -> Result<NetworkFile> {
    match path {
        Some(path) => {
            load_network(path).with_context(|| format!("Failed to load network from {:?}", path))
        }
        None => {
            let topology = Topology::from_test_data();
            let num_nodes = topology.num_nodes();
            let flows: Vec<Flow> = (0..num_nodes)
                .map(|egress| Flow::new((egress + 1) % num_nodes, egress, 1.0))
                .collect();
            let buffers = Buffers::new(topology.num_phases(), topology.num_ports(), flows.len());
            Ok(NetworkFile {
                topology,
                flows,
                buffers,
            })
        }
    }
}

fn run_choices(network: NetworkFile, kind: PolicyKind, steps: u64) -> Result<Vec<ChoiceRecord>> {
    let params = Params::from_env(kind).context("Invalid policy configuration")?;
    let NetworkFile {
        topology,
        flows,
        buffers,
    } = network;
    let (num_phases, num_nodes) = (topology.num_phases(), topology.num_nodes());
    let egresses: Vec<usize> = flows.iter().map(|flow| flow.egress).collect();

    let mut engine = Engine::new(kind);
    engine.setup(topology, flows, params)?;
    engine.begin()?;
    info!(policy = %kind, steps, "Querying choices");

    let mut records = Vec::new();
    for step in 0..steps {
        engine.prepare_choices()?;
        for phase in 0..num_phases {
            for node in 0..num_nodes {
                for (flow, &egress) in egresses.iter().enumerate() {
                    let choice = engine.choice(phase, node, flow, &buffers)?;
                    records.push(ChoiceRecord {
                        step,
                        phase,
                        node,
                        flow,
                        egress,
                        choice,
                    });
                }
            }
        }
    }
    Ok(records)
}
