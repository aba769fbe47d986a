//! Network description loading from JSON files
//!
//! ```json
//! {
//!   "num_phases": 1,
//!   "num_nodes": 2,
//!   "port_owner": [0, 1],
//!   "topology": [[1, 0]],
//!   "flows": [{ "ingress": 0, "egress": 1, "amount": 1.0 }],
//!   "capacities": [4.0, 4.0]
//! }
//! ```
//!
//! `num_phases`, `capacities` and `bandwidths` are optional.

use crate::load::Buffers;
use crate::network::Flow;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use temporal_graph::{NodeId, Topology, TopologyError};
use thiserror::Error;
use tracing::info;

/// Network file errors
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid topology: {0}")]
    Topology(#[from] TopologyError),
    #[error("num_phases is {declared} but the topology lists {actual} phases")]
    PhaseCount { declared: usize, actual: usize },
    #[error("{field} has {actual} entries, expected one per port ({expected})")]
    PortVector {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
}

pub type Result<T> = std::result::Result<T, LoaderError>;

/// Raw network description from JSON
#[derive(Debug, Deserialize)]
struct RawNetwork {
    num_phases: Option<usize>,
    num_nodes: usize,
    port_owner: Vec<NodeId>,
    topology: Vec<Vec<NodeId>>,
    #[serde(default)]
    flows: Vec<Flow>,
    capacities: Option<Vec<f64>>,
    bandwidths: Option<Vec<f64>>,
}

/// A network description ready for engine setup
#[derive(Debug, Clone)]
pub struct NetworkFile {
    pub topology: Topology,
    pub flows: Vec<Flow>,
    /// Empty buffers shaped for the topology and flows
    pub buffers: Buffers,
}

/// Load a network description from a JSON file.
pub fn load_network(path: impl AsRef<Path>) -> Result<NetworkFile> {
    let path = path.as_ref();
    info!("Loading network from {:?}", path);

    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let raw: RawNetwork = serde_json::from_reader(reader)?;

    let network = parse_network(raw)?;
    info!(
        "Loaded network: {} phases, {} nodes, {} ports, {} flows",
        network.topology.num_phases(),
        network.topology.num_nodes(),
        network.topology.num_ports(),
        network.flows.len()
    );
    Ok(network)
}

/// Parse a network description from a JSON string.
pub fn parse_network_str(json: &str) -> Result<NetworkFile> {
    parse_network(serde_json::from_str(json)?)
}

fn parse_network(raw: RawNetwork) -> Result<NetworkFile> {
    if let Some(declared) = raw.num_phases {
        if declared != raw.topology.len() {
            return Err(LoaderError::PhaseCount {
                declared,
                actual: raw.topology.len(),
            });
        }
    }

    let topology = Topology::new(raw.num_nodes, raw.port_owner, raw.topology)?;
    let num_ports = topology.num_ports();

    let mut buffers = Buffers::new(topology.num_phases(), num_ports, raw.flows.len());
    if let Some(capacities) = raw.capacities {
        check_port_vector("capacities", &capacities, num_ports)?;
        buffers = buffers.with_capacities(capacities);
    }
    if let Some(bandwidths) = raw.bandwidths {
        check_port_vector("bandwidths", &bandwidths, num_ports)?;
        buffers = buffers.with_bandwidths(bandwidths);
    }

    Ok(NetworkFile {
        topology,
        flows: raw.flows,
        buffers,
    })
}

fn check_port_vector(field: &'static str, values: &[f64], expected: usize) -> Result<()> {
    if values.len() != expected {
        return Err(LoaderError::PortVector {
            field,
            expected,
            actual: values.len(),
        });
    }
    Ok(())
}
