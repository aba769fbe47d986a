//! Port occupancy
//!
//! The capacity policy reads port load live from the simulator through
//! [`LoadAccessor`]. [`Buffers`] is a ready-made occupancy table that a
//! simulator can use directly; the engine never writes to it.

use crate::network::FlowId;
use serde::{Deserialize, Serialize};
use temporal_graph::{Phase, PortId};

/// Live view of port occupancy
pub trait LoadAccessor {
    /// Units buffered at `port` over all phases, divided by its capacity
    fn port_load(&self, port: PortId) -> f64;
}

impl<F> LoadAccessor for F
where
    F: Fn(PortId) -> f64,
{
    fn port_load(&self, port: PortId) -> f64 {
        self(port)
    }
}

/// Every port empty
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLoad;

impl LoadAccessor for NoLoad {
    fn port_load(&self, _port: PortId) -> f64 {
        0.0
    }
}

/// Buffered units per `(phase, port, flow)`, with per-port capacity and
/// bandwidth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Buffers {
    num_phases: usize,
    num_ports: usize,
    num_flows: usize,
    values: Vec<f64>,
    capacities: Vec<f64>,
    bandwidths: Vec<f64>,
}

impl Buffers {
    /// Empty buffers with unit capacity and bandwidth on every port.
    pub fn new(num_phases: usize, num_ports: usize, num_flows: usize) -> Self {
        Self {
            num_phases,
            num_ports,
            num_flows,
            values: vec![0.0; num_phases * num_ports * num_flows],
            capacities: vec![1.0; num_ports],
            bandwidths: vec![1.0; num_ports],
        }
    }

    pub fn with_capacities(mut self, capacities: Vec<f64>) -> Self {
        debug_assert_eq!(capacities.len(), self.num_ports);
        self.capacities = capacities;
        self
    }

    pub fn with_bandwidths(mut self, bandwidths: Vec<f64>) -> Self {
        debug_assert_eq!(bandwidths.len(), self.num_ports);
        self.bandwidths = bandwidths;
        self
    }

    #[inline]
    fn index(&self, phase: Phase, port: PortId, flow: FlowId) -> usize {
        (phase * self.num_ports + port) * self.num_flows + flow
    }

    pub fn num_phases(&self) -> usize {
        self.num_phases
    }

    pub fn num_ports(&self) -> usize {
        self.num_ports
    }

    pub fn num_flows(&self) -> usize {
        self.num_flows
    }

    pub fn get(&self, phase: Phase, port: PortId, flow: FlowId) -> f64 {
        self.values[self.index(phase, port, flow)]
    }

    pub fn set(&mut self, phase: Phase, port: PortId, flow: FlowId, value: f64) {
        let i = self.index(phase, port, flow);
        self.values[i] = value;
    }

    /// Add `amount` to one buffer.
    pub fn push(&mut self, phase: Phase, port: PortId, flow: FlowId, amount: f64) {
        let i = self.index(phase, port, flow);
        self.values[i] += amount;
    }

    /// Add every buffer of `other` into `self`. Shapes must match.
    pub fn push_buffers(&mut self, other: &Buffers) {
        debug_assert_eq!(self.values.len(), other.values.len());
        for (value, add) in self.values.iter_mut().zip(&other.values) {
            *value += add;
        }
    }

    /// Set every buffer to `value`.
    pub fn fill(&mut self, value: f64) {
        self.values.fill(value);
    }

    pub fn capacity(&self, port: PortId) -> f64 {
        self.capacities[port]
    }

    pub fn bandwidth(&self, port: PortId) -> f64 {
        self.bandwidths[port]
    }

    /// Units queued at `port` for sending in `phase`, all flows
    pub fn packets(&self, port: PortId, phase: Phase) -> f64 {
        let start = self.index(phase, port, 0);
        self.values[start..start + self.num_flows].iter().sum()
    }

    /// `packets(port, phase)` relative to the port capacity
    pub fn load(&self, port: PortId, phase: Phase) -> f64 {
        ratio(self.packets(port, phase), self.capacity(port))
    }

    /// Units queued at `port` over all phases
    pub fn total_packets(&self, port: PortId) -> f64 {
        (0..self.num_phases)
            .map(|phase| self.packets(port, phase))
            .sum()
    }

    /// `total_packets(port)` relative to the port capacity
    pub fn total_port_load(&self, port: PortId) -> f64 {
        ratio(self.total_packets(port), self.capacity(port))
    }

    /// Units buffered anywhere in the network
    pub fn packets_in_network(&self) -> f64 {
        self.values.iter().sum()
    }
}

impl LoadAccessor for Buffers {
    fn port_load(&self, port: PortId) -> f64 {
        self.total_port_load(port)
    }
}

fn ratio(packets: f64, capacity: f64) -> f64 {
    if capacity > 0.0 {
        packets / capacity
    } else if packets > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packets_and_load() {
        let mut buffers = Buffers::new(2, 3, 2).with_capacities(vec![10.0, 4.0, 1.0]);
        buffers.set(0, 1, 0, 1.0);
        buffers.set(0, 1, 1, 2.0);
        buffers.push(1, 1, 1, 1.0);

        assert_eq!(buffers.packets(1, 0), 3.0);
        assert_eq!(buffers.packets(1, 1), 1.0);
        assert_eq!(buffers.load(1, 0), 0.75);
        assert_eq!(buffers.total_packets(1), 4.0);
        assert_eq!(buffers.total_port_load(1), 1.0);
        assert_eq!(buffers.port_load(1), 1.0);
        assert_eq!(buffers.port_load(0), 0.0);
        assert_eq!(buffers.packets_in_network(), 4.0);
    }

    #[test]
    fn test_fill_and_push_buffers() {
        let mut a = Buffers::new(1, 2, 1);
        let mut b = Buffers::new(1, 2, 1);
        a.fill(1.0);
        b.set(0, 1, 0, 2.5);
        a.push_buffers(&b);

        assert_eq!(a.get(0, 0, 0), 1.0);
        assert_eq!(a.get(0, 1, 0), 3.5);
        assert_eq!(a.packets_in_network(), 4.5);
    }

    #[test]
    fn test_zero_capacity() {
        let mut buffers = Buffers::new(1, 1, 1).with_capacities(vec![0.0]);
        assert_eq!(buffers.port_load(0), 0.0);
        buffers.set(0, 0, 0, 1.0);
        assert!(buffers.port_load(0).is_infinite());
    }

    #[test]
    fn test_closure_accessor() {
        let loads = [0.9, 0.1];
        let accessor = |port: PortId| loads[port];
        assert_eq!(accessor.port_load(0), 0.9);
        assert_eq!(NoLoad.port_load(7), 0.0);
    }
}
