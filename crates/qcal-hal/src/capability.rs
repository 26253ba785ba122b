//! Backend capability introspection.
//!
//! Static device description consumed once when a calibration store is
//! created: qubit count, directed coupling edges with their control lines,
//! per-qubit frequency and anharmonicity defaults, and pulse timing
//! constraints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hardware capabilities of a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capabilities {
    /// Name of the backend.
    pub name: String,
    /// Number of qubits available.
    pub num_qubits: u32,
    /// Directed coupling map with control-line assignments.
    pub topology: Topology,
    /// Per-qubit defaults, indexed by qubit.
    pub qubits: Vec<QubitProperties>,
    /// Pulse timing constraints.
    pub timing: Timing,
    /// Maximum number of shots per program.
    pub max_shots: u32,
    /// Whether this is a simulator.
    pub is_simulator: bool,
    /// Timestamp of the device properties snapshot.
    pub updated_at: DateTime<Utc>,
}

impl Capabilities {
    /// Capabilities of a simulated device with uniform qubits on a line.
    pub fn simulator(num_qubits: u32) -> Self {
        let qubits = (0..num_qubits)
            .map(|q| QubitProperties {
                drive_freq: 4.9e9 + 0.05e9 * f64::from(q),
                meas_freq: 7.1e9 + 0.02e9 * f64::from(q),
                anharmonicity: -330e6,
            })
            .collect();

        Self {
            name: "qutrit_simulator".into(),
            num_qubits,
            topology: Topology::linear(num_qubits),
            qubits,
            timing: Timing::default(),
            max_shots: 100_000,
            is_simulator: true,
            updated_at: Utc::now(),
        }
    }

    /// Replace the topology.
    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    /// Replace the timing constraints.
    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    /// Set the properties timestamp.
    pub fn with_updated_at(mut self, at: DateTime<Utc>) -> Self {
        self.updated_at = at;
        self
    }

    /// Properties of one qubit.
    pub fn qubit(&self, qubit: u32) -> Option<&QubitProperties> {
        self.qubits.get(qubit as usize)
    }
}

/// Per-qubit device defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QubitProperties {
    /// 0–1 transition frequency (Hz).
    pub drive_freq: f64,
    /// Readout resonator frequency (Hz).
    pub meas_freq: f64,
    /// Anharmonicity f12 − f01 (Hz, negative for transmons).
    pub anharmonicity: f64,
}

/// Pulse timing constraints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    /// Sample period (s).
    pub dt: f64,
    /// Pulse lengths must be multiples of this many samples.
    pub granularity: u64,
    /// Shortest allowed pulse in samples.
    pub min_length: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            dt: 2.0e-9 / 9.0,
            granularity: 16,
            min_length: 64,
        }
    }
}

impl Timing {
    /// Round a sample count to the nearest allowed pulse length.
    pub fn round_pulse_samples(&self, samples: u64) -> u64 {
        let g = self.granularity.max(1);
        let rounded = ((samples as f64 / g as f64).round() as u64) * g;
        rounded.max(self.min_length)
    }

    /// Convert a time in seconds to the nearest allowed pulse length.
    pub fn round_pulse_time(&self, seconds: f64) -> u64 {
        let samples = (seconds / self.dt).round().max(0.0) as u64;
        self.round_pulse_samples(samples)
    }

    /// Convert samples to seconds.
    pub fn to_seconds(&self, samples: f64) -> f64 {
        samples * self.dt
    }
}

/// A directed coupling edge and the control line driving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouplingEdge {
    /// Qubit whose line carries the drive.
    pub control: u32,
    /// Partner qubit.
    pub target: u32,
    /// Control channel index (`u{channel}`).
    pub channel: u32,
}

/// Qubit connectivity topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topology {
    /// Kind of topology.
    pub kind: TopologyKind,
    /// Directed edges, in device order.
    pub edges: Vec<CouplingEdge>,
}

impl Topology {
    /// Build a topology from undirected pairs; both directions get a line.
    fn from_pairs(kind: TopologyKind, pairs: impl IntoIterator<Item = (u32, u32)>) -> Self {
        let mut edges = Vec::new();
        for (a, b) in pairs {
            let channel = edges.len() as u32;
            edges.push(CouplingEdge {
                control: a,
                target: b,
                channel,
            });
            edges.push(CouplingEdge {
                control: b,
                target: a,
                channel: channel + 1,
            });
        }
        Self { kind, edges }
    }

    /// Create a linear topology.
    pub fn linear(n: u32) -> Self {
        Self::from_pairs(
            TopologyKind::Linear,
            (0..n.saturating_sub(1)).map(|i| (i, i + 1)),
        )
    }

    /// Create a star topology.
    pub fn star(n: u32) -> Self {
        Self::from_pairs(TopologyKind::Star, (1..n).map(|i| (0, i)))
    }

    /// Create a grid topology.
    pub fn grid(rows: u32, cols: u32) -> Self {
        let mut pairs = vec![];
        for r in 0..rows {
            for c in 0..cols {
                let idx = r * cols + c;
                if c + 1 < cols {
                    pairs.push((idx, idx + 1));
                }
                if r + 1 < rows {
                    pairs.push((idx, idx + cols));
                }
            }
        }
        Self::from_pairs(TopologyKind::Grid { rows, cols }, pairs)
    }

    /// Create a custom topology from directed edges; channels follow edge order.
    pub fn custom(edges: Vec<(u32, u32)>) -> Self {
        let edges = edges
            .into_iter()
            .enumerate()
            .map(|(i, (control, target))| CouplingEdge {
                control,
                target,
                channel: i as u32,
            })
            .collect();
        Self {
            kind: TopologyKind::Custom,
            edges,
        }
    }

    /// First edge driven from `qubit`, in device order.
    pub fn first_edge_from(&self, qubit: u32) -> Option<&CouplingEdge> {
        self.edges.iter().find(|e| e.control == qubit)
    }

    /// Control channel for a directed pair.
    pub fn control_channel(&self, control: u32, target: u32) -> Option<u32> {
        self.edges
            .iter()
            .find(|e| e.control == control && e.target == target)
            .map(|e| e.channel)
    }

    /// Check if two qubits are connected in either direction.
    pub fn is_connected(&self, q1: u32, q2: u32) -> bool {
        self.edges.iter().any(|e| {
            (e.control == q1 && e.target == q2) || (e.control == q2 && e.target == q1)
        })
    }
}

/// Kind of qubit topology.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[non_exhaustive]
pub enum TopologyKind {
    /// Linear chain.
    Linear,
    /// Star topology (center connected to all).
    Star,
    /// 2D grid.
    Grid { rows: u32, cols: u32 },
    /// Arbitrary directed edges.
    Custom,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_channels() {
        let topo = Topology::linear(3);
        assert_eq!(topo.edges.len(), 4);
        assert_eq!(topo.control_channel(0, 1), Some(0));
        assert_eq!(topo.control_channel(1, 0), Some(1));
        assert_eq!(topo.first_edge_from(1).map(|e| e.channel), Some(1));
        assert_eq!(topo.first_edge_from(2).map(|e| e.target), Some(1));
        assert!(topo.is_connected(2, 1));
        assert!(!topo.is_connected(0, 2));
    }

    #[test]
    fn test_isolated_qubit_has_no_edge() {
        let topo = Topology::custom(vec![(0, 1), (1, 0)]);
        assert!(topo.first_edge_from(2).is_none());
    }

    #[test]
    fn test_grid_edges() {
        let topo = Topology::grid(2, 2);
        // 4 undirected pairs, two lines each
        assert_eq!(topo.edges.len(), 8);
    }

    #[test]
    fn test_round_pulse() {
        let timing = Timing::default();
        assert_eq!(timing.round_pulse_samples(1120), 1120);
        assert_eq!(timing.round_pulse_samples(1125), 1120);
        assert_eq!(timing.round_pulse_samples(10), 64);
        // 4 µs at dt = 2/9 ns is 18000 samples
        assert_eq!(timing.round_pulse_time(4.0e-6), 18000);
    }

    #[test]
    fn test_simulator_capabilities() {
        let caps = Capabilities::simulator(3);
        assert_eq!(caps.qubits.len(), 3);
        assert!(caps.is_simulator);
        assert!(caps.qubit(2).is_some());
        assert!(caps.qubit(3).is_none());
    }
}
