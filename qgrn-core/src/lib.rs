//! # QGRN-Core: Quantum Circuits for Gene Regulatory Networks
//!
//! Statevector simulation of QuantumGRN circuits: each gene is a qubit, an
//! encoder layer sets per-gene expression and a regulation layer of
//! controlled rotations encodes the directed edges of the network.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use qgrn_core::{all_edges, GrnCircuit, ParameterSet, QuantumGrnCircuit};
//!
//! let genes = vec!["a".to_string(), "b".to_string()];
//! let theta = ParameterSet::new(genes.clone()).with_encoder(std::f64::consts::FRAC_PI_2);
//! let mut circuit = QuantumGrnCircuit::new(genes, all_edges(2), true)?;
//! circuit.generate_circuit(&theta)?;
//! let p_out = circuit.output_probabilities(true)?;
//! ```

pub mod circuit;
pub mod distribution;
pub mod error;
pub mod gates;
pub mod ops;
pub mod params;
pub mod state;

pub use circuit::{DerivativeTable, GrnCircuit, QuantumGrnCircuit};
pub use distribution::{counted_cells, observed_distribution, validate_distribution};
pub use error::{GrnError, Result};
pub use params::{all_edges, EdgeKey, ParameterSet};
pub use state::GrnState;
