//! QuantumGRN circuit
//!
//! A gene regulatory network hypothesis encoded as a quantum circuit: one
//! qubit per gene, an encoder layer `L_enc` of RY rotations (one per gene)
//! followed by a regulation layer `L_k` of controlled-RY rotations (one per
//! directed edge, in declared order).
//!
//! # Architecture
//!
//! ```text
//! |0>_g0 ── RY(θ00) ──●──────────── ...
//! |0>_g1 ── RY(θ11) ──RY(θ01)──●── ...
//! |0>_g2 ── RY(θ22) ───────────RY(θ12) ...
//!          └ L_enc ┘ └──────── L_k ─────┘
//! ```
//!
//! # Derivatives
//!
//! Every parameter drives exactly one gate, so the derivative of the output
//! state with respect to θ_k is the circuit with gate k replaced by its
//! analytic derivative. When the all-zero state is dropped, the output is
//! renormalised and that normalisation is differentiated as well.

use ndarray::Array1;
use num_complex::Complex64;
use std::collections::BTreeMap;

use crate::error::{GrnError, Result};
use crate::gates;
use crate::ops::{apply_controlled_gate, apply_gate, apply_projected_controlled_gate};
use crate::params::{EdgeKey, ParameterSet};
use crate::state::GrnState;

/// Norm below which the dropped-zero output is considered degenerate
const DEGENERATE_NORM: f64 = 1e-15;

// =============================================================================
// Collaborator Interface
// =============================================================================

/// Circuit collaborator driven by the optimizer.
///
/// Implementors simulate a parameterised circuit over 2^G basis states and
/// expose analytic derivatives of the output state per parameter.
pub trait GrnCircuit {
    /// Gene names, one per qubit
    fn genes(&self) -> &[String];

    /// Declared regulatory edges, in circuit order
    fn edges(&self) -> &[EdgeKey];

    /// Whether the all-zero expression state is dropped from the output
    fn drop_zero(&self) -> bool;

    /// Whether `generate_circuit` has been called
    fn is_generated(&self) -> bool;

    /// Rebuild the circuit for the given parameters. Invalidates derivatives.
    fn generate_circuit(&mut self, theta: &ParameterSet) -> Result<()>;

    /// Output amplitudes, with the all-zero state removed if `drop_zero()`
    fn output_state(&self) -> Result<GrnState>;

    /// Output probability distribution over all 2^G states
    fn output_probabilities(&self, drop_zero: bool) -> Result<Array1<f64>>;

    /// Populate the derivative table for the current parameters
    fn compute_derivatives(&mut self) -> Result<()>;

    /// Derivative table, `None` until computed for the current parameters
    fn derivatives(&self) -> Option<&DerivativeTable>;

    fn ngenes(&self) -> usize {
        self.genes().len()
    }

    fn dimension(&self) -> usize {
        1 << self.ngenes()
    }
}

// =============================================================================
// Derivative Table
// =============================================================================

/// Per-parameter derivative of the output state, keyed by (control, target)
#[derive(Debug, Clone, Default)]
pub struct DerivativeTable {
    columns: BTreeMap<EdgeKey, Array1<Complex64>>,
}

impl DerivativeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: EdgeKey, column: Array1<Complex64>) {
        self.columns.insert(key, column);
    }

    /// Derivative of every state amplitude with respect to `key`
    pub fn column(&self, key: EdgeKey) -> Option<&Array1<Complex64>> {
        self.columns.get(&key)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

// =============================================================================
// Reference Circuit
// =============================================================================

/// A gate of the QuantumGRN circuit with its bound angle
#[derive(Debug, Clone, Copy)]
enum Gate {
    Encoder {
        gene: usize,
        angle: f64,
    },
    Regulation {
        control: usize,
        target: usize,
        angle: f64,
    },
}

impl Gate {
    fn key(&self) -> EdgeKey {
        match *self {
            Gate::Encoder { gene, .. } => EdgeKey::self_loop(gene),
            Gate::Regulation {
                control, target, ..
            } => EdgeKey::new(control, target),
        }
    }

    fn apply(&self, state: &mut GrnState) {
        match *self {
            Gate::Encoder { gene, angle } => apply_gate(state, gene, &gates::ry(angle)),
            Gate::Regulation {
                control,
                target,
                angle,
            } => apply_controlled_gate(state, control, target, &gates::ry(angle)),
        }
    }

    fn apply_derivative(&self, state: &mut GrnState) {
        match *self {
            Gate::Encoder { gene, angle } => {
                apply_gate(state, gene, &gates::ry_derivative(angle))
            }
            Gate::Regulation {
                control,
                target,
                angle,
            } => apply_projected_controlled_gate(
                state,
                control,
                target,
                &gates::ry_derivative(angle),
            ),
        }
    }
}

/// Statevector simulation of a QuantumGRN hypothesis
#[derive(Debug, Clone)]
pub struct QuantumGrnCircuit {
    genes: Vec<String>,
    edges: Vec<EdgeKey>,
    drop_zero: bool,
    gates: Vec<Gate>,
    derivatives: Option<DerivativeTable>,
}

impl QuantumGrnCircuit {
    /// Create a circuit for `genes` with the regulation edges `edges`.
    ///
    /// Edges must connect two distinct known genes and may appear once.
    pub fn new(genes: Vec<String>, edges: Vec<EdgeKey>, drop_zero: bool) -> Result<Self> {
        let n = genes.len();
        if n == 0 {
            return Err(GrnError::InvalidConfig(
                "a QuantumGRN circuit needs at least one gene".into(),
            ));
        }

        let label = |g: usize| genes.get(g).cloned().unwrap_or_else(|| format!("#{g}"));
        let mut seen = std::collections::BTreeSet::new();
        for edge in &edges {
            let reason = if edge.control >= n || edge.target >= n {
                Some("gene index out of range")
            } else if edge.is_self_loop() {
                Some("self-edges are encoder parameters")
            } else if !seen.insert(*edge) {
                Some("duplicate edge")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(GrnError::InvalidEdge {
                    control: label(edge.control),
                    target: label(edge.target),
                    reason: reason.to_string(),
                });
            }
        }

        Ok(QuantumGrnCircuit {
            genes,
            edges,
            drop_zero,
            gates: Vec::new(),
            derivatives: None,
        })
    }

    /// Create a circuit from (control, target) gene-name pairs
    pub fn from_names(genes: Vec<String>, edges: &[(&str, &str)], drop_zero: bool) -> Result<Self> {
        let lookup = ParameterSet::new(genes.clone());
        let edges = edges
            .iter()
            .map(|(c, t)| lookup.key(c, t))
            .collect::<Result<Vec<_>>>()?;
        Self::new(genes, edges, drop_zero)
    }

    /// States before each gate, followed by the final raw state
    fn forward(&self) -> Result<Vec<GrnState>> {
        if self.gates.is_empty() {
            return Err(GrnError::EmptyCircuit);
        }
        let mut states = Vec::with_capacity(self.gates.len() + 1);
        let mut state = GrnState::new(self.ngenes());
        for gate in &self.gates {
            states.push(state.clone());
            gate.apply(&mut state);
        }
        states.push(state);
        Ok(states)
    }

    fn dropped_norm_sqr(raw: &Array1<Complex64>) -> Result<f64> {
        let norm_sq: f64 = raw.iter().skip(1).map(|c| c.norm_sqr()).sum();
        if norm_sq < DEGENERATE_NORM {
            return Err(GrnError::DegenerateOutput);
        }
        Ok(norm_sq)
    }

    /// Apply the drop-zero projection and renormalisation
    fn finalize(&self, raw: &Array1<Complex64>) -> Result<Array1<Complex64>> {
        if !self.drop_zero {
            return Ok(raw.clone());
        }
        let norm = Self::dropped_norm_sqr(raw)?.sqrt();
        let mut out = raw.mapv(|c| c / norm);
        out[0] = Complex64::new(0.0, 0.0);
        Ok(out)
    }

    /// Derivative of [`finalize`](Self::finalize) given the raw derivative
    fn finalize_derivative(
        &self,
        raw: &Array1<Complex64>,
        d_raw: &Array1<Complex64>,
    ) -> Result<Array1<Complex64>> {
        if !self.drop_zero {
            return Ok(d_raw.clone());
        }
        let norm_sq = Self::dropped_norm_sqr(raw)?;
        let norm = norm_sq.sqrt();
        let d_norm_sq: f64 = raw
            .iter()
            .zip(d_raw.iter())
            .skip(1)
            .map(|(v, dv)| 2.0 * (v.conj() * *dv).re)
            .sum();
        let scale = d_norm_sq / (2.0 * norm_sq * norm);

        let mut out = Array1::from_iter(
            raw.iter()
                .zip(d_raw.iter())
                .map(|(v, dv)| *dv / norm - *v * scale),
        );
        out[0] = Complex64::new(0.0, 0.0);
        Ok(out)
    }
}

impl GrnCircuit for QuantumGrnCircuit {
    fn genes(&self) -> &[String] {
        &self.genes
    }

    fn edges(&self) -> &[EdgeKey] {
        &self.edges
    }

    fn drop_zero(&self) -> bool {
        self.drop_zero
    }

    fn is_generated(&self) -> bool {
        !self.gates.is_empty()
    }

    fn generate_circuit(&mut self, theta: &ParameterSet) -> Result<()> {
        if theta.ngenes() != self.ngenes() {
            return Err(GrnError::DimensionMismatch {
                expected: self.ngenes(),
                found: theta.ngenes(),
            });
        }

        let encoder = (0..self.ngenes()).map(|gene| Gate::Encoder {
            gene,
            angle: theta.get(EdgeKey::self_loop(gene)),
        });
        let regulation = self.edges.iter().map(|&edge| Gate::Regulation {
            control: edge.control,
            target: edge.target,
            angle: theta.get(edge),
        });
        self.gates = encoder.chain(regulation).collect();
        self.derivatives = None;
        Ok(())
    }

    fn output_state(&self) -> Result<GrnState> {
        let mut states = self.forward()?;
        let raw = states.pop().ok_or(GrnError::EmptyCircuit)?;
        let amplitudes = self.finalize(&raw.state_vector)?;
        Ok(GrnState::from_amplitudes(self.ngenes(), amplitudes))
    }

    fn output_probabilities(&self, drop_zero: bool) -> Result<Array1<f64>> {
        let mut states = self.forward()?;
        let raw = states.pop().ok_or(GrnError::EmptyCircuit)?;
        let mut probs = raw.probabilities();
        if drop_zero {
            Self::dropped_norm_sqr(&raw.state_vector)?;
            probs[0] = 0.0;
            let total = probs.sum();
            probs /= total;
        }
        Ok(probs)
    }

    fn compute_derivatives(&mut self) -> Result<()> {
        let states = self.forward()?;
        let raw = &states[self.gates.len()].state_vector;

        let mut table = DerivativeTable::new();
        for (k, gate) in self.gates.iter().enumerate() {
            let mut state = states[k].clone();
            gate.apply_derivative(&mut state);
            for later in &self.gates[k + 1..] {
                later.apply(&mut state);
            }
            table.insert(gate.key(), self.finalize_derivative(raw, &state.state_vector)?);
        }

        self.derivatives = Some(table);
        Ok(())
    }

    fn derivatives(&self) -> Option<&DerivativeTable> {
        self.derivatives.as_ref()
    }
}

// =============================================================================
// Tests
// =============================================================================
