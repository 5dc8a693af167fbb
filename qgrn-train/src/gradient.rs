//! Gradient assembly
//!
//! Maps the circuit's per-parameter state derivatives onto the gradient of
//! the smoothed loss. For a parameter θ_k with state derivative dv:
//!
//! ```text
//! ∂p_i/∂θ_k   = 2 · Re(conj(v_i) · dv_i)
//! ∂h_i/∂θ_k   = (ncells / h_N_out) · ∂p_i/∂θ_k            (smoothed p_out)
//! ∂L_kl/∂h_i  = 1 + log(h_out_i / h_obs_i)
//! ∂L_diff/∂h_i = 2 · (h_out_i − h_obs_i)
//! ```

use ndarray::Array1;
use qgrn_core::{DerivativeTable, EdgeKey, GrnError, GrnState, Result};

use crate::loss::{laplace_smooth, LossMethod};

// =============================================================================
// Gradient Vector
// =============================================================================

/// Gradient of the loss with respect to every (control, target) parameter.
///
/// Shares the dense control-major layout of `ParameterSet`; untrained keys
/// stay at zero.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientVector {
    ngenes: usize,
    values: Array1<f64>,
}

impl GradientVector {
    pub fn new(ngenes: usize) -> Self {
        GradientVector {
            ngenes,
            values: Array1::zeros(ngenes * ngenes),
        }
    }

    pub fn ngenes(&self) -> usize {
        self.ngenes
    }

    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    pub fn get(&self, key: EdgeKey) -> f64 {
        self.values[key.index(self.ngenes)]
    }

    pub fn set(&mut self, key: EdgeKey, value: f64) {
        self.values[key.index(self.ngenes)] = value;
    }

    pub fn fill(&mut self, value: f64) {
        self.values.fill(value);
    }

    /// Euclidean norm
    pub fn norm(&self) -> f64 {
        self.values.dot(&self.values).sqrt()
    }
}

/// Trainable keys: encoder keys (if enabled) followed by the declared edges
pub fn trainable_keys(ngenes: usize, edges: &[EdgeKey], train_self_loops: bool) -> Vec<EdgeKey> {
    let encoder = (0..ngenes)
        .map(EdgeKey::self_loop)
        .filter(|_| train_self_loops);
    encoder.chain(edges.iter().copied()).collect()
}

// =============================================================================
// Assembler
// =============================================================================

/// Smoothed distributions produced while assembling a gradient
#[derive(Debug, Clone)]
pub struct SmoothedDistributions {
    pub h_p_out: Array1<f64>,
    pub h_n_out: f64,
    pub h_p_obs: Array1<f64>,
    pub h_n_obs: f64,
}

/// Inputs of one gradient evaluation
#[derive(Debug, Clone, Copy)]
pub struct GradientAssembler<'a> {
    pub method: LossMethod,
    pub ncells: usize,
    pub p_obs: &'a Array1<f64>,
    pub p_out: &'a Array1<f64>,
    pub state: &'a GrnState,
    pub derivatives: Option<&'a DerivativeTable>,
}

impl<'a> GradientAssembler<'a> {
    /// Overwrite `gradient` with the loss gradient for `keys`.
    ///
    /// Every other key is reset to zero. Returns the smoothed distributions
    /// the gradient was taken on.
    pub fn assemble(
        &self,
        keys: &[EdgeKey],
        gradient: &mut GradientVector,
    ) -> Result<SmoothedDistributions> {
        let derivatives = self
            .derivatives
            .filter(|d| !d.is_empty())
            .ok_or(GrnError::EmptyDerivatives)?;

        let dim = self.state.dimension();
        for len in [self.p_out.len(), self.p_obs.len()] {
            if len != dim {
                return Err(GrnError::DimensionMismatch {
                    expected: dim,
                    found: len,
                });
            }
        }

        let (h_p_out, h_n_out) = laplace_smooth(self.p_out, self.ncells);
        let (h_p_obs, h_n_obs) = laplace_smooth(self.p_obs, self.ncells);

        // ∂L/∂h_out per state
        let outer: Array1<f64> = match self.method {
            LossMethod::KlDivergence => h_p_out
                .iter()
                .zip(h_p_obs.iter())
                .map(|(&num, &den)| 1.0 + (num / den).ln())
                .collect(),
            LossMethod::Difference => (&h_p_out - &h_p_obs) * 2.0,
        };
        let rescale = self.ncells as f64 / h_n_out;

        gradient.fill(0.0);
        for &key in keys {
            let d_state = derivatives.column(key).ok_or(GrnError::EmptyDerivatives)?;
            if d_state.len() != dim {
                return Err(GrnError::DimensionMismatch {
                    expected: dim,
                    found: d_state.len(),
                });
            }

            let value: f64 = outer
                .iter()
                .zip(self.state.state_vector.iter())
                .zip(d_state.iter())
                .map(|((o, v), dv)| o * 2.0 * (v.conj() * *dv).re * rescale)
                .sum();
            gradient.set(key, value);
        }

        Ok(SmoothedDistributions {
            h_p_out,
            h_n_out,
            h_p_obs,
            h_n_obs,
        })
    }
}
