use ndarray::Array1;
use num_complex::Complex64;

/// Represents the joint expression state of a gene regulatory network.
/// Each gene is one qubit; the state vector spans all 2^G expression patterns.
///
/// Index Mapping:
/// bit g of a basis index is the expression (0 = off, 1 = on) of gene g.
#[derive(Debug, Clone)]
pub struct GrnState {
    pub num_genes: usize,
    pub state_vector: Array1<Complex64>,
}

impl GrnState {
    /// Creates a new GrnState initialized to |0...0>
    pub fn new(num_genes: usize) -> Self {
        let mut state_vector = Array1::<Complex64>::zeros(1 << num_genes);
        state_vector[0] = Complex64::new(1.0, 0.0);

        GrnState {
            num_genes,
            state_vector,
        }
    }

    /// Wraps an existing amplitude vector.
    pub fn from_amplitudes(num_genes: usize, state_vector: Array1<Complex64>) -> Self {
        debug_assert_eq!(state_vector.len(), 1 << num_genes);
        GrnState {
            num_genes,
            state_vector,
        }
    }

    pub fn dimension(&self) -> usize {
        self.state_vector.len()
    }

    /// Probability of every basis state.
    pub fn probabilities(&self) -> Array1<f64> {
        self.state_vector.mapv(|c| c.norm_sqr())
    }
}
