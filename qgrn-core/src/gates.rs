//! Gate matrices used by the QuantumGRN circuit.
//!
//! Both layers of the circuit are built from Y rotations, so the state vector
//! stays real-valued; the matrices are still complex to share the state type
//! with general simulators.

use ndarray::{array, Array2};
use num_complex::Complex64;

/// Rotation around Y-axis: RY(θ) = exp(-iθY/2)
pub fn ry(theta: f64) -> Array2<Complex64> {
    let c = (theta / 2.0).cos();
    let s = (theta / 2.0).sin();
    array![
        [Complex64::new(c, 0.0), Complex64::new(-s, 0.0)],
        [Complex64::new(s, 0.0), Complex64::new(c, 0.0)]
    ]
}

/// Analytic derivative dRY(θ)/dθ
pub fn ry_derivative(theta: f64) -> Array2<Complex64> {
    let c = 0.5 * (theta / 2.0).cos();
    let s = 0.5 * (theta / 2.0).sin();
    array![
        [Complex64::new(-s, 0.0), Complex64::new(-c, 0.0)],
        [Complex64::new(c, 0.0), Complex64::new(-s, 0.0)]
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_ry_is_unitary() {
        let g = ry(0.73);
        let product = g.t().mapv(|c| c.conj()).dot(&g);
        let id = ry(0.0);
        for (a, b) in product.iter().zip(id.iter()) {
            assert!((*a - *b).norm() < EPSILON);
        }
    }

    #[test]
    fn test_ry_pi_flips() {
        let g = ry(PI);
        assert!(g[[0, 0]].norm() < EPSILON);
        assert!((g[[1, 0]].re - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_ry_derivative_matches_finite_difference() {
        let theta = 1.1;
        let h = 1e-6;
        let numeric = (ry(theta + h) - ry(theta - h)).mapv(|c| c / (2.0 * h));
        let analytic = ry_derivative(theta);
        for (a, b) in numeric.iter().zip(analytic.iter()) {
            assert!((*a - *b).norm() < 1e-6);
        }
    }
}
