//! Loss functions and Laplace smoothing
//!
//! The loss compares the circuit's output distribution with the observed
//! one. KL divergence needs strictly positive inputs, so both distributions
//! are Laplace-smoothed with the cell count before the logarithm is taken.

use ndarray::Array1;
use qgrn_core::{GrnError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pseudo-count added to every state by [`laplace_smooth`]
pub const LAPLACE_ALPHA: f64 = 1.0;

/// Divergence between output and observed distributions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LossMethod {
    /// Σ p_out · log(p_out / p_obs)
    #[default]
    KlDivergence,
    /// Σ (p_out − p_obs)²
    Difference,
}

impl LossMethod {
    pub fn name(&self) -> &'static str {
        match self {
            LossMethod::KlDivergence => "kl-divergence",
            LossMethod::Difference => "difference",
        }
    }
}

impl fmt::Display for LossMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LossMethod {
    type Err = GrnError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "kl-divergence" => Ok(LossMethod::KlDivergence),
            "difference" => Ok(LossMethod::Difference),
            other => Err(GrnError::UnsupportedMethod(other.to_string())),
        }
    }
}

fn check_dims(p_out: &Array1<f64>, p_obs: &Array1<f64>) -> Result<()> {
    if p_out.len() != p_obs.len() {
        return Err(GrnError::DimensionMismatch {
            expected: p_obs.len(),
            found: p_out.len(),
        });
    }
    Ok(())
}

/// Loss between output and observed distributions.
///
/// `KlDivergence` expects strictly positive inputs (smooth them first).
pub fn loss(p_out: &Array1<f64>, p_obs: &Array1<f64>, method: LossMethod) -> Result<f64> {
    check_dims(p_out, p_obs)?;
    let value = match method {
        LossMethod::KlDivergence => p_out
            .iter()
            .zip(p_obs.iter())
            .map(|(&num, &den)| num * (num / den).ln())
            .sum(),
        LossMethod::Difference => squared_error(p_out, p_obs),
    };
    Ok(value)
}

/// Squared-error diagnostic, independent of the loss method
pub fn compute_error(p_out: &Array1<f64>, p_obs: &Array1<f64>) -> Result<f64> {
    check_dims(p_out, p_obs)?;
    Ok(squared_error(p_out, p_obs))
}

fn squared_error(p_out: &Array1<f64>, p_obs: &Array1<f64>) -> f64 {
    p_out
        .iter()
        .zip(p_obs.iter())
        .map(|(a, b)| (a - b).powi(2))
        .sum()
}

/// Add-one smoothing of a distribution observed over `ncells` samples.
///
/// Returns the smoothed distribution and its smoothed total count
/// `Σ ncells·p + α·dim`.
pub fn laplace_smooth(distribution: &Array1<f64>, ncells: usize) -> (Array1<f64>, f64) {
    let counts = distribution * ncells as f64;
    let total = counts.sum() + LAPLACE_ALPHA * distribution.len() as f64;
    let smoothed = (counts + LAPLACE_ALPHA) / total;
    (smoothed, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    const EPSILON: f64 = 1e-12;

    #[test]
    fn test_method_parsing() {
        assert_eq!(
            "kl-divergence".parse::<LossMethod>().unwrap(),
            LossMethod::KlDivergence
        );
        assert_eq!(
            "difference".parse::<LossMethod>().unwrap(),
            LossMethod::Difference
        );
        assert!(matches!(
            "hellinger".parse::<LossMethod>(),
            Err(GrnError::UnsupportedMethod(m)) if m == "hellinger"
        ));
        assert_eq!(LossMethod::KlDivergence.to_string(), "kl-divergence");
    }

    #[test]
    fn test_method_serde() {
        let json = serde_json::to_string(&LossMethod::KlDivergence).unwrap();
        assert_eq!(json, "\"kl-divergence\"");
        let parsed: LossMethod = serde_json::from_str("\"difference\"").unwrap();
        assert_eq!(parsed, LossMethod::Difference);
    }

    #[test]
    fn test_loss_of_identical_distributions_is_zero() {
        let p = array![0.1, 0.2, 0.3, 0.4];
        assert!(loss(&p, &p, LossMethod::Difference).unwrap().abs() < EPSILON);
        assert!(loss(&p, &p, LossMethod::KlDivergence).unwrap().abs() < EPSILON);
    }

    #[test]
    fn test_kl_divergence_value() {
        let p = array![0.5, 0.5];
        let q = array![0.25, 0.75];
        let expected = 0.5 * (2.0f64).ln() + 0.5 * (0.5f64 / 0.75).ln();
        let value = loss(&p, &q, LossMethod::KlDivergence).unwrap();
        assert!((value - expected).abs() < EPSILON);
        assert!(value > 0.0);
    }

    #[test]
    fn test_error_is_symmetric() {
        let p = array![0.1, 0.2, 0.7];
        let q = array![0.3, 0.3, 0.4];
        let pq = compute_error(&p, &q).unwrap();
        let qp = compute_error(&q, &p).unwrap();
        assert!((pq - qp).abs() < EPSILON);
        assert!((pq - (0.04 + 0.01 + 0.09)).abs() < EPSILON);
    }

    #[test]
    fn test_dimension_mismatch() {
        let p = array![0.5, 0.5];
        let q = array![1.0];
        assert!(matches!(
            compute_error(&p, &q),
            Err(GrnError::DimensionMismatch {
                expected: 1,
                found: 2
            })
        ));
    }

    #[test]
    fn test_laplace_smooth() {
        let p = array![0.0, 0.25, 0.75, 0.0];
        let (smoothed, total) = laplace_smooth(&p, 100);

        assert!((total - 104.0).abs() < EPSILON);
        assert!((smoothed.sum() - 1.0).abs() < EPSILON);
        assert!(smoothed.iter().all(|&v| v > 0.0));
        assert!((smoothed[0] - 1.0 / 104.0).abs() < EPSILON);
        assert!((smoothed[2] - 76.0 / 104.0).abs() < EPSILON);
    }

    #[test]
    fn test_laplace_smooth_preserves_order() {
        let p = array![0.05, 0.4, 0.15, 0.3, 0.1];
        let (smoothed, _) = laplace_smooth(&p, 37);
        for i in 0..p.len() {
            for j in 0..p.len() {
                if p[i] < p[j] {
                    assert!(smoothed[i] < smoothed[j]);
                }
            }
        }
    }
}
