//! Observed distributions from binarised single-cell expression

use ndarray::{Array1, ArrayView2};

use crate::error::{GrnError, Result};

/// Allowed deviation of a distribution's total from 1
pub const DISTRIBUTION_TOLERANCE: f64 = 1e-6;

/// Basis index of one cell's expression pattern: Σ_g bit_g · 2^g
fn pattern_index(expression: impl Iterator<Item = u8>) -> Result<usize> {
    let mut index = 0;
    for (gene, value) in expression.enumerate() {
        match value {
            0 => {}
            1 => index |= 1 << gene,
            other => return Err(GrnError::InvalidExpression(other)),
        }
    }
    Ok(index)
}

/// Build the observed distribution `p_obs` from a cells × genes 0/1 matrix.
///
/// With `drop_zero`, cells expressing no gene are left out before
/// normalising, matching a circuit that drops the all-zero state.
pub fn observed_distribution(cells: ArrayView2<'_, u8>, drop_zero: bool) -> Result<Array1<f64>> {
    let ngenes = cells.ncols();
    let mut counts = Array1::<f64>::zeros(1 << ngenes);

    for row in cells.rows() {
        let index = pattern_index(row.iter().copied())?;
        counts[index] += 1.0;
    }
    if drop_zero {
        counts[0] = 0.0;
    }

    let total = counts.sum();
    if total == 0.0 {
        return Err(GrnError::EmptyDistribution);
    }
    Ok(counts / total)
}

/// Check that `p` is a probability vector: finite, non-negative, summing to 1
pub fn validate_distribution(p: &Array1<f64>) -> Result<()> {
    if let Some((i, v)) = p.iter().enumerate().find(|(_, v)| !v.is_finite() || **v < 0.0) {
        return Err(GrnError::InvalidDistribution(format!(
            "entry {i} is negative or not finite ({v})"
        )));
    }
    let total = p.sum();
    if (total - 1.0).abs() > DISTRIBUTION_TOLERANCE {
        return Err(GrnError::InvalidDistribution(format!(
            "entries sum to {total}, expected 1"
        )));
    }
    Ok(())
}

/// Number of cells that contribute to [`observed_distribution`]
pub fn counted_cells(cells: ArrayView2<'_, u8>, drop_zero: bool) -> usize {
    if !drop_zero {
        return cells.nrows();
    }
    cells
        .rows()
        .into_iter()
        .filter(|row| row.iter().any(|&v| v != 0))
        .count()
}
