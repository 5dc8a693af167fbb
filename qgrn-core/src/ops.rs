use crate::state::GrnState;
use ndarray::Array2;
use num_complex::Complex64;

/// Applies a single-qubit gate to one gene qubit.
///
/// Basis states are visited in pairs (i, i | bit) where bit is the
/// target qubit; each pair is multiplied by the 2x2 matrix.
pub fn apply_gate(state: &mut GrnState, qubit_idx: usize, gate: &Array2<Complex64>) {
    let bit = 1 << qubit_idx;
    let (u00, u01, u10, u11) = (gate[[0, 0]], gate[[0, 1]], gate[[1, 0]], gate[[1, 1]]);

    for i in (0..state.dimension()).filter(|i| i & bit == 0) {
        let alpha = state.state_vector[i];
        let beta = state.state_vector[i | bit];

        state.state_vector[i] = u00 * alpha + u01 * beta;
        state.state_vector[i | bit] = u10 * alpha + u11 * beta;
    }
}

/// Applies a controlled single-qubit gate.
///
/// The gate acts on `target` only where `control` is |1>; amplitudes with
/// the control in |0> are left unchanged.
pub fn apply_controlled_gate(
    state: &mut GrnState,
    control: usize,
    target: usize,
    gate: &Array2<Complex64>,
) {
    apply_controlled(state, control, target, gate, Complex64::new(1.0, 0.0));
}

/// Applies only the control-|1> block of a controlled gate.
///
/// Amplitudes with the control in |0> are set to zero. This is the
/// derivative of a controlled rotation when `gate` is the derivative of the
/// rotation matrix.
pub fn apply_projected_controlled_gate(
    state: &mut GrnState,
    control: usize,
    target: usize,
    gate: &Array2<Complex64>,
) {
    apply_controlled(state, control, target, gate, Complex64::new(0.0, 0.0));
}

fn apply_controlled(
    state: &mut GrnState,
    control: usize,
    target: usize,
    gate: &Array2<Complex64>,
    idle_scale: Complex64,
) {
    debug_assert_ne!(control, target, "control and target must differ");

    let control_bit = 1 << control;
    let target_bit = 1 << target;
    let (u00, u01, u10, u11) = (gate[[0, 0]], gate[[0, 1]], gate[[1, 0]], gate[[1, 1]]);

    for i in (0..state.dimension()).filter(|i| i & target_bit == 0) {
        let j = i | target_bit;
        if i & control_bit == 0 {
            state.state_vector[i] *= idle_scale;
            state.state_vector[j] *= idle_scale;
            continue;
        }

        let alpha = state.state_vector[i];
        let beta = state.state_vector[j];

        state.state_vector[i] = u00 * alpha + u01 * beta;
        state.state_vector[j] = u10 * alpha + u11 * beta;
    }
}
