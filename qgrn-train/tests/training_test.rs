use ndarray::Array1;
use num_complex::Complex64;
use qgrn_core::{
    all_edges, DerivativeTable, EdgeKey, GrnCircuit, GrnError, GrnState, ParameterSet,
    QuantumGrnCircuit, Result,
};
use qgrn_train::{
    laplace_smooth, loss, GradientAssembler, GradientVector, LossMethod, Model, NoProgress,
    SilentObserver, TrainingConfig, TrainingState,
};
use std::f64::consts::FRAC_PI_2;

fn genes(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("g{i}")).collect()
}

fn theta(n: usize) -> ParameterSet {
    let mut theta = ParameterSet::new(genes(n)).with_encoder(FRAC_PI_2);
    for (i, edge) in all_edges(n).into_iter().enumerate() {
        theta.set(edge, 0.2 + 0.15 * i as f64);
    }
    theta
}

fn skewed_p_obs() -> Array1<f64> {
    Array1::from(vec![0.0, 0.6, 0.1, 0.3])
}

fn model(config: TrainingConfig, p_obs: Array1<f64>) -> Model<QuantumGrnCircuit> {
    let n = p_obs.len().trailing_zeros() as usize;
    let circuit = QuantumGrnCircuit::new(genes(n), all_edges(n), config.drop_zero).unwrap();
    Model::new(circuit, theta(n), p_obs, config)
        .unwrap()
        .with_observer(Box::new(SilentObserver))
}

// =============================================================================
// Stopping
// =============================================================================

#[test]
fn test_single_epoch_never_updates() {
    let mut m = model(TrainingConfig::new(100).with_epochs(1), skewed_p_obs());
    let before = m.theta().clone();

    let report = m.train_with_progress(&mut NoProgress).unwrap();

    assert_eq!(report.state, TrainingState::Exhausted);
    assert_eq!(report.epochs_completed, 1);
    assert_eq!(report.parameter_updates, 0);
    assert_eq!(m.loss_history().len(), 1);
    assert_eq!(m.error_history().len(), 1);
    assert_eq!(m.theta(), &before);
}

#[test]
fn test_exhausted_fills_histories() {
    let mut m = model(TrainingConfig::new(100).with_epochs(6), skewed_p_obs());
    let report = m.train_with_progress(&mut NoProgress).unwrap();

    assert_eq!(report.state, TrainingState::Exhausted);
    assert_eq!(m.state(), TrainingState::Exhausted);
    assert_eq!(report.parameter_updates, 5);
    assert_eq!(m.loss_history().len(), 6);
    assert_eq!(m.error_history().len(), 6);
    assert_eq!(report.final_loss, m.loss_history()[5]);
}

#[test]
fn test_converged_stops_early() {
    let config = TrainingConfig::new(100)
        .with_epochs(50)
        .with_loss_threshold(10.0);
    let mut m = model(config, skewed_p_obs());
    let before = m.theta().clone();

    let report = m.train_with_progress(&mut NoProgress).unwrap();

    assert!(report.converged());
    assert_eq!(report.epochs_completed, 1);
    assert_eq!(m.loss_history().len(), 1);
    assert!(m.loss_history()[0] < 10.0);
    assert_eq!(m.theta(), &before);
}

#[test]
fn test_converged_after_several_epochs() {
    let reference_config = TrainingConfig::new(500)
        .with_epochs(40)
        .with_learning_rate(0.2)
        .with_train_encoder(true);
    let mut reference = model(reference_config.clone(), skewed_p_obs());
    reference.train_with_progress(&mut NoProgress).unwrap();
    let losses = reference.loss_history().to_vec();

    // first epoch beating every earlier loss; a threshold between the two stops there
    let (j, best_before) = (1..losses.len())
        .find_map(|j| {
            let best = losses[..j].iter().cloned().fold(f64::INFINITY, f64::min);
            (losses[j] < best).then_some((j, best))
        })
        .unwrap();
    let threshold = (losses[j] + best_before) / 2.0;
    let k = j + 1;

    let config = reference_config
        .with_epochs(60)
        .with_loss_threshold(threshold)
        .with_save_theta(true);
    let mut m = model(config, skewed_p_obs());
    let report = m.train_with_progress(&mut NoProgress).unwrap();

    assert_eq!(report.state, TrainingState::Converged);
    assert!(k > 1);
    assert_eq!(report.epochs_completed, k);
    assert_eq!(report.parameter_updates, k - 1);
    assert_eq!(m.loss_history().len(), k);
    assert_eq!(m.error_history().len(), k);
    assert_eq!(m.loss_history(), &losses[..k]);
    assert_eq!(m.error_history(), &reference.error_history()[..k]);

    // the snapshot of the converging epoch is the final theta
    let trajectory = m.trajectory().unwrap();
    assert_eq!(trajectory.epochs(), k);
    assert_eq!(trajectory.table().row(k - 1), m.theta().values().view());
}

#[test]
fn test_retraining_resets_histories() {
    let mut m = model(TrainingConfig::new(100).with_epochs(4), skewed_p_obs());
    m.train_with_progress(&mut NoProgress).unwrap();
    m.train_with_progress(&mut NoProgress).unwrap();
    assert_eq!(m.loss_history().len(), 4);
}

// =============================================================================
// Optimisation
// =============================================================================

#[test]
fn test_kl_training_reduces_loss() {
    let config = TrainingConfig::new(500)
        .with_epochs(40)
        .with_learning_rate(0.2)
        .with_train_encoder(true);
    let mut m = model(config, skewed_p_obs());
    m.train_with_progress(&mut NoProgress).unwrap();

    let history = m.loss_history();
    assert!(history.last().unwrap() < history.first().unwrap());
    assert!(history.iter().all(|l| l.is_finite() && *l >= -1e-12));
}

#[test]
fn test_difference_three_gene_example() {
    let config = TrainingConfig::new(100)
        .with_epochs(5)
        .with_learning_rate(0.1)
        .with_method(LossMethod::Difference)
        .with_drop_zero(false);
    let mut m = model(config, Array1::from_elem(8, 0.125));
    let report = m.train_with_progress(&mut NoProgress).unwrap();

    assert!(report.epochs_completed <= 5);
    assert!(report.final_error.is_finite());
    assert!(report.final_error >= 0.0);
    assert!(m.error_history().iter().all(|e| *e >= 0.0));
}

#[test]
fn test_output_distribution_is_recorded() {
    let mut m = model(TrainingConfig::new(100).with_epochs(2), skewed_p_obs());
    assert!(m.p_out().is_none());
    m.train_with_progress(&mut NoProgress).unwrap();

    let p_out = m.p_out().unwrap();
    assert_eq!(p_out.len(), 4);
    assert_eq!(p_out[0], 0.0);
    assert!((p_out.sum() - 1.0).abs() < 1e-10);
}

// =============================================================================
// Gradient
// =============================================================================

/// Smoothed loss of the circuit at `theta`
fn smoothed_loss(
    circuit: &mut QuantumGrnCircuit,
    theta: &ParameterSet,
    p_obs: &Array1<f64>,
    ncells: usize,
    method: LossMethod,
) -> f64 {
    circuit.generate_circuit(theta).unwrap();
    let p_out = circuit.output_probabilities(circuit.drop_zero()).unwrap();
    let (h_out, _) = laplace_smooth(&p_out, ncells);
    let (h_obs, _) = laplace_smooth(p_obs, ncells);
    loss(&h_out, &h_obs, method).unwrap()
}

fn check_gradient(method: LossMethod, drop_zero: bool, p_obs: Array1<f64>) {
    let n = 3;
    let ncells = 200;
    let base = theta(n);
    let mut circuit = QuantumGrnCircuit::new(genes(n), all_edges(n), drop_zero).unwrap();

    circuit.generate_circuit(&base).unwrap();
    circuit.compute_derivatives().unwrap();
    let p_out = circuit.output_probabilities(drop_zero).unwrap();
    let state = circuit.output_state().unwrap();

    let keys: Vec<EdgeKey> = base.keys().collect();
    let mut gradient = GradientVector::new(n);
    GradientAssembler {
        method,
        ncells,
        p_obs: &p_obs,
        p_out: &p_out,
        state: &state,
        derivatives: circuit.derivatives(),
    }
    .assemble(&keys, &mut gradient)
    .unwrap();

    let h = 1e-6;
    for key in keys {
        let mut plus = base.clone();
        plus.set(key, base.get(key) + h);
        let mut minus = base.clone();
        minus.set(key, base.get(key) - h);

        let numeric = (smoothed_loss(&mut circuit, &plus, &p_obs, ncells, method)
            - smoothed_loss(&mut circuit, &minus, &p_obs, ncells, method))
            / (2.0 * h);
        assert!(
            (gradient.get(key) - numeric).abs() < 1e-6,
            "{key:?}: analytic {} vs numeric {numeric}",
            gradient.get(key)
        );
    }
}

#[test]
fn test_kl_gradient_matches_finite_difference() {
    let p_obs = Array1::from(vec![0.0, 0.2, 0.05, 0.15, 0.1, 0.2, 0.1, 0.2]);
    check_gradient(LossMethod::KlDivergence, true, p_obs);
}

#[test]
fn test_difference_gradient_matches_finite_difference() {
    let p_obs = Array1::from(vec![0.05, 0.2, 0.05, 0.15, 0.1, 0.15, 0.1, 0.2]);
    check_gradient(LossMethod::Difference, false, p_obs);
}

#[test]
fn test_gradient_created_once() {
    let mut m = model(TrainingConfig::new(10), skewed_p_obs());
    assert!(matches!(
        m.create_gradient(),
        Err(GrnError::GradientAlreadyInitialized)
    ));
}

// =============================================================================
// Trajectory
// =============================================================================

#[test]
fn test_export_requires_capture() {
    let mut m = model(TrainingConfig::new(100).with_epochs(3), skewed_p_obs());
    m.train_with_progress(&mut NoProgress).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let result = m.export_training_theta(dir.path().join("theta.csv"), 1);
    assert!(matches!(
        result,
        Err(GrnError::NotCaptured { save_theta: false })
    ));
    assert!(!dir.path().join("theta.csv").exists());
}

#[test]
fn test_export_sampled_rows() {
    let config = TrainingConfig::new(100)
        .with_epochs(25)
        .with_learning_rate(0.05)
        .with_save_theta(true);
    let mut m = model(config, skewed_p_obs());
    m.train_with_progress(&mut NoProgress).unwrap();
    let epochs = m.loss_history().len();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("theta.csv");
    let rows = m.export_training_theta(&path, 10).unwrap();
    assert_eq!(rows, (epochs + 9) / 10);

    let text = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), rows + 1);
    assert_eq!(lines[0].split(',').count(), 4);
    assert!(lines[0].starts_with("g0-g0,g0-g1"));

    // first row is the initial theta
    let first: Vec<f64> = lines[1].split(',').map(|v| v.parse().unwrap()).collect();
    assert!((first[0] - FRAC_PI_2).abs() < 1e-15);
    assert!((first[1] - 0.2).abs() < 1e-15);

    assert!(matches!(
        m.export_training_theta(&path, 0),
        Err(GrnError::InvalidStride(0))
    ));
}

#[test]
fn test_trajectory_tracks_every_epoch() {
    let config = TrainingConfig::new(100).with_epochs(7).with_save_theta(true);
    let mut m = model(config, skewed_p_obs());
    m.train_with_progress(&mut NoProgress).unwrap();

    let trajectory = m.trajectory().unwrap();
    assert_eq!(trajectory.epochs(), m.loss_history().len());
    assert_eq!(trajectory.table().ncols(), 4);
}

// =============================================================================
// Custom circuits
// =============================================================================

/// Circuit whose output never depends on its parameters
struct FrozenCircuit {
    genes: Vec<String>,
    edges: Vec<EdgeKey>,
    generated: bool,
    derivatives: Option<DerivativeTable>,
}

impl FrozenCircuit {
    fn new() -> Self {
        FrozenCircuit {
            genes: genes(2),
            edges: vec![EdgeKey::new(0, 1)],
            generated: false,
            derivatives: None,
        }
    }
}

impl GrnCircuit for FrozenCircuit {
    fn genes(&self) -> &[String] {
        &self.genes
    }

    fn edges(&self) -> &[EdgeKey] {
        &self.edges
    }

    fn drop_zero(&self) -> bool {
        false
    }

    fn is_generated(&self) -> bool {
        self.generated
    }

    fn generate_circuit(&mut self, _theta: &ParameterSet) -> Result<()> {
        self.generated = true;
        self.derivatives = None;
        Ok(())
    }

    fn output_state(&self) -> Result<GrnState> {
        Ok(GrnState::from_amplitudes(
            2,
            Array1::from_elem(4, Complex64::new(0.5, 0.0)),
        ))
    }

    fn output_probabilities(&self, _drop_zero: bool) -> Result<Array1<f64>> {
        Ok(Array1::from_elem(4, 0.25))
    }

    fn compute_derivatives(&mut self) -> Result<()> {
        let mut table = DerivativeTable::new();
        for g in 0..2 {
            table.insert(EdgeKey::self_loop(g), Array1::zeros(4));
        }
        for &edge in &self.edges {
            table.insert(edge, Array1::zeros(4));
        }
        self.derivatives = Some(table);
        Ok(())
    }

    fn derivatives(&self) -> Option<&DerivativeTable> {
        self.derivatives.as_ref()
    }
}

#[test]
fn test_frozen_circuit_keeps_parameters() {
    let theta = ParameterSet::new(genes(2)).with_encoder(0.7);
    let config = TrainingConfig::new(40)
        .with_epochs(5)
        .with_drop_zero(false)
        .with_train_encoder(true);
    let p_obs = Array1::from(vec![0.1, 0.2, 0.3, 0.4]);

    let mut m = Model::new(FrozenCircuit::new(), theta.clone(), p_obs, config)
        .unwrap()
        .with_observer(Box::new(SilentObserver));
    let report = m.train_with_progress(&mut NoProgress).unwrap();

    assert_eq!(report.state, TrainingState::Exhausted);
    assert_eq!(report.parameter_updates, 4);
    assert_eq!(m.theta(), &theta);
    assert_eq!(m.gradient().unwrap().norm(), 0.0);

    let losses = m.loss_history();
    assert!(losses.iter().all(|l| (l - losses[0]).abs() < 1e-15));
}
