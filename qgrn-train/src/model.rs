//! QuantumGRN model: gradient-descent fitting of circuit parameters
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          Model                                   │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  State                                                          │
//! │    ├── theta: circuit parameters (control × target)             │
//! │    ├── gradient: created once, overwritten every epoch          │
//! │    └── loss / error histories                                   │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  Epoch                                                          │
//! │    ├── circuit.compute_derivatives()                            │
//! │    ├── compute_gradient() on Laplace-smoothed distributions     │
//! │    ├── loss (smoothed) / error (unsmoothed)                     │
//! │    ├── stop: loss < threshold │ last epoch                      │
//! │    └── theta -= lr * gradient; circuit.generate_circuit()       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use ndarray::Array1;
use qgrn_core::{validate_distribution, EdgeKey, GrnCircuit, GrnError, ParameterSet, Result};
use std::fmt;
use std::path::Path;

use crate::config::TrainingConfig;
use crate::gradient::{trainable_keys, GradientAssembler, GradientVector, SmoothedDistributions};
use crate::loss::{compute_error, loss};
use crate::observer::{TracingObserver, TrainingObserver, TrainingState};
use crate::progress::{Progress, ProgressBarReporter};
use crate::trajectory::{Trajectory, TrajectoryRecorder};

// =============================================================================
// Training Report
// =============================================================================

/// Outcome of a training run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    /// Converged or Exhausted
    pub state: TrainingState,
    /// Number of epochs evaluated
    pub epochs_completed: usize,
    /// Number of parameter updates applied
    pub parameter_updates: usize,
    /// Loss of the last epoch
    pub final_loss: f64,
    /// Error of the last epoch
    pub final_error: f64,
}

impl TrainingReport {
    pub fn converged(&self) -> bool {
        self.state == TrainingState::Converged
    }
}

// =============================================================================
// Model
// =============================================================================

/// Fits the parameters of a [`GrnCircuit`] to an observed distribution
pub struct Model<C: GrnCircuit> {
    circuit: C,
    theta: ParameterSet,
    config: TrainingConfig,
    p_obs: Array1<f64>,
    p_out: Option<Array1<f64>>,
    loss_threshold: f64,
    trainable: Vec<EdgeKey>,
    gradient: Option<GradientVector>,
    loss: Vec<f64>,
    error: Vec<f64>,
    state: TrainingState,
    trajectory: Option<Trajectory>,
    observer: Box<dyn TrainingObserver>,
}

impl<C: GrnCircuit> Model<C> {
    /// Build a model and generate its circuit for the initial `theta`.
    ///
    /// `p_obs` must be a probability vector over all 2^G states of the circuit.
    /// Lifecycle events go to a [`TracingObserver`].
    pub fn new(
        circuit: C,
        theta: ParameterSet,
        p_obs: Array1<f64>,
        config: TrainingConfig,
    ) -> Result<Self> {
        Self::new_with_observer(circuit, theta, p_obs, config, Box::new(TracingObserver))
    }

    /// [`Model::new`] reporting lifecycle events to `observer`
    pub fn new_with_observer(
        mut circuit: C,
        theta: ParameterSet,
        p_obs: Array1<f64>,
        config: TrainingConfig,
        observer: Box<dyn TrainingObserver>,
    ) -> Result<Self> {
        config.validate()?;

        if theta.genes() != circuit.genes() {
            return Err(GrnError::InvalidConfig(
                "theta and circuit must be defined over the same genes".into(),
            ));
        }
        if config.drop_zero != circuit.drop_zero() {
            return Err(GrnError::InvalidConfig(format!(
                "drop_zero is {} in the configuration but {} in the circuit",
                config.drop_zero,
                circuit.drop_zero()
            )));
        }
        if p_obs.len() != circuit.dimension() {
            return Err(GrnError::DimensionMismatch {
                expected: circuit.dimension(),
                found: p_obs.len(),
            });
        }
        validate_distribution(&p_obs)?;

        circuit.generate_circuit(&theta)?;

        let ngenes = circuit.ngenes();
        let trainable = trainable_keys(ngenes, circuit.edges(), config.train_encoder);
        let loss_threshold = config.effective_threshold(ngenes);

        let mut model = Model {
            circuit,
            theta,
            p_obs,
            p_out: None,
            loss_threshold,
            trainable,
            gradient: None,
            loss: Vec::with_capacity(config.epochs),
            error: Vec::with_capacity(config.epochs),
            state: TrainingState::Running,
            trajectory: None,
            observer,
            config,
        };
        model.create_gradient()?;

        let (ngenes, ncells) = (model.ngenes(), model.config.ncells);
        model.observer.on_init(ngenes, ncells);
        Ok(model)
    }

    /// Builder: replace the lifecycle observer
    pub fn with_observer(mut self, observer: Box<dyn TrainingObserver>) -> Self {
        self.observer = observer;
        self
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn ngenes(&self) -> usize {
        self.circuit.ngenes()
    }

    pub fn circuit(&self) -> &C {
        &self.circuit
    }

    pub fn theta(&self) -> &ParameterSet {
        &self.theta
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn p_obs(&self) -> &Array1<f64> {
        &self.p_obs
    }

    /// Output distribution of the last gradient evaluation
    pub fn p_out(&self) -> Option<&Array1<f64>> {
        self.p_out.as_ref()
    }

    pub fn loss_threshold(&self) -> f64 {
        self.loss_threshold
    }

    /// Keys that receive gradient updates
    pub fn trainable_keys(&self) -> &[EdgeKey] {
        &self.trainable
    }

    pub fn gradient(&self) -> Option<&GradientVector> {
        self.gradient.as_ref()
    }

    pub fn loss_history(&self) -> &[f64] {
        &self.loss
    }

    pub fn error_history(&self) -> &[f64] {
        &self.error
    }

    pub fn state(&self) -> TrainingState {
        self.state
    }

    /// Captured theta values, if `save_theta` was enabled
    pub fn trajectory(&self) -> Option<&Trajectory> {
        self.trajectory.as_ref()
    }

    // -------------------------------------------------------------------------
    // Gradient
    // -------------------------------------------------------------------------

    /// Create the gradient vector over every (control, target) key.
    ///
    /// The circuit must be generated, and the gradient may only be created once.
    pub fn create_gradient(&mut self) -> Result<()> {
        let rejected = if !self.circuit.is_generated() {
            Some(GrnError::EmptyCircuit)
        } else if self.gradient.is_some() {
            Some(GrnError::GradientAlreadyInitialized)
        } else {
            None
        };
        if let Some(err) = rejected {
            self.observer.on_rejected(&err);
            return Err(err);
        }
        self.gradient = Some(GradientVector::new(self.ngenes()));
        Ok(())
    }

    /// Gradient of the loss for the current parameters.
    ///
    /// Requires `compute_derivatives` on the circuit for the current theta.
    /// Stores the output distribution and returns the smoothed distributions.
    pub fn compute_gradient(&mut self) -> Result<SmoothedDistributions> {
        let derivatives = self
            .circuit
            .derivatives()
            .filter(|d| !d.is_empty())
            .ok_or(GrnError::EmptyDerivatives)?;
        let p_out = self.circuit.output_probabilities(self.circuit.drop_zero())?;
        let state = self.circuit.output_state()?;

        let gradient = self.gradient.as_mut().ok_or_else(missing_gradient)?;

        let smoothed = GradientAssembler {
            method: self.config.method,
            ncells: self.config.ncells,
            p_obs: &self.p_obs,
            p_out: &p_out,
            state: &state,
            derivatives: Some(derivatives),
        }
        .assemble(&self.trainable, gradient)?;

        self.p_out = Some(p_out);
        Ok(smoothed)
    }

    // -------------------------------------------------------------------------
    // Training
    // -------------------------------------------------------------------------

    /// Run gradient descent with a terminal progress bar
    pub fn train(&mut self) -> Result<TrainingReport> {
        let mut progress = ProgressBarReporter::new(self.config.epochs);
        self.train_with_progress(&mut progress)
    }

    /// Run gradient descent, reporting each epoch to `progress`.
    ///
    /// Stops when the loss drops below the threshold (Converged) or after
    /// the last epoch of the budget (Exhausted). Parameters are never
    /// updated after the stopping epoch.
    pub fn train_with_progress(&mut self, progress: &mut dyn Progress) -> Result<TrainingReport> {
        let epochs = self.config.epochs;
        let (ngenes, ncells) = (self.ngenes(), self.config.ncells);
        self.observer.on_start(ngenes, ncells, epochs);

        self.loss.clear();
        self.error.clear();
        self.trajectory = None;
        self.state = TrainingState::Running;
        let mut recorder = self
            .config
            .save_theta
            .then(|| TrajectoryRecorder::with_capacity(epochs));

        let mut epoch = 0;
        let mut updates = 0;
        let outcome = loop {
            let (loss, error) = match self.run_epoch() {
                Ok(values) => values,
                Err(err) => break Err((epoch, err)),
            };
            self.loss.push(loss);
            self.error.push(error);
            progress.update(epoch + 1);
            self.observer.on_epoch(epoch, loss, error);

            if let Some(recorder) = recorder.as_mut() {
                recorder.record(&self.theta);
            }

            if loss < self.loss_threshold {
                break Ok(TrainingState::Converged);
            }
            if epoch + 1 == epochs {
                break Ok(TrainingState::Exhausted);
            }

            if let Err(err) = self.update_parameters() {
                break Err((epoch, err));
            }
            updates += 1;
            epoch += 1;
        };
        progress.finish();

        if let Some(recorder) = recorder {
            self.trajectory = Some(recorder.finish(&self.theta));
        }
        self.loss.shrink_to_fit();
        self.error.shrink_to_fit();

        let state = match outcome {
            Ok(state) => state,
            Err((epoch, err)) => {
                self.observer.on_failure(epoch, &err);
                return Err(err);
            }
        };
        self.state = state;

        let report = TrainingReport {
            state,
            epochs_completed: self.loss.len(),
            parameter_updates: updates,
            final_loss: self.loss.last().copied().unwrap_or(f64::NAN),
            final_error: self.error.last().copied().unwrap_or(f64::NAN),
        };
        self.observer
            .on_stop(state, report.epochs_completed, report.final_loss);
        Ok(report)
    }

    /// Derivatives, gradient, loss and error for the current parameters
    fn run_epoch(&mut self) -> Result<(f64, f64)> {
        self.circuit.compute_derivatives()?;
        let smoothed = self.compute_gradient()?;

        let loss = loss(&smoothed.h_p_out, &smoothed.h_p_obs, self.config.method)?;
        let p_out = self.p_out.as_ref().ok_or(GrnError::EmptyDerivatives)?;
        let error = compute_error(p_out, &self.p_obs)?;
        Ok((loss, error))
    }

    /// θ ← θ − lr · gradient, then rebuild the circuit
    fn update_parameters(&mut self) -> Result<()> {
        let gradient = self.gradient.as_ref().ok_or_else(missing_gradient)?;
        self.theta
            .descend(gradient.values(), self.config.learning_rate)?;
        self.circuit.generate_circuit(&self.theta)
    }

    // -------------------------------------------------------------------------
    // Export
    // -------------------------------------------------------------------------

    /// Write every `sample`-th captured theta snapshot to `path`.
    ///
    /// Fails with `NotCaptured` unless `save_theta` was enabled for training.
    pub fn export_training_theta(&mut self, path: impl AsRef<Path>, sample: usize) -> Result<usize> {
        let path = path.as_ref();
        let trajectory = match (&self.trajectory, self.config.save_theta) {
            (Some(trajectory), true) => trajectory,
            (_, save_theta) => {
                let err = GrnError::NotCaptured { save_theta };
                self.observer.on_rejected(&err);
                return Err(err);
            }
        };

        let rows = trajectory.export(path, sample)?;
        self.observer.on_export(&path.display().to_string(), rows);
        Ok(rows)
    }
}

fn missing_gradient() -> GrnError {
    GrnError::InvalidConfig("gradient vector has not been created".into())
}

impl<C: GrnCircuit> fmt::Display for Model<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "QuantumGRN for {} genes with a sample of {}",
            self.ngenes(),
            self.config.ncells
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
