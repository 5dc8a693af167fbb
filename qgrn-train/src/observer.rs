//! Training lifecycle observers
//!
//! The training loop reports through a [`TrainingObserver`] instead of
//! logging inline; [`TracingObserver`] forwards events to `tracing`.

use qgrn_core::GrnError;

/// State of the training loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrainingState {
    /// Not stopped yet
    #[default]
    Running,
    /// Loss dropped below the threshold
    Converged,
    /// Epoch budget used up
    Exhausted,
}

impl TrainingState {
    pub fn message(&self) -> &'static str {
        match self {
            TrainingState::Running => "Optimization in progress",
            TrainingState::Converged => "Due to threshold reached",
            TrainingState::Exhausted => "Due to the number of epochs reached",
        }
    }
}

/// Hooks invoked at defined points of the training loop. All default to no-ops.
pub trait TrainingObserver {
    fn on_init(&mut self, _ngenes: usize, _ncells: usize) {}

    fn on_start(&mut self, _ngenes: usize, _ncells: usize, _epochs: usize) {}

    fn on_epoch(&mut self, _epoch: usize, _loss: f64, _error: f64) {}

    fn on_stop(&mut self, _state: TrainingState, _epochs_completed: usize, _loss: f64) {}

    fn on_failure(&mut self, _epoch: usize, _error: &GrnError) {}

    fn on_export(&mut self, _destination: &str, _rows: usize) {}

    /// A model operation refused because its precondition does not hold
    fn on_rejected(&mut self, _error: &GrnError) {}
}

/// Observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentObserver;

impl TrainingObserver for SilentObserver {}

/// Observer that emits `tracing` events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl TrainingObserver for TracingObserver {
    fn on_init(&mut self, ngenes: usize, ncells: usize) {
        tracing::info!(
            genes = ngenes,
            cells = ncells,
            "The QuantumGRN model is been initialized"
        );
    }

    fn on_start(&mut self, ngenes: usize, ncells: usize, epochs: usize) {
        tracing::info!(
            genes = ngenes,
            cells = ncells,
            epochs,
            "Starting the optimization for the QuantumGRN"
        );
    }

    fn on_epoch(&mut self, epoch: usize, loss: f64, error: f64) {
        tracing::debug!(epoch, loss, error, "Epoch completed");
    }

    fn on_stop(&mut self, state: TrainingState, epochs_completed: usize, loss: f64) {
        tracing::info!(
            epochs = epochs_completed,
            loss = format!("{loss:.6e}"),
            "Optimization completed!!.. {}",
            state.message()
        );
    }

    fn on_failure(&mut self, epoch: usize, error: &GrnError) {
        tracing::error!(epoch, %error, "Optimization failed");
    }

    fn on_export(&mut self, destination: &str, rows: usize) {
        tracing::info!(
            rows,
            "Theta values during optimization are exported to {destination}"
        );
    }

    fn on_rejected(&mut self, error: &GrnError) {
        tracing::error!("{error}");
    }
}
