//! Training configuration
//!
//! Serialised as JSON. Every field has a default, so `{"ncells": 500}` is a
//! complete configuration.

use qgrn_core::{GrnError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::loss::LossMethod;

/// Default iteration budget
pub const DEFAULT_EPOCHS: usize = 1000;

/// Default gradient-descent step size
pub const DEFAULT_LEARNING_RATE: f64 = 1.0;

/// Per-state loss threshold; the default threshold is this times 2^G
pub const DEFAULT_THRESHOLD_PER_STATE: f64 = 1e-6;

/// Optimizer configuration for a QuantumGRN model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of cells behind the observed distribution (smoothing count)
    pub ncells: usize,
    /// Iteration budget
    pub epochs: usize,
    /// Gradient-descent step size
    pub learning_rate: f64,
    /// Loss function
    pub method: LossMethod,
    /// Train the encoder (self-loop) parameters as well as the edges
    pub train_encoder: bool,
    /// Stop once the loss drops below this; `None` = 1e-6 · 2^G
    pub loss_threshold: Option<f64>,
    /// Record theta at every epoch for export
    pub save_theta: bool,
    /// Drop the all-zero expression state from the output distribution
    pub drop_zero: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            ncells: 1,
            epochs: DEFAULT_EPOCHS,
            learning_rate: DEFAULT_LEARNING_RATE,
            method: LossMethod::KlDivergence,
            train_encoder: false,
            loss_threshold: None,
            save_theta: false,
            drop_zero: true,
        }
    }
}

impl TrainingConfig {
    pub fn new(ncells: usize) -> Self {
        Self {
            ncells,
            ..Default::default()
        }
    }

    /// Builder: set iteration budget
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Builder: set learning rate
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Builder: set loss method
    pub fn with_method(mut self, method: LossMethod) -> Self {
        self.method = method;
        self
    }

    /// Builder: train encoder parameters
    pub fn with_train_encoder(mut self, train_encoder: bool) -> Self {
        self.train_encoder = train_encoder;
        self
    }

    /// Builder: explicit loss threshold
    pub fn with_loss_threshold(mut self, threshold: f64) -> Self {
        self.loss_threshold = Some(threshold);
        self
    }

    /// Builder: enable trajectory capture
    pub fn with_save_theta(mut self, save_theta: bool) -> Self {
        self.save_theta = save_theta;
        self
    }

    /// Builder: keep or drop the all-zero state
    pub fn with_drop_zero(mut self, drop_zero: bool) -> Self {
        self.drop_zero = drop_zero;
        self
    }

    /// Threshold in effect for a network of `ngenes` genes
    pub fn effective_threshold(&self, ngenes: usize) -> f64 {
        self.loss_threshold
            .unwrap_or(DEFAULT_THRESHOLD_PER_STATE * 2f64.powi(ngenes as i32))
    }

    pub fn validate(&self) -> Result<()> {
        if self.ncells == 0 {
            return Err(GrnError::InvalidConfig("ncells must be positive".into()));
        }
        if self.epochs == 0 {
            return Err(GrnError::InvalidConfig("epochs must be positive".into()));
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(GrnError::InvalidConfig(format!(
                "learning_rate must be finite and positive, got {}",
                self.learning_rate
            )));
        }
        if let Some(threshold) = self.loss_threshold {
            if threshold.is_nan() || threshold < 0.0 {
                return Err(GrnError::InvalidConfig(format!(
                    "loss_threshold must be non-negative, got {threshold}"
                )));
            }
        }
        Ok(())
    }

    /// Load and validate a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }
}
