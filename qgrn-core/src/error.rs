//! Error types for QuantumGRN modelling
//!
//! Provides error handling for:
//! - Configuration errors (unsupported loss method, invalid settings)
//! - Precondition violations (gradient initialised twice, missing derivatives)
//! - Data errors (dimension mismatches, non-binary expression values)
//! - I/O and serialization errors

use thiserror::Error;

/// Result type alias for QuantumGRN operations
pub type Result<T> = std::result::Result<T, GrnError>;

/// Error type for QuantumGRN circuit and optimizer operations
#[derive(Error, Debug)]
pub enum GrnError {
    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Loss method name not recognised
    #[error("The {0} method is not supported in the QuantumGRN modelling")]
    UnsupportedMethod(String),

    /// Invalid training configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Export sampling period of zero
    #[error("Sampling period must be at least 1, got {0}")]
    InvalidStride(usize),

    // ==========================================================================
    // Precondition Violations
    // ==========================================================================
    /// Gradient vector created twice
    #[error("The quantum circuit for GRN model has gradients initialized")]
    GradientAlreadyInitialized,

    /// Derivatives not computed for the current parameters
    #[error("Derivatives of the quantum circuit are empty; call compute_derivatives first")]
    EmptyDerivatives,

    /// Circuit not generated yet
    #[error("The quantum circuit is empty; call generate_circuit first")]
    EmptyCircuit,

    /// Trajectory export without capture
    #[error("Theta values were not saved during training (save_theta is {save_theta})")]
    NotCaptured { save_theta: bool },

    // ==========================================================================
    // Data Errors
    // ==========================================================================
    /// Vector or matrix with the wrong size
    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// Gene name not in the gene list
    #[error("Gene '{0}' not found")]
    UnknownGene(String),

    /// Edge that cannot be placed in the regulation layer
    #[error("Invalid edge {control}-{target}: {reason}")]
    InvalidEdge {
        control: String,
        target: String,
        reason: String,
    },

    /// Expression matrix entry other than 0 or 1
    #[error("Expression values must be binary, found {0}")]
    InvalidExpression(u8),

    /// All output probability sits on the dropped all-zero state
    #[error("Output state has no probability outside the all-zero state")]
    DegenerateOutput,

    /// Observed distribution that is not a probability vector
    #[error("Invalid distribution: {0}")]
    InvalidDistribution(String),

    /// No cells left to build a distribution from
    #[error("Cannot build a distribution from zero cells")]
    EmptyDistribution,

    // ==========================================================================
    // Other Errors
    // ==========================================================================
    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
