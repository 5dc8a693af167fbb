//! # QGRN-Train: Fitting QuantumGRN Circuits
//!
//! Gradient-descent optimisation of QuantumGRN circuit parameters against an
//! observed expression distribution.
//!
//! ## Modules
//!
//! - [`loss`]: KL divergence / squared-difference loss, Laplace smoothing
//! - [`gradient`]: analytic gradient assembly from circuit derivatives
//! - [`model`]: the training loop
//! - [`trajectory`]: per-epoch theta capture and CSV export
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use qgrn_core::{all_edges, ParameterSet, QuantumGrnCircuit};
//! use qgrn_train::{Model, TrainingConfig};
//!
//! let genes: Vec<String> = ["a", "b", "c"].iter().map(|g| g.to_string()).collect();
//! let circuit = QuantumGrnCircuit::new(genes.clone(), all_edges(3), true)?;
//! let theta = ParameterSet::new(genes).with_encoder(std::f64::consts::FRAC_PI_2);
//!
//! let config = TrainingConfig::new(500).with_epochs(200).with_save_theta(true);
//! let mut model = Model::new(circuit, theta, p_obs, config)?;
//! let report = model.train()?;
//! model.export_training_theta("theta.csv", 10)?;
//! ```

pub mod config;
pub mod gradient;
pub mod loss;
pub mod model;
pub mod observer;
pub mod problem;
pub mod progress;
pub mod trajectory;

pub use config::TrainingConfig;
pub use gradient::{GradientAssembler, GradientVector, SmoothedDistributions};
pub use loss::{compute_error, laplace_smooth, loss, LossMethod};
pub use model::{Model, TrainingReport};
pub use observer::{SilentObserver, TracingObserver, TrainingObserver, TrainingState};
pub use problem::{ProblemFile, ThetaEntry};
pub use progress::{NoProgress, Progress, ProgressBarReporter};
pub use trajectory::{Trajectory, TrajectoryRecorder, DEFAULT_SAMPLE};
