//! JSON problem files for the `qgrn-fit` driver
//!
//! ```json
//! {
//!   "genes": ["a", "b", "c"],
//!   "edges": [["a", "b"], ["b", "c"]],
//!   "theta": [{"control": "a", "target": "b", "value": 0.3}],
//!   "p_obs": [0.0, 0.2, 0.1, 0.1, 0.2, 0.1, 0.1, 0.2],
//!   "config": {"ncells": 400, "epochs": 500, "learning_rate": 0.5}
//! }
//! ```

use ndarray::{Array1, Array2};
use qgrn_core::{
    all_edges, counted_cells, observed_distribution, GrnCircuit, GrnError, ParameterSet,
    QuantumGrnCircuit, Result,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;
use std::path::Path;

use crate::config::TrainingConfig;
use crate::model::Model;

fn default_encoder() -> f64 {
    FRAC_PI_2
}

/// Explicit initial value of one parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThetaEntry {
    pub control: String,
    pub target: String,
    pub value: f64,
}

/// A QuantumGRN fitting problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemFile {
    /// Gene names, one qubit each
    pub genes: Vec<String>,
    /// Regulation edges as (control, target); omitted = every ordered pair
    #[serde(default)]
    pub edges: Option<Vec<(String, String)>>,
    /// Initial value of every encoder parameter
    #[serde(default = "default_encoder")]
    pub encoder: f64,
    /// Draw initial edge values uniformly from this range
    #[serde(default)]
    pub edge_range: Option<(f64, f64)>,
    /// Seed for `edge_range`
    #[serde(default)]
    pub seed: u64,
    /// Explicit initial values, applied last
    #[serde(default)]
    pub theta: Vec<ThetaEntry>,
    /// Observed distribution over the 2^G states
    #[serde(default)]
    pub p_obs: Option<Vec<f64>>,
    /// Binarised cells × genes expression matrix, instead of `p_obs`
    #[serde(default)]
    pub cells: Option<Vec<Vec<u8>>>,
    #[serde(default)]
    pub config: TrainingConfig,
}

impl ProblemFile {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Reference circuit over the declared edges
    pub fn circuit(&self) -> Result<QuantumGrnCircuit> {
        let drop_zero = self.config.drop_zero;
        match &self.edges {
            None => QuantumGrnCircuit::new(
                self.genes.clone(),
                all_edges(self.genes.len()),
                drop_zero,
            ),
            Some(edges) => {
                let names: Vec<(&str, &str)> = edges
                    .iter()
                    .map(|(c, t)| (c.as_str(), t.as_str()))
                    .collect();
                QuantumGrnCircuit::from_names(self.genes.clone(), &names, drop_zero)
            }
        }
    }

    /// Initial parameters: encoder value, optional random edges, then explicit entries
    pub fn initial_theta(&self, circuit: &QuantumGrnCircuit) -> Result<ParameterSet> {
        let mut theta = ParameterSet::new(self.genes.clone()).with_encoder(self.encoder);

        if let Some((low, high)) = self.edge_range {
            if low.is_nan() || high.is_nan() || low >= high {
                return Err(GrnError::InvalidConfig(format!(
                    "edge_range must be a non-empty interval, got [{low}, {high})"
                )));
            }
            let mut rng = StdRng::seed_from_u64(self.seed);
            theta = theta.with_random_edges(circuit.edges(), low, high, &mut rng);
        }

        for entry in &self.theta {
            let key = theta.key(&entry.control, &entry.target)?;
            theta.set(key, entry.value);
        }
        Ok(theta)
    }

    /// Observed distribution and the cell count behind it.
    ///
    /// A cells matrix overrides `config.ncells` with the number of counted cells.
    pub fn observed(&self) -> Result<(Array1<f64>, usize)> {
        let drop_zero = self.config.drop_zero;
        match (&self.p_obs, &self.cells) {
            (Some(p_obs), None) => Ok((Array1::from(p_obs.clone()), self.config.ncells)),
            (None, Some(cells)) => {
                let ngenes = self.genes.len();
                if let Some(row) = cells.iter().find(|row| row.len() != ngenes) {
                    return Err(GrnError::DimensionMismatch {
                        expected: ngenes,
                        found: row.len(),
                    });
                }
                let flat: Vec<u8> = cells.iter().flatten().copied().collect();
                let matrix = Array2::from_shape_vec((cells.len(), ngenes), flat)
                    .map_err(|e| GrnError::InvalidConfig(e.to_string()))?;

                let p_obs = observed_distribution(matrix.view(), drop_zero)?;
                Ok((p_obs, counted_cells(matrix.view(), drop_zero)))
            }
            _ => Err(GrnError::InvalidConfig(
                "exactly one of p_obs and cells must be given".into(),
            )),
        }
    }

    /// Build a ready-to-train model
    pub fn into_model(self) -> Result<Model<QuantumGrnCircuit>> {
        let circuit = self.circuit()?;
        let theta = self.initial_theta(&circuit)?;
        let (p_obs, ncells) = self.observed()?;

        let mut config = self.config;
        config.ncells = ncells;
        Model::new(circuit, theta, p_obs, config)
    }
}
