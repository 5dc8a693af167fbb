//! Circuit parameters keyed by (control gene, target gene)
//!
//! The key space is the full product genes × genes, laid out control-major:
//! key (c, t) lives at index `c * G + t`. Self-edges (g, g) hold the encoder
//! rotation of gene g; every other key is the controlled rotation of an edge.

use ndarray::Array1;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{GrnError, Result};

/// Directed edge between two genes, by gene index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    pub control: usize,
    pub target: usize,
}

impl EdgeKey {
    pub fn new(control: usize, target: usize) -> Self {
        EdgeKey { control, target }
    }

    /// Encoder key of a gene
    pub fn self_loop(gene: usize) -> Self {
        EdgeKey {
            control: gene,
            target: gene,
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.control == self.target
    }

    /// Position of this key in a dense G×G table
    #[inline]
    pub fn index(&self, ngenes: usize) -> usize {
        debug_assert!(
            self.control < ngenes && self.target < ngenes,
            "key {}-{} out of range for {ngenes} genes",
            self.control,
            self.target
        );
        self.control * ngenes + self.target
    }

    /// Inverse of [`EdgeKey::index`]
    #[inline]
    pub fn from_index(index: usize, ngenes: usize) -> Self {
        EdgeKey {
            control: index / ngenes,
            target: index % ngenes,
        }
    }
}

/// Every ordered pair of distinct genes, control-major
pub fn all_edges(ngenes: usize) -> Vec<EdgeKey> {
    (0..ngenes)
        .flat_map(|c| (0..ngenes).map(move |t| EdgeKey::new(c, t)))
        .filter(|k| !k.is_self_loop())
        .collect()
}

/// Parameter set (theta) of a QuantumGRN circuit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    genes: Vec<String>,
    values: Array1<f64>,
}

impl ParameterSet {
    /// All parameters initialised to zero
    pub fn new(genes: Vec<String>) -> Self {
        let n = genes.len();
        ParameterSet {
            genes,
            values: Array1::zeros(n * n),
        }
    }

    /// Builder: set every encoder parameter to `value`
    pub fn with_encoder(mut self, value: f64) -> Self {
        for g in 0..self.ngenes() {
            self.set(EdgeKey::self_loop(g), value);
        }
        self
    }

    /// Builder: draw each listed edge uniformly from `[low, high)`
    pub fn with_random_edges<R: Rng>(
        mut self,
        edges: &[EdgeKey],
        low: f64,
        high: f64,
        rng: &mut R,
    ) -> Self {
        for &edge in edges {
            let value = rng.gen_range(low..high);
            self.set(edge, value);
        }
        self
    }

    pub fn ngenes(&self) -> usize {
        self.genes.len()
    }

    pub fn genes(&self) -> &[String] {
        &self.genes
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    pub fn get(&self, key: EdgeKey) -> f64 {
        self.values[key.index(self.ngenes())]
    }

    pub fn set(&mut self, key: EdgeKey, value: f64) {
        let idx = key.index(self.ngenes());
        self.values[idx] = value;
    }

    /// Keys in storage order
    pub fn keys(&self) -> impl Iterator<Item = EdgeKey> + '_ {
        let n = self.ngenes();
        (0..self.len()).map(move |i| EdgeKey::from_index(i, n))
    }

    /// Index of a gene by name
    pub fn gene_index(&self, name: &str) -> Result<usize> {
        self.genes
            .iter()
            .position(|g| g == name)
            .ok_or_else(|| GrnError::UnknownGene(name.to_string()))
    }

    /// Key for a (control, target) pair of gene names
    pub fn key(&self, control: &str, target: &str) -> Result<EdgeKey> {
        Ok(EdgeKey::new(
            self.gene_index(control)?,
            self.gene_index(target)?,
        ))
    }

    /// Column label "<control>-<target>"
    pub fn label(&self, key: EdgeKey) -> String {
        format!("{}-{}", self.genes[key.control], self.genes[key.target])
    }

    /// Gradient-descent step: θ ← θ − lr · g, over every key
    pub fn descend(&mut self, gradient: &Array1<f64>, learning_rate: f64) -> Result<()> {
        if gradient.len() != self.values.len() {
            return Err(GrnError::DimensionMismatch {
                expected: self.values.len(),
                found: gradient.len(),
            });
        }
        self.values.scaled_add(-learning_rate, gradient);
        Ok(())
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for key in self.keys() {
            writeln!(f, "{:<16} {:.6}", self.label(key), self.get(key))?;
        }
        Ok(())
    }
}
