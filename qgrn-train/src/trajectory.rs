//! Parameter trajectory capture and export
//!
//! The recorder appends a full theta snapshot per epoch; when training stops
//! the snapshots are materialised into an epochs × parameters table.

use ndarray::{Array1, Array2};
use qgrn_core::{GrnError, ParameterSet, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Default sampling period for export
pub const DEFAULT_SAMPLE: usize = 10;

/// Growing list of per-epoch theta snapshots
#[derive(Debug, Clone, Default)]
pub struct TrajectoryRecorder {
    snapshots: Vec<Array1<f64>>,
}

impl TrajectoryRecorder {
    pub fn with_capacity(epochs: usize) -> Self {
        Self {
            snapshots: Vec::with_capacity(epochs),
        }
    }

    pub fn record(&mut self, theta: &ParameterSet) {
        self.snapshots.push(theta.values().clone());
    }

    /// Materialise the snapshots, labelling columns by parameter key
    pub fn finish(self, theta: &ParameterSet) -> Trajectory {
        let labels: Vec<String> = theta.keys().map(|key| theta.label(key)).collect();
        let mut table = Array2::zeros((self.snapshots.len(), labels.len()));
        for (mut row, snapshot) in table.rows_mut().into_iter().zip(&self.snapshots) {
            row.assign(snapshot);
        }
        Trajectory { labels, table }
    }
}

/// Theta values across training, one row per epoch
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    labels: Vec<String>,
    table: Array2<f64>,
}

impl Trajectory {
    /// Column labels "<control>-<target>"
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn table(&self) -> &Array2<f64> {
        &self.table
    }

    pub fn epochs(&self) -> usize {
        self.table.nrows()
    }

    /// Number of rows written for a sampling period
    pub fn sampled_rows(&self, sample: usize) -> Result<usize> {
        if sample == 0 {
            return Err(GrnError::InvalidStride(sample));
        }
        Ok((self.epochs() + sample - 1) / sample)
    }

    /// Write every `sample`-th epoch as comma-separated text with a header line
    pub fn write_csv<W: Write>(&self, mut writer: W, sample: usize) -> Result<usize> {
        let rows = self.sampled_rows(sample)?;

        writeln!(writer, "{}", self.labels.join(","))?;
        for row in self.table.rows().into_iter().step_by(sample) {
            let line: Vec<String> = row.iter().map(|v| format!("{v:.18e}")).collect();
            writeln!(writer, "{}", line.join(","))?;
        }
        writer.flush()?;
        Ok(rows)
    }

    /// Write the sampled trajectory to `path`
    pub fn export(&self, path: impl AsRef<Path>, sample: usize) -> Result<usize> {
        let file = File::create(path)?;
        self.write_csv(BufWriter::new(file), sample)
    }
}
