use std::fs;
use std::path::Path;

use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// A labeled feature matrix with named columns.
///
/// Also serves as the incremental trainer's previous-data cache, persisted
/// with bincode and overwritten on every run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingDataset {
    /// Feature matrix (n_samples x n_features)
    pub features: Array2<f64>,

    /// Integer class labels, one per row
    pub labels: Vec<i32>,

    /// Feature column names, in matrix order
    pub feature_names: Vec<String>,
}

impl TrainingDataset {
    /// Create a dataset, validating row and column counts
    pub fn new(
        features: Array2<f64>,
        labels: Vec<i32>,
        feature_names: Vec<String>,
    ) -> Result<Self> {
        if features.nrows() != labels.len() {
            return Err(AppError::Validation(format!(
                "{} feature rows but {} labels",
                features.nrows(),
                labels.len()
            )));
        }
        if features.ncols() != feature_names.len() {
            return Err(AppError::Validation(format!(
                "{} feature columns but {} column names",
                features.ncols(),
                feature_names.len()
            )));
        }

        Ok(Self {
            features,
            labels,
            feature_names,
        })
    }

    /// Number of samples
    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    /// Number of features
    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// Split into train and test sets after shuffling row indices
    pub fn train_test_split(&self, test_size: f64, seed: u64) -> (TrainingDataset, TrainingDataset) {
        let mut indices: Vec<usize> = (0..self.n_samples()).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let n_test = (self.n_samples() as f64 * test_size) as usize;
        let (test_indices, train_indices) = indices.split_at(n_test);

        (self.take(train_indices), self.take(test_indices))
    }

    /// Append another dataset with the same columns
    pub fn concat(&self, other: &TrainingDataset) -> Result<TrainingDataset> {
        if self.feature_names != other.feature_names {
            return Err(AppError::Validation(format!(
                "cannot concatenate datasets with columns {:?} and {:?}",
                self.feature_names, other.feature_names
            )));
        }

        let features =
            ndarray::concatenate(Axis(0), &[self.features.view(), other.features.view()])
                .map_err(|e| AppError::Validation(format!("concatenating features: {}", e)))?;

        let mut labels = self.labels.clone();
        labels.extend_from_slice(&other.labels);

        TrainingDataset::new(features, labels, self.feature_names.clone())
    }

    /// Persist as the previous-data cache, overwriting any existing file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = bincode::serialize(self)?;
        fs::write(path, bytes)?;
        Ok(())
    }

    /// Load a previously cached dataset
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::NotFound(format!("dataset cache {}", path.display()))
            } else {
                AppError::Io(e)
            }
        })?;
        Ok(bincode::deserialize(&bytes)?)
    }

    fn take(&self, indices: &[usize]) -> TrainingDataset {
        TrainingDataset {
            features: self.features.select(Axis(0), indices),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
            feature_names: self.feature_names.clone(),
        }
    }
}
