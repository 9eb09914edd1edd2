use std::collections::HashMap;
use std::fs;
use std::path::Path;

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_classifier::{
    DecisionTreeClassifier, DecisionTreeClassifierParameters, SplitCriterion,
};
use tracing::debug;

use crate::config::TrainingConfig;
use crate::error::{AppError, Result};
use crate::ml::dataset::TrainingDataset;
use crate::ml::metrics::ModelMetrics;

type Tree = DecisionTreeClassifier<f64, i32, DenseMatrix<f64>, Vec<i32>>;

/// Random forest hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestParams {
    /// Number of trees fit per call to `fit`
    pub n_estimators: usize,

    /// Maximum tree depth, unlimited when absent
    pub max_depth: Option<u16>,

    /// Minimum samples per leaf
    pub min_samples_leaf: usize,

    /// Seed for bootstrap resampling
    pub seed: u64,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

impl From<&TrainingConfig> for RandomForestParams {
    fn from(config: &TrainingConfig) -> Self {
        Self {
            n_estimators: config.n_estimators,
            max_depth: config.max_depth,
            min_samples_leaf: config.min_samples_leaf,
            seed: config.seed,
        }
    }
}

/// Provenance and training stats carried with a persisted model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Model name
    pub name: String,

    /// Model version
    pub version: String,

    /// When the model was last fit
    pub trained_at: chrono::DateTime<chrono::Utc>,

    /// Samples in the last fit
    pub n_training_samples: usize,

    /// Feature count
    pub n_features: usize,

    /// Metrics on the last training set
    pub training_metrics: ModelMetrics,

    /// Hyperparameters
    pub hyperparameters: HashMap<String, String>,
}

/// Random forest engagement classifier.
///
/// Bootstrap-aggregated smartcore decision trees: each tree is fit on a
/// resample (with replacement) of the training rows, predictions are
/// majority votes and probabilities are per-class vote fractions. The
/// training-time feature column names are stored with the model, and
/// prediction input must carry exactly those columns in order.
#[derive(Debug, Serialize, Deserialize)]
pub struct EngagementClassifier {
    /// Model metadata
    metadata: ModelMetadata,

    /// Fitted trees
    trees: Vec<Tree>,

    /// Training-time feature column names, in order
    feature_names: Vec<String>,

    /// Distinct class labels, sorted
    classes: Vec<i32>,

    /// Hyperparameters
    params: RandomForestParams,

    /// Keep existing trees and grow the ensemble on the next fit
    warm_start: bool,
}

impl EngagementClassifier {
    pub fn new(params: RandomForestParams) -> Self {
        let hyperparameters = [
            ("n_estimators".to_string(), params.n_estimators.to_string()),
            (
                "min_samples_leaf".to_string(),
                params.min_samples_leaf.to_string(),
            ),
            ("seed".to_string(), params.seed.to_string()),
        ]
        .into_iter()
        .collect();

        Self {
            metadata: ModelMetadata {
                name: "Engagement Random Forest".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                trained_at: chrono::Utc::now(),
                n_training_samples: 0,
                n_features: 0,
                training_metrics: ModelMetrics::new(),
                hyperparameters,
            },
            trees: Vec::new(),
            feature_names: Vec::new(),
            classes: Vec::new(),
            params,
            warm_start: false,
        }
    }

    /// Fit the forest on a dataset.
    ///
    /// Without warm start any existing trees are discarded and the forest is
    /// rebuilt from scratch. With warm start enabled on a trained model the
    /// existing trees are kept and `n_estimators` additional trees are fit on
    /// the provided data, growing the ensemble.
    pub fn fit(&mut self, dataset: &TrainingDataset) -> Result<ModelMetrics> {
        if dataset.n_samples() == 0 {
            return Err(AppError::Model(
                "cannot fit on an empty dataset".to_string(),
            ));
        }

        let growing = self.warm_start && self.is_trained();
        if growing {
            self.check_columns_for(&dataset.feature_names, "warm-start fit")?;
            self.merge_classes(&dataset.labels);
        } else {
            self.trees.clear();
            self.feature_names = dataset.feature_names.clone();
            self.classes = distinct_sorted(&dataset.labels);
        }

        let n = dataset.n_samples();
        let rows: Vec<Vec<f64>> = (0..n)
            .map(|i| dataset.features.row(i).to_vec())
            .collect();

        // Offset the seed by the current tree count so a warm-start fit does
        // not replay the bootstrap draws of the original fit.
        let mut rng = StdRng::seed_from_u64(
            self.params.seed.wrapping_add(self.trees.len() as u64),
        );

        for _ in 0..self.params.n_estimators {
            let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();

            let values: Vec<f64> = sample.iter().flat_map(|&i| rows[i].clone()).collect();
            let x = DenseMatrix::new(n, dataset.n_features(), values, false);
            let y: Vec<i32> = sample.iter().map(|&i| dataset.labels[i]).collect();

            let tree = Tree::fit(&x, &y, self.tree_params())
                .map_err(|e| AppError::Model(format!("failed to fit tree: {}", e)))?;
            self.trees.push(tree);
        }

        debug!("forest holds {} trees after fit", self.trees.len());

        let predictions = self.predict_matrix(&dataset.features)?;
        let metrics = ModelMetrics::calculate(&dataset.labels, &predictions, &self.classes);

        self.metadata.trained_at = chrono::Utc::now();
        self.metadata.n_training_samples = dataset.n_samples();
        self.metadata.n_features = dataset.n_features();
        self.metadata.training_metrics = metrics.clone();

        Ok(metrics)
    }

    /// Predict class labels for rows carrying the given column names
    pub fn predict(&self, feature_names: &[String], features: &Array2<f64>) -> Result<Vec<i32>> {
        self.check_columns_for(feature_names, "predict")?;
        self.predict_matrix(features)
    }

    /// Predict per-class probabilities (vote fractions) for rows carrying
    /// the given column names; columns follow `classes()` order
    pub fn predict_proba(
        &self,
        feature_names: &[String],
        features: &Array2<f64>,
    ) -> Result<Array2<f64>> {
        self.check_columns_for(feature_names, "predict_proba")?;

        let votes = self.vote_counts(features)?;
        let n_trees = self.trees.len() as f64;

        let mut proba = Array2::zeros((features.nrows(), self.classes.len()));
        for (row, row_votes) in votes.iter().enumerate() {
            for (class_idx, &count) in row_votes.iter().enumerate() {
                proba[[row, class_idx]] = count as f64 / n_trees;
            }
        }

        Ok(proba)
    }

    /// Evaluate on a labeled dataset
    pub fn evaluate(&self, dataset: &TrainingDataset) -> Result<ModelMetrics> {
        let predictions = self.predict(&dataset.feature_names, &dataset.features)?;
        Ok(ModelMetrics::calculate(
            &dataset.labels,
            &predictions,
            &self.classes,
        ))
    }

    /// Persist the model as a single bincode file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = bincode::serialize(self)?;
        fs::write(path, bytes)?;
        Ok(())
    }

    /// Load a persisted model
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::NotFound(format!("model file {}", path.display()))
            } else {
                AppError::Io(e)
            }
        })?;
        Ok(bincode::deserialize(&bytes)?)
    }

    /// Get model metadata
    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// Distinct class labels, sorted
    pub fn classes(&self) -> &[i32] {
        &self.classes
    }

    /// Training-time feature column names
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Number of trees in the ensemble
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Check if model is trained
    pub fn is_trained(&self) -> bool {
        !self.trees.is_empty()
    }

    /// Enable or disable warm-start fitting
    pub fn set_warm_start(&mut self, warm_start: bool) {
        self.warm_start = warm_start;
    }

    fn check_columns_for(&self, feature_names: &[String], operation: &str) -> Result<()> {
        if feature_names != self.feature_names.as_slice() {
            return Err(AppError::Validation(format!(
                "{} expects columns {:?} but got {:?}",
                operation, self.feature_names, feature_names
            )));
        }
        Ok(())
    }

    fn predict_matrix(&self, features: &Array2<f64>) -> Result<Vec<i32>> {
        let votes = self.vote_counts(features)?;

        Ok(votes
            .iter()
            .map(|row_votes| {
                let best = row_votes
                    .iter()
                    .enumerate()
                    .max_by_key(|(_, &count)| count)
                    .map(|(idx, _)| idx)
                    .unwrap_or(0);
                self.classes[best]
            })
            .collect())
    }

    /// Per-row, per-class vote counts across the ensemble
    fn vote_counts(&self, features: &Array2<f64>) -> Result<Vec<Vec<usize>>> {
        if !self.is_trained() {
            return Err(AppError::Model("model is not trained".to_string()));
        }

        let x = ndarray_to_densematrix(features);
        let mut votes = vec![vec![0usize; self.classes.len()]; features.nrows()];

        for tree in &self.trees {
            let predictions = tree
                .predict(&x)
                .map_err(|e| AppError::Model(format!("prediction failed: {}", e)))?;

            for (row, label) in predictions.iter().enumerate() {
                if let Ok(class_idx) = self.classes.binary_search(label) {
                    votes[row][class_idx] += 1;
                }
            }
        }

        Ok(votes)
    }

    fn tree_params(&self) -> DecisionTreeClassifierParameters {
        let mut params = DecisionTreeClassifierParameters::default()
            .with_criterion(SplitCriterion::Gini)
            .with_min_samples_leaf(self.params.min_samples_leaf);

        if let Some(depth) = self.params.max_depth {
            params = params.with_max_depth(depth);
        }

        params
    }

    fn merge_classes(&mut self, labels: &[i32]) {
        let mut merged = self.classes.clone();
        merged.extend(distinct_sorted(labels));
        merged.sort_unstable();
        merged.dedup();
        self.classes = merged;
    }
}

fn distinct_sorted(labels: &[i32]) -> Vec<i32> {
    let mut classes = labels.to_vec();
    classes.sort_unstable();
    classes.dedup();
    classes
}

fn ndarray_to_densematrix(arr: &Array2<f64>) -> DenseMatrix<f64> {
    let shape = arr.shape();
    let data: Vec<f64> = arr.iter().copied().collect();
    DenseMatrix::new(shape[0], shape[1], data, false)
}
