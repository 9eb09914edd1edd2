//! Machine learning module for engagement classification
//!
//! This module provides the training and inference pieces shared by the
//! batch and incremental trainers:
//! - Feature derivation from raw analytics events
//! - Labeled datasets with named columns, splitting and concatenation
//! - A bootstrap-aggregated random forest classifier with persistence
//! - Model evaluation metrics

pub mod classifier;
pub mod dataset;
pub mod features;
pub mod metrics;

pub use classifier::{EngagementClassifier, ModelMetadata, RandomForestParams};
pub use dataset::TrainingDataset;
pub use features::{FeatureExtractor, FeatureSchema, BATCH_COLUMNS, ENGAGEMENT_COLUMNS};
pub use metrics::{ClassMetrics, ModelMetrics};
