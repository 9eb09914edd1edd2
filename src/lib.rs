//! Engagement prediction pipeline for web-analytics event logs.
//!
//! Three binaries share this crate: `engagement-train` fits a model from a
//! local gzip-compressed NDJSON log, `engagement-predict` applies the
//! persisted model to a single feature row, and `engagement-retrain` pulls
//! new logs from an S3-compatible bucket, retrains and updates the training
//! ledger.

pub mod config;
pub mod error;
pub mod ingest;
pub mod ml;
pub mod models;
pub mod pipeline;
pub mod storage;
