use std::collections::{BTreeMap, BTreeSet};

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::ml::dataset::TrainingDataset;
use crate::models::AnalyticsEvent;

/// Columns of the engagement schema, in training order
pub const ENGAGEMENT_COLUMNS: [&str; 5] =
    ["browser", "is_mobile", "ref_from_google", "vp_w", "vp_h"];

/// Columns of the batch schema, in training order
pub const BATCH_COLUMNS: [&str; 2] = ["value", "browser"];

/// Referrer substring counting as a Google referral
const GOOGLE_REFERRER: &str = "google";

/// Which feature schema an extractor derives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureSchema {
    /// `value, browser`, labeled with the session category code
    Batch,

    /// `browser, is_mobile, ref_from_google, vp_w, vp_h`, labeled with the
    /// pageclose flag
    Engagement,
}

/// Derives feature rows and labels from raw analytics events.
///
/// Categorical codes follow sorted-distinct order: the code of a value is its
/// position among the sorted distinct values seen during `fit`. Transforming
/// before fitting is an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureExtractor {
    /// Schema this extractor derives
    schema: FeatureSchema,

    /// Browser name -> categorical code
    browser_codes: BTreeMap<String, i64>,

    /// Session category -> categorical code (batch schema only)
    category_codes: BTreeMap<String, i64>,

    /// Is fitted (code maps built)
    is_fitted: bool,
}

impl FeatureExtractor {
    /// Create a new, unfitted extractor
    pub fn new(schema: FeatureSchema) -> Self {
        Self {
            schema,
            browser_codes: BTreeMap::new(),
            category_codes: BTreeMap::new(),
            is_fitted: false,
        }
    }

    /// Build the categorical code maps from a set of events
    pub fn fit(&mut self, events: &[AnalyticsEvent]) -> Result<()> {
        if events.is_empty() {
            return Err(AppError::Validation(
                "cannot fit feature extractor on zero events".to_string(),
            ));
        }

        self.browser_codes = build_codes(events.iter().map(|e| e.browser_name.as_str()));
        if self.schema == FeatureSchema::Batch {
            self.category_codes = build_codes(events.iter().map(|e| e.category.as_str()));
        }
        self.is_fitted = true;

        Ok(())
    }

    /// Derive one feature row from an event
    pub fn transform(&self, event: &AnalyticsEvent) -> Result<Vec<f64>> {
        if !self.is_fitted {
            return Err(AppError::Validation(
                "FeatureExtractor must be fitted before transform".to_string(),
            ));
        }

        let browser = self.browser_code(&event.browser_name)?;

        match self.schema {
            FeatureSchema::Batch => Ok(vec![event.value, browser]),
            FeatureSchema::Engagement => {
                let is_mobile = if event.is_mobile { 1.0 } else { 0.0 };
                let ref_from_google = if event
                    .referrer
                    .as_deref()
                    .unwrap_or("")
                    .contains(GOOGLE_REFERRER)
                {
                    1.0
                } else {
                    0.0
                };
                let (vp_w, vp_h) = viewport_dims(&event.viewport)?;
                Ok(vec![browser, is_mobile, ref_from_google, vp_w, vp_h])
            }
        }
    }

    /// Derive the label for an event
    pub fn label(&self, event: &AnalyticsEvent) -> Result<i32> {
        match self.schema {
            FeatureSchema::Batch => {
                let code = self.category_codes.get(&event.category).ok_or_else(|| {
                    AppError::Validation(format!(
                        "category '{}' was not seen during fit",
                        event.category
                    ))
                })?;
                Ok(*code as i32)
            }
            FeatureSchema::Engagement => Ok(i32::from(event.is_engaged())),
        }
    }

    /// Fit on the events, then derive the full labeled dataset
    pub fn fit_transform(&mut self, events: &[AnalyticsEvent]) -> Result<TrainingDataset> {
        self.fit(events)?;

        let n_features = self.feature_names().len();
        let mut values = Vec::with_capacity(events.len() * n_features);
        let mut labels = Vec::with_capacity(events.len());

        for event in events {
            values.extend(self.transform(event)?);
            labels.push(self.label(event)?);
        }

        let features = Array2::from_shape_vec((events.len(), n_features), values)
            .map_err(|e| AppError::Validation(format!("feature matrix shape: {}", e)))?;

        TrainingDataset::new(features, labels, self.feature_names())
    }

    /// Feature column names of this schema, in order
    pub fn feature_names(&self) -> Vec<String> {
        let columns: &[&str] = match self.schema {
            FeatureSchema::Batch => &BATCH_COLUMNS,
            FeatureSchema::Engagement => &ENGAGEMENT_COLUMNS,
        };
        columns.iter().map(|c| c.to_string()).collect()
    }

    /// Check if fitted
    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    fn browser_code(&self, browser: &str) -> Result<f64> {
        self.browser_codes
            .get(browser)
            .map(|&code| code as f64)
            .ok_or_else(|| {
                AppError::Validation(format!("browser '{}' was not seen during fit", browser))
            })
    }
}

/// Assign sorted-distinct categorical codes
fn build_codes<'a>(values: impl Iterator<Item = &'a str>) -> BTreeMap<String, i64> {
    let distinct: BTreeSet<&str> = values.collect();
    distinct
        .into_iter()
        .enumerate()
        .map(|(code, value)| (value.to_string(), code as i64))
        .collect()
}

/// Split a "WxH" viewport string into width and height floats
fn viewport_dims(viewport: &str) -> Result<(f64, f64)> {
    let (w, h) = viewport.split_once('x').ok_or_else(|| {
        AppError::Validation(format!("viewport '{}' is not in WxH form", viewport))
    })?;

    let vp_w = w.trim().parse::<f64>().map_err(|_| {
        AppError::Validation(format!("viewport width '{}' is not numeric", w))
    })?;
    let vp_h = h.trim().parse::<f64>().map_err(|_| {
        AppError::Validation(format!("viewport height '{}' is not numeric", h))
    })?;

    Ok((vp_w, vp_h))
}
