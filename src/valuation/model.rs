//! Price model boundary and the shipped additive backend

use crate::error::{ValuationError, ValuationResult};
use crate::ingestion::types::UNKNOWN;
use crate::valuation::features::{FeatureRow, FEATURE_NAMES};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{error, info};

/// Any regression backend: one estimate per feature row, same order
pub trait PriceModel: Send + Sync {
    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<f64>>;
}

/// Linear terms on the numeric features plus a learned offset per
/// categorical level. Levels never seen in training fall back to the
/// `Unknown` offset, or zero when the model has none.
#[derive(Debug, Clone, Deserialize)]
pub struct AdditiveModel {
    pub features: Vec<String>,
    pub intercept: f64,
    #[serde(default)]
    pub numeric: HashMap<String, f64>,
    #[serde(default)]
    pub categorical: HashMap<String, HashMap<String, f64>>,
}

impl AdditiveModel {
    pub fn from_json(text: &str) -> Result<Self> {
        let model: AdditiveModel =
            serde_json::from_str(text).context("Model file is not valid JSON")?;
        model.check_features()?;
        Ok(model)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model file {:?}", path))?;
        Self::from_json(&text).with_context(|| format!("Invalid model file {:?}", path))
    }

    fn check_features(&self) -> Result<()> {
        if self.features != FEATURE_NAMES {
            bail!(
                "Model features {:?} do not match expected {:?}",
                self.features,
                FEATURE_NAMES
            );
        }
        let sample = FeatureRow {
            age: 0,
            kilometers: 0.0,
            make: String::new(),
            model: String::new(),
            trim: String::new(),
            regional_specs: String::new(),
            age_kilometers: 0.0,
            kilometers_per_year: 0.0,
        };
        if let Some(name) = self.numeric.keys().find(|n| sample.numeric(n).is_none()) {
            bail!("Coefficient for unknown numeric feature {}", name);
        }
        if let Some(name) = self.categorical.keys().find(|n| sample.categorical(n).is_none()) {
            bail!("Offsets for unknown categorical feature {}", name);
        }
        Ok(())
    }

    fn score(&self, row: &FeatureRow) -> f64 {
        let linear: f64 = self
            .numeric
            .iter()
            .filter_map(|(name, coef)| row.numeric(name).map(|v| coef * v))
            .sum();

        let offsets: f64 = self
            .categorical
            .iter()
            .map(|(name, levels)| {
                row.categorical(name)
                    .and_then(|level| levels.get(level))
                    .or_else(|| levels.get(UNKNOWN))
                    .copied()
                    .unwrap_or(0.0)
            })
            .sum();

        self.intercept + linear + offsets
    }
}

impl PriceModel for AdditiveModel {
    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<f64>> {
        Ok(rows.iter().map(|row| self.score(row)).collect())
    }
}

/// Process-lifetime handle to the loaded model.
///
/// The file is read on first use only. A load failure is remembered and
/// reported to every caller as `ModelUnavailable`; it never panics.
pub struct ModelHandle {
    path: PathBuf,
    cell: OnceLock<Result<Arc<dyn PriceModel>, String>>,
}

impl ModelHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cell: OnceLock::new(),
        }
    }

    /// Wrap an already-constructed model
    pub fn from_model(model: Arc<dyn PriceModel>) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(Ok(model));
        Self {
            path: PathBuf::new(),
            cell,
        }
    }

    pub fn get(&self) -> ValuationResult<Arc<dyn PriceModel>> {
        let loaded = self.cell.get_or_init(|| match AdditiveModel::load(&self.path) {
            Ok(model) => {
                info!("Model loaded from {:?}", self.path);
                Ok(Arc::new(model) as Arc<dyn PriceModel>)
            }
            Err(e) => {
                error!("Error loading model: {:#}", e);
                Err(format!("{:#}", e))
            }
        });

        loaded
            .as_ref()
            .map(Arc::clone)
            .map_err(|e| ValuationError::ModelUnavailable(e.clone()))
    }
}

/// Closure-backed model for tests
#[cfg(test)]
pub(crate) struct FnModel<F>(pub F);

#[cfg(test)]
impl<F> PriceModel for FnModel<F>
where
    F: Fn(&FeatureRow) -> f64 + Send + Sync,
{
    fn predict(&self, rows: &[FeatureRow]) -> Result<Vec<f64>> {
        Ok(rows.iter().map(|row| (self.0)(row)).collect())
    }
}
