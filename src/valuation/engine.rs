//! Valuation engine - point estimates and unknown-trim price ranges

use crate::error::{ValuationError, ValuationResult};
use crate::ingestion::types::{RegionalSpecs, UNKNOWN};
use crate::valuation::features::{current_year, derive_features, VehicleSpec};
use crate::valuation::model::ModelHandle;
use crate::valuation::vocabulary::{ReferenceVocabulary, MIN_YEAR};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Raw query as submitted by a caller; every field still text
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValuationQuery {
    pub make: Option<String>,
    pub model: Option<String>,
    pub trim: Option<String>,
    pub regional_specs: Option<String>,
    pub year: Option<String>,
    pub kilometers: Option<String>,
}

impl ValuationQuery {
    /// Reject missing or non-numeric required fields. Categorical fields
    /// default to `Unknown` and are checked against the vocabulary later.
    pub fn parse(&self) -> ValuationResult<VehicleSpec> {
        let text = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or(UNKNOWN)
                .to_string()
        };

        Ok(VehicleSpec {
            make: text(&self.make),
            model: text(&self.model),
            trim: text(&self.trim),
            regional_specs: self
                .regional_specs
                .as_deref()
                .and_then(RegionalSpecs::from_label)
                .unwrap_or(RegionalSpecs::Unknown),
            year: required_year(&self.year)?,
            kilometers: required_number(&self.kilometers, "Kilometers")?,
        })
    }
}

fn required_number(value: &Option<String>, field: &str) -> ValuationResult<f64> {
    let raw = value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ValuationError::Validation(format!("{} is required", field)))?;
    raw.replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ValuationError::Validation(format!("{} must be numeric, got {:?}", field, raw)))
}

fn required_year(value: &Option<String>) -> ValuationResult<i32> {
    let year = required_number(value, "Year")?.round();
    if year < MIN_YEAR as f64 || year > i32::MAX as f64 {
        return Err(ValuationError::Validation(format!(
            "Year must be {} or later, got {}",
            MIN_YEAR, year
        )));
    }
    Ok(year as i32)
}

/// Unknown-trim outcome: the spread across every candidate trim
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrimRange {
    pub min: f64,
    pub max: f64,
    pub per_trim: BTreeMap<String, f64>,
}

impl TrimRange {
    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PredictionResult {
    Point { price: f64 },
    Range(TrimRange),
}

impl PredictionResult {
    /// Single figure used for ratios; a range collapses to its midpoint
    pub fn estimate(&self) -> f64 {
        match self {
            PredictionResult::Point { price } => *price,
            PredictionResult::Range(range) => range.midpoint(),
        }
    }
}

pub struct ValuationEngine {
    model: ModelHandle,
    vocabulary: ReferenceVocabulary,
    fixed_year: Option<i32>,
}

impl ValuationEngine {
    pub fn new(model: ModelHandle, vocabulary: ReferenceVocabulary) -> Self {
        Self {
            model,
            vocabulary,
            fixed_year: None,
        }
    }

    /// Pin the clock year, for reproducible batch output
    pub fn with_year(mut self, year: i32) -> Self {
        self.fixed_year = Some(year);
        self
    }

    pub fn year(&self) -> i32 {
        self.fixed_year.unwrap_or_else(current_year)
    }

    pub fn vocabulary(&self) -> &ReferenceVocabulary {
        &self.vocabulary
    }

    /// Fail fast before a batch when the model cannot load
    pub fn ensure_model(&self) -> ValuationResult<()> {
        self.model.get().map(|_| ())
    }

    /// Point estimate for a listing with a known trim
    pub fn predict_known(&self, spec: &VehicleSpec) -> ValuationResult<f64> {
        if spec.has_unknown_trim() {
            return Err(ValuationError::Validation(
                "predict_known requires a known trim".to_string(),
            ));
        }
        self.predict_raw(std::slice::from_ref(spec))?
            .first()
            .copied()
            .ok_or_else(|| ValuationError::Scoring("model returned no estimate".to_string()))
    }

    /// Score specs as they are, `Unknown` trims included, in one model call
    pub fn predict_raw(&self, specs: &[VehicleSpec]) -> ValuationResult<Vec<f64>> {
        let year = self.year();
        let features = specs
            .iter()
            .map(|spec| derive_features(spec, year))
            .collect::<ValuationResult<Vec<_>>>()?;
        let model = self.model.get()?;
        let prices = model
            .predict(&features)
            .map_err(|e| ValuationError::Scoring(format!("{:#}", e)))?;

        if prices.len() != features.len() {
            return Err(ValuationError::Scoring(format!(
                "model returned {} estimates for {} rows",
                prices.len(),
                features.len()
            )));
        }
        if prices.iter().any(|p| !p.is_finite()) {
            return Err(ValuationError::Scoring("model returned a non-finite estimate".to_string()));
        }
        Ok(prices)
    }

    /// Substitute each candidate trim and collect the spread. `Unknown` may
    /// itself be a candidate when it is all the history holds.
    /// An empty candidate list is a coverage gap, not a failure.
    pub fn predict_unknown_trim(
        &self,
        spec: &VehicleSpec,
        candidate_trims: &[String],
    ) -> ValuationResult<TrimRange> {
        if candidate_trims.is_empty() {
            return Err(ValuationError::NoData {
                make: spec.make.clone(),
                model: spec.model.clone(),
            });
        }

        let specs: Vec<VehicleSpec> = candidate_trims
            .iter()
            .map(|trim| spec.with_trim(trim))
            .collect();
        let prices = self.predict_raw(&specs)?;
        let per_trim: BTreeMap<String, f64> =
            candidate_trims.iter().cloned().zip(prices).collect();

        let min = per_trim.values().copied().fold(f64::INFINITY, f64::min);
        let max = per_trim.values().copied().fold(f64::NEG_INFINITY, f64::max);
        debug!(
            "{} {}: {} trims, range {:.0} - {:.0}",
            spec.make,
            spec.model,
            per_trim.len(),
            min,
            max
        );
        Ok(TrimRange { min, max, per_trim })
    }

    /// Predict an already-validated spec, expanding an unknown trim
    pub fn predict(&self, spec: &VehicleSpec) -> ValuationResult<PredictionResult> {
        if spec.has_unknown_trim() {
            let candidates = self.vocabulary.candidate_trims(&spec.make, &spec.model);
            self.predict_unknown_trim(spec, &candidates)
                .map(PredictionResult::Range)
        } else {
            self.predict_known(spec)
                .map(|price| PredictionResult::Point { price })
        }
    }

    /// Parse a raw query and coerce it to the vocabulary
    pub fn resolve(&self, query: &ValuationQuery) -> ValuationResult<VehicleSpec> {
        Ok(self.vocabulary.validate(&query.parse()?))
    }

    /// Full request path: resolve, then predict
    pub fn valuate(&self, query: &ValuationQuery) -> ValuationResult<PredictionResult> {
        self.valuate_resolved(&self.resolve(query)?)
    }

    /// Predict an already resolved query; coverage gaps are not logged as failures
    pub fn valuate_resolved(&self, spec: &VehicleSpec) -> ValuationResult<PredictionResult> {
        self.predict(spec).inspect_err(|e| {
            if !matches!(e, ValuationError::NoData { .. }) {
                warn!("Valuation failed for {} {}: {}", spec.make, spec.model, e);
            }
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ingestion::types::{mock_listing, CanonicalListing};
    use crate::valuation::features::FeatureRow;
    use crate::valuation::model::FnModel;
    use std::sync::Arc;

    /// Fixed trim premium, minus age and mileage
    pub(crate) fn test_model(row: &FeatureRow) -> f64 {
        let trim_bonus = match row.trim.as_str() {
            "SE" => 5_000.0,
            "LE" => 2_000.0,
            "XLE" => 9_000.0,
            _ => 0.0,
        };
        60_000.0 + trim_bonus - 1_000.0 * row.age as f64 - 0.05 * row.kilometers
    }

    pub(crate) fn sold_out_fixture() -> Vec<CanonicalListing> {
        ["SE", "LE", "XLE", "Unknown"]
            .into_iter()
            .enumerate()
            .map(|(i, trim)| CanonicalListing {
                id: format!("S{}", i),
                trim: trim.to_string(),
                ..mock_listing()
            })
            .collect()
    }

    pub(crate) fn test_engine() -> ValuationEngine {
        let model = ModelHandle::from_model(Arc::new(FnModel(test_model)));
        ValuationEngine::new(model, ReferenceVocabulary::from_sold_out(&sold_out_fixture()))
            .with_year(2024)
    }

    fn query(trim: &str) -> ValuationQuery {
        ValuationQuery {
            make: Some("Toyota".to_string()),
            model: Some("Camry".to_string()),
            trim: Some(trim.to_string()),
            regional_specs: Some("GCC Specs".to_string()),
            year: Some("2019".to_string()),
            kilometers: Some("85,000".to_string()),
        }
    }

    #[test]
    fn test_known_trim_point_estimate() {
        let result = test_engine().valuate(&query("SE")).unwrap();
        // 60000 + 5000 - 5000 - 4250
        assert_eq!(result, PredictionResult::Point { price: 55_750.0 });
    }

    #[test]
    fn test_unknown_trim_range_bounds_every_candidate() {
        let result = test_engine().valuate(&query("Unknown")).unwrap();
        let PredictionResult::Range(range) = result else {
            panic!("Expected a range");
        };

        assert_eq!(range.per_trim.len(), 4);
        for price in range.per_trim.values() {
            assert!(range.min <= *price && *price <= range.max);
        }
        // Untrimmed sales earn no premium
        assert_eq!(range.min, range.per_trim["Unknown"]);
        assert_eq!(range.min, 50_750.0);
        assert_eq!(range.max, range.per_trim["XLE"]);
    }

    #[test]
    fn test_untrimmed_history_still_yields_a_range() {
        let sold_out = vec![CanonicalListing {
            trim: UNKNOWN.to_string(),
            ..mock_listing()
        }];
        let engine = ValuationEngine::new(
            ModelHandle::from_model(Arc::new(FnModel(test_model))),
            ReferenceVocabulary::from_sold_out(&sold_out),
        )
        .with_year(2024);

        let result = engine.valuate(&query("Unknown")).unwrap();
        let PredictionResult::Range(range) = result else {
            panic!("Expected a range");
        };
        assert_eq!(range.per_trim.keys().collect::<Vec<_>>(), vec!["Unknown"]);
        assert_eq!(range.min, range.max);
    }

    #[test]
    fn test_resolve_coerces_unseen_values() {
        let mut q = query("Hybrid Sport");
        q.make = Some("Tesla".to_string());
        let spec = test_engine().resolve(&q).unwrap();

        assert_eq!(spec.make, UNKNOWN);
        assert_eq!(spec.trim, UNKNOWN);
        assert_eq!(spec.kilometers, 85_000.0);
    }

    #[test]
    fn test_out_of_vocabulary_trim_is_expanded() {
        let result = test_engine().valuate(&query("Hybrid Sport")).unwrap();
        assert!(matches!(result, PredictionResult::Range(_)));
    }

    #[test]
    fn test_unseen_make_is_a_coverage_gap() {
        let mut q = query("SE");
        q.make = Some("Tesla".to_string());
        q.trim = Some("Unknown".to_string());

        let err = test_engine().valuate(&q).unwrap_err();
        assert_eq!(err.kind(), "insufficient_data");
    }

    #[test]
    fn test_empty_candidates_is_no_data() {
        let spec = VehicleSpec::from_listing(&mock_listing()).with_trim(UNKNOWN);
        let err = test_engine().predict_unknown_trim(&spec, &[]).unwrap_err();
        assert!(matches!(err, ValuationError::NoData { .. }));
    }

    #[test]
    fn test_missing_or_non_numeric_fields_are_rejected() {
        let mut q = query("SE");
        q.kilometers = None;
        assert!(matches!(
            test_engine().valuate(&q),
            Err(ValuationError::Validation(_))
        ));

        let mut q = query("SE");
        q.year = Some("twenty nineteen".to_string());
        assert!(matches!(
            test_engine().valuate(&q),
            Err(ValuationError::Validation(_))
        ));
    }

    #[test]
    fn test_out_of_range_year_is_rejected() {
        for year in ["-3000000000", "1985", "9999999999"] {
            let mut q = query("SE");
            q.year = Some(year.to_string());
            assert!(
                matches!(test_engine().valuate(&q), Err(ValuationError::Validation(_))),
                "year {}",
                year
            );
        }
    }

    #[test]
    fn test_missing_model_is_reported_per_request() {
        let engine = ValuationEngine::new(
            ModelHandle::new("/nonexistent/model.json"),
            ReferenceVocabulary::from_sold_out(&sold_out_fixture()),
        );
        let err = engine.valuate(&query("SE")).unwrap_err();
        assert_eq!(err.kind(), "model_unavailable");
        assert_eq!(engine.valuate(&query("SE")).unwrap_err().kind(), "model_unavailable");
    }

    #[test]
    fn test_predict_known_is_deterministic() {
        let engine = test_engine();
        let spec = VehicleSpec::from_listing(&mock_listing());
        assert_eq!(
            engine.predict_known(&spec).unwrap(),
            engine.predict_known(&spec).unwrap()
        );
    }
}
