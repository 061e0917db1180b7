//! Feature derivation shared by training-time and query-time records

use crate::error::{ValuationError, ValuationResult};
use crate::ingestion::types::{AuctionRecord, CanonicalListing, RegionalSpecs, UNKNOWN};
use chrono::{Datelike, Utc};
use serde::Serialize;

/// Column order the price model is trained on
pub const FEATURE_NAMES: [&str; 8] = [
    "Age",
    "Kilometers",
    "Make",
    "Model",
    "Trim",
    "Regional Specs",
    "Age_Kilometers",
    "Kilometers_per_Year",
];

/// Wall-clock year; read per call, never cached
pub fn current_year() -> i32 {
    Utc::now().year()
}

/// The subset of a listing the model cares about
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleSpec {
    pub make: String,
    pub model: String,
    pub trim: String,
    pub regional_specs: RegionalSpecs,
    pub year: i32,
    pub kilometers: f64,
}

impl VehicleSpec {
    pub fn from_listing(listing: &CanonicalListing) -> Self {
        Self {
            make: listing.make.clone(),
            model: listing.model.clone(),
            trim: listing.trim.clone(),
            regional_specs: listing.regional_specs,
            year: listing.year,
            kilometers: listing.kilometers,
        }
    }

    /// Auction lots carry no trim
    pub fn from_auction(record: &AuctionRecord) -> Self {
        Self {
            make: record.make.clone(),
            model: record.model.clone(),
            trim: UNKNOWN.to_string(),
            regional_specs: record.regional_specs,
            year: record.year,
            kilometers: record.kilometers,
        }
    }

    pub fn has_unknown_trim(&self) -> bool {
        self.trim == UNKNOWN
    }

    pub fn with_trim(&self, trim: &str) -> Self {
        Self {
            trim: trim.to_string(),
            ..self.clone()
        }
    }
}

/// One model-ready row, fields in `FEATURE_NAMES` order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    pub age: i32,
    pub kilometers: f64,
    pub make: String,
    pub model: String,
    pub trim: String,
    pub regional_specs: String,
    pub age_kilometers: f64,
    pub kilometers_per_year: f64,
}

impl FeatureRow {
    /// Value of a numeric feature by column name
    pub fn numeric(&self, name: &str) -> Option<f64> {
        match name {
            "Age" => Some(self.age as f64),
            "Kilometers" => Some(self.kilometers),
            "Age_Kilometers" => Some(self.age_kilometers),
            "Kilometers_per_Year" => Some(self.kilometers_per_year),
            _ => None,
        }
    }

    /// Value of a categorical feature by column name
    pub fn categorical(&self, name: &str) -> Option<&str> {
        match name {
            "Make" => Some(&self.make),
            "Model" => Some(&self.model),
            "Trim" => Some(&self.trim),
            "Regional Specs" => Some(&self.regional_specs),
            _ => None,
        }
    }
}

/// Age and the mileage composites.
///
/// `Kilometers_per_Year` divides by `max(Age, 1)` so current-year cars do not
/// divide by zero; `Age` itself stays 0. A car from the future is rejected.
pub fn derive_features(spec: &VehicleSpec, current_year: i32) -> ValuationResult<FeatureRow> {
    let age = current_year
        .checked_sub(spec.year)
        .filter(|age| *age >= 0)
        .ok_or_else(|| {
            ValuationError::Validation(format!("Year {} is not valid in {}", spec.year, current_year))
        })?;
    if !spec.kilometers.is_finite() || spec.kilometers < 0.0 {
        return Err(ValuationError::Validation(format!(
            "Kilometers must be a non-negative number, got {}",
            spec.kilometers
        )));
    }

    Ok(FeatureRow {
        age,
        kilometers: spec.kilometers,
        make: spec.make.clone(),
        model: spec.model.clone(),
        trim: spec.trim.clone(),
        regional_specs: spec.regional_specs.label().to_string(),
        age_kilometers: age as f64 * spec.kilometers,
        kilometers_per_year: spec.kilometers / age.max(1) as f64,
    })
}
