//! Reference vocabulary derived from the sold-out dataset
//!
//! Every user-submitted valuation passes through `ReferenceVocabulary::validate`
//! before it reaches the model. Values never seen in the sold-out table are
//! rewritten to `Unknown`.

use crate::ingestion::types::{CanonicalListing, RegionalSpecs, UNKNOWN};
use crate::valuation::features::VehicleSpec;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Earliest model year the query surfaces offer
pub const MIN_YEAR: i32 = 1990;

/// Placeholder the scrapers write for a missing trim; never a candidate
const NO_TRIM: &str = "None";

/// Sorted option lists for each categorical query field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceOptions {
    pub makes: Vec<String>,
    pub models: Vec<String>,
    /// Always starts with `Unknown`
    pub trims: Vec<String>,
    pub regional_specs: Vec<String>,
}

/// Dependent choices under one make
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MakeRules {
    pub models: Vec<String>,
    pub regional_specs: Vec<String>,
    pub trims: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct ReferenceVocabulary {
    makes: BTreeSet<String>,
    models: BTreeSet<String>,
    trims: BTreeSet<String>,
    regional_specs: BTreeSet<RegionalSpecs>,
    by_make: BTreeMap<String, MakeTree>,
}

#[derive(Debug, Clone, Default)]
struct MakeTree {
    regional_specs: BTreeSet<String>,
    models: BTreeMap<String, BTreeSet<String>>,
}

fn is_candidate_trim(trim: &str) -> bool {
    let trim = trim.trim();
    !trim.is_empty() && trim != NO_TRIM
}

impl ReferenceVocabulary {
    pub fn from_sold_out(rows: &[CanonicalListing]) -> Self {
        let mut vocab = ReferenceVocabulary::default();
        for row in rows {
            vocab.makes.insert(row.make.clone());
            vocab.models.insert(row.model.clone());
            vocab.trims.insert(row.trim.clone());
            vocab.regional_specs.insert(row.regional_specs);

            let tree = vocab.by_make.entry(row.make.clone()).or_default();
            tree.regional_specs.insert(row.regional_specs.to_string());
            tree.models
                .entry(row.model.clone())
                .or_default()
                .insert(row.trim.clone());
        }
        debug!(
            "Reference vocabulary: {} makes, {} models, {} trims",
            vocab.makes.len(),
            vocab.models.len(),
            vocab.trims.len()
        );
        vocab
    }

    pub fn is_empty(&self) -> bool {
        self.makes.is_empty()
    }

    fn known(set: &BTreeSet<String>, value: &str) -> String {
        if set.contains(value) {
            value.to_string()
        } else {
            UNKNOWN.to_string()
        }
    }

    /// Rewrite every categorical field outside the vocabulary to `Unknown`.
    /// Numeric fields pass through untouched.
    pub fn validate(&self, spec: &VehicleSpec) -> VehicleSpec {
        let validated = VehicleSpec {
            make: Self::known(&self.makes, &spec.make),
            model: Self::known(&self.models, &spec.model),
            trim: Self::known(&self.trims, &spec.trim),
            regional_specs: if self.regional_specs.contains(&spec.regional_specs) {
                spec.regional_specs
            } else {
                RegionalSpecs::Unknown
            },
            year: spec.year,
            kilometers: spec.kilometers,
        };
        if &validated != spec {
            debug!("Coerced query {:?} to {:?}", spec, validated);
        }
        validated
    }

    /// Distinct trims sold under this make and model, sorted.
    /// `Unknown` stays in so a pair with only untrimmed history is still covered.
    pub fn candidate_trims(&self, make: &str, model: &str) -> Vec<String> {
        self.by_make
            .get(make)
            .and_then(|tree| tree.models.get(model))
            .map(|trims| {
                trims
                    .iter()
                    .filter(|t| is_candidate_trim(t))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn options(&self) -> ReferenceOptions {
        let mut trims = vec![UNKNOWN.to_string()];
        trims.extend(self.trims.iter().filter(|t| *t != UNKNOWN).cloned());

        ReferenceOptions {
            makes: self.makes.iter().cloned().collect(),
            models: self.models.iter().cloned().collect(),
            trims,
            regional_specs: self.regional_specs.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn filtering_rules(&self) -> BTreeMap<String, MakeRules> {
        self.by_make
            .iter()
            .map(|(make, tree)| {
                let rules = MakeRules {
                    models: tree.models.keys().cloned().collect(),
                    regional_specs: tree.regional_specs.iter().cloned().collect(),
                    trims: tree
                        .models
                        .iter()
                        .map(|(model, trims)| (model.clone(), trims.iter().cloned().collect()))
                        .collect(),
                };
                (make.clone(), rules)
            })
            .collect()
    }
}

/// Years offered by the input form, newest first
pub fn year_range(current_year: i32) -> Vec<i32> {
    (MIN_YEAR..=current_year).rev().collect()
}

/// Years spanned by a result set, newest first; empty for no rows
pub fn year_range_of(rows: &[CanonicalListing]) -> Vec<i32> {
    let min = rows.iter().map(|r| r.year).min();
    let max = rows.iter().map(|r| r.year).max();
    match (min, max) {
        (Some(min), Some(max)) => (min..=max).rev().collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::types::mock_listing;

    fn sold(make: &str, model: &str, trim: &str, specs: RegionalSpecs) -> CanonicalListing {
        CanonicalListing {
            make: make.to_string(),
            model: model.to_string(),
            trim: trim.to_string(),
            regional_specs: specs,
            ..mock_listing()
        }
    }

    fn vocab() -> ReferenceVocabulary {
        ReferenceVocabulary::from_sold_out(&[
            sold("Toyota", "Camry", "SE", RegionalSpecs::Gcc),
            sold("Toyota", "Camry", "LE", RegionalSpecs::American),
            sold("Toyota", "Camry", "Unknown", RegionalSpecs::Gcc),
            sold("Toyota", "Corolla", "None", RegionalSpecs::Gcc),
            sold("Nissan", "Patrol", "LE", RegionalSpecs::Gcc),
        ])
    }

    #[test]
    fn test_unseen_make_is_coerced() {
        let query = VehicleSpec {
            make: "Tesla".to_string(),
            ..VehicleSpec::from_listing(&mock_listing())
        };
        let validated = vocab().validate(&query);

        assert_eq!(validated.make, "Unknown");
        assert_eq!(validated.model, "Camry");
        assert_eq!(validated.trim, "SE");
        assert_eq!(validated.year, query.year);
    }

    #[test]
    fn test_unseen_specs_are_coerced() {
        let query = VehicleSpec {
            regional_specs: RegionalSpecs::Korean,
            ..VehicleSpec::from_listing(&mock_listing())
        };
        assert_eq!(vocab().validate(&query).regional_specs, RegionalSpecs::Unknown);
    }

    #[test]
    fn test_candidate_trims_skip_placeholders() {
        let vocab = vocab();
        assert_eq!(vocab.candidate_trims("Toyota", "Camry"), vec!["LE", "SE", "Unknown"]);
        assert!(vocab.candidate_trims("Toyota", "Corolla").is_empty());
        assert!(vocab.candidate_trims("Toyota", "Supra").is_empty());
        // Models are scoped to their make
        assert!(vocab.candidate_trims("Nissan", "Camry").is_empty());
    }

    #[test]
    fn test_untrimmed_history_is_still_a_candidate() {
        let vocab = ReferenceVocabulary::from_sold_out(&[
            sold("Toyota", "Camry", "Unknown", RegionalSpecs::Gcc),
            sold("Toyota", "Camry", "", RegionalSpecs::Gcc),
        ]);
        assert_eq!(vocab.candidate_trims("Toyota", "Camry"), vec!["Unknown"]);
    }

    #[test]
    fn test_options_put_unknown_trim_first() {
        let options = vocab().options();
        assert_eq!(options.trims, vec!["Unknown", "LE", "None", "SE"]);
        assert_eq!(options.makes, vec!["Nissan", "Toyota"]);
        assert_eq!(options.regional_specs, vec!["GCC Specs", "American Specs"]);
    }

    #[test]
    fn test_filtering_rules() {
        let rules = vocab().filtering_rules();
        let toyota = &rules["Toyota"];

        assert_eq!(toyota.models, vec!["Camry", "Corolla"]);
        assert_eq!(toyota.trims["Camry"], vec!["LE", "SE", "Unknown"]);
        assert_eq!(toyota.regional_specs, vec!["American Specs", "GCC Specs"]);
    }

    #[test]
    fn test_year_ranges() {
        let years = year_range(1993);
        assert_eq!(years, vec![1993, 1992, 1991, 1990]);

        let rows = vec![
            CanonicalListing { year: 2018, ..mock_listing() },
            CanonicalListing { year: 2020, ..mock_listing() },
        ];
        assert_eq!(year_range_of(&rows), vec![2020, 2019, 2018]);
        assert!(year_range_of(&[]).is_empty());
    }
}
