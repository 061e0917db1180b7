//! Enrichment functions - attach model estimates to canonical records

use crate::error::{ValuationError, ValuationResult};
use crate::ingestion::types::{CanonicalListing, PredictedListing};
use crate::valuation::auction::ScoreStats;
use crate::valuation::features::VehicleSpec;
use crate::valuation::undervalued::score_listing;
use crate::valuation::ValuationEngine;
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Estimate one listing using its own trim; an unknown trim is expanded
/// over the sold-out candidates and collapses to the range midpoint
pub fn predict_listing(
    engine: &ValuationEngine,
    listing: &CanonicalListing,
) -> ValuationResult<f64> {
    let spec = engine.vocabulary().validate(&VehicleSpec::from_listing(listing));
    engine.predict(&spec).map(|result| result.estimate())
}

/// Build the `cars_predicted` rows. Listings the model cannot value
/// (no sold-out coverage, future model year) are left out and counted.
pub fn predict_listings(
    engine: &ValuationEngine,
    listings: Vec<CanonicalListing>,
) -> ValuationResult<(Vec<PredictedListing>, ScoreStats)> {
    engine.ensure_model()?;

    let outcomes: Vec<(CanonicalListing, ValuationResult<f64>)> = listings
        .into_par_iter()
        .map(|listing| {
            let outcome = predict_listing(engine, &listing);
            (listing, outcome)
        })
        .collect();

    let mut stats = ScoreStats::default();
    let mut predicted = Vec::with_capacity(outcomes.len());
    for (listing, outcome) in outcomes {
        match outcome {
            Ok(price) => {
                stats.scored += 1;
                predicted.push(score_listing(listing, price));
            }
            Err(ValuationError::NoData { make, model }) => {
                stats.uncovered += 1;
                debug!("No sold-out coverage for {} ({} {})", listing.id, make, model);
            }
            Err(e) => {
                stats.failed += 1;
                if stats.failed <= 10 {
                    warn!("Failed to predict {}: {}", listing.id, e);
                }
            }
        }
    }

    info!("Listing prediction: {}", stats);
    Ok((predicted, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::types::mock_listing;
    use crate::valuation::engine::tests::test_engine;

    #[test]
    fn test_known_and_unknown_trims() {
        let listings = vec![
            mock_listing(),
            CanonicalListing {
                id: "A2".to_string(),
                trim: "Unknown".to_string(),
                price: 50_000.0,
                ..mock_listing()
            },
            CanonicalListing {
                id: "A3".to_string(),
                make: "Lada".to_string(),
                trim: "Unknown".to_string(),
                ..mock_listing()
            },
        ];

        let (predicted, stats) = predict_listings(&test_engine(), listings).unwrap();

        assert_eq!(stats.scored, 2);
        assert_eq!(stats.uncovered, 1);
        assert_eq!(predicted[0].predicted_price, 55_750.0);
        // midpoint of Unknown 50750 and XLE 59750
        assert_eq!(predicted[1].predicted_price, 55_250.0);
        assert!((predicted[1].price_ratio - 50_000.0 / 55_250.0).abs() < 1e-12);
    }

    #[test]
    fn test_future_year_is_counted_as_failure() {
        let listings = vec![CanonicalListing { year: 2030, ..mock_listing() }];
        let (predicted, stats) = predict_listings(&test_engine(), listings).unwrap();

        assert!(predicted.is_empty());
        assert_eq!(stats.failed, 1);
    }
}
