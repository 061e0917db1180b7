//! Auction scoring - value every sold lot against the model's trim range

use crate::error::{ValuationError, ValuationResult};
use crate::ingestion::types::{AuctionRecord, AuctionScores};
use crate::price_ratio;
use crate::valuation::engine::{TrimRange, ValuationEngine};
use crate::valuation::features::VehicleSpec;
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ScoreStats {
    pub scored: usize,
    pub uncovered: usize,
    pub failed: usize,
}

impl fmt::Display for ScoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scored: {}, no coverage: {}, failed: {}",
            self.scored, self.uncovered, self.failed
        )
    }
}

/// Ratios of the hammer price to the predicted range
pub fn auction_scores(final_price: f64, range: &TrimRange) -> AuctionScores {
    let predicted = range.midpoint();
    AuctionScores {
        min_predicted: range.min,
        max_predicted: range.max,
        predicted,
        min_ratio: price_ratio(final_price, range.max),
        max_ratio: price_ratio(final_price, range.min),
        ratio: price_ratio(final_price, predicted),
    }
}

fn score_one(engine: &ValuationEngine, record: &AuctionRecord) -> ValuationResult<AuctionScores> {
    let spec = engine.vocabulary().validate(&VehicleSpec::from_auction(record));
    let candidates = engine.vocabulary().candidate_trims(&spec.make, &spec.model);
    let range = engine.predict_unknown_trim(&spec, &candidates)?;
    Ok(auction_scores(record.final_price, &range))
}

/// Score lots in parallel. Lots without sold-out coverage keep empty scores;
/// an unloadable model aborts the whole batch.
pub fn score_auctions(
    engine: &ValuationEngine,
    records: Vec<AuctionRecord>,
) -> ValuationResult<(Vec<AuctionRecord>, ScoreStats)> {
    engine.ensure_model()?;

    let outcomes: Vec<(AuctionRecord, ValuationResult<AuctionScores>)> = records
        .into_par_iter()
        .map(|record| {
            let outcome = score_one(engine, &record);
            (record, outcome)
        })
        .collect();

    let mut stats = ScoreStats::default();
    let mut scored = Vec::with_capacity(outcomes.len());
    for (mut record, outcome) in outcomes {
        match outcome {
            Ok(scores) => {
                stats.scored += 1;
                record.scores = Some(scores);
            }
            Err(ValuationError::NoData { make, model }) => {
                stats.uncovered += 1;
                debug!("No sold-out coverage for lot {} ({} {})", record.id, make, model);
                record.scores = None;
            }
            Err(e) => {
                stats.failed += 1;
                if stats.failed <= 10 {
                    warn!("Failed to score lot {}: {}", record.id, e);
                }
                record.scores = None;
            }
        }
        scored.push(record);
    }

    info!("Auction scoring: {}", stats);
    Ok((scored, stats))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ingestion::types::{RegionalSpecs, Source};
    use crate::valuation::engine::tests::test_engine;

    pub(crate) fn lot(id: &str, make: &str, model: &str, final_price: f64) -> AuctionRecord {
        AuctionRecord {
            id: id.to_string(),
            make: make.to_string(),
            model: model.to_string(),
            year: 2019,
            kilometers: 85_000.0,
            regional_specs: RegionalSpecs::Gcc,
            transmission: None,
            body_type: None,
            engine_type: None,
            cylinders: None,
            fuel_type: None,
            interior_color: None,
            exterior_color: None,
            seating_capacity: None,
            doors: None,
            primary_damage: None,
            secondary_damage: None,
            auction_date: None,
            start_price: 20_000.0,
            final_price,
            bid_difference: final_price - 20_000.0,
            bid_difference_pct: None,
            participation_count: None,
            source: Source::MarhabaAuctions,
            scores: None,
        }
    }

    #[test]
    fn test_scores_use_range_midpoint() {
        let records = vec![
            lot("L1", "Toyota", "Camry", 55_250.0),
            lot("L2", "Lada", "Niva", 10_000.0),
        ];
        let (scored, stats) = score_auctions(&test_engine(), records).unwrap();

        assert_eq!(stats.scored, 1);
        assert_eq!(stats.uncovered, 1);
        assert_eq!(scored[0].id, "L1");

        let scores = scored[0].scores.unwrap();
        // Unknown 50750, LE 52750, SE 55750, XLE 59750
        assert_eq!(scores.min_predicted, 50_750.0);
        assert_eq!(scores.max_predicted, 59_750.0);
        assert_eq!(scores.predicted, 55_250.0);
        assert_eq!(scores.ratio, 1.0);
        assert!(scores.min_ratio < scores.ratio && scores.ratio < scores.max_ratio);
        assert!(scored[1].scores.is_none());
    }

    #[test]
    fn test_order_survives_parallel_scoring() {
        let records: Vec<AuctionRecord> = (0..50)
            .map(|i| lot(&format!("L{}", i), "Toyota", "Camry", 40_000.0))
            .collect();
        let (scored, _) = score_auctions(&test_engine(), records).unwrap();

        let ids: Vec<String> = scored.iter().map(|r| r.id.clone()).collect();
        let expected: Vec<String> = (0..50).map(|i| format!("L{}", i)).collect();
        assert_eq!(ids, expected);
    }
}
