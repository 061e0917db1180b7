//! Undervaluation scoring over the predicted-price table

use crate::ingestion::types::{CanonicalListing, PostedAt, PredictedListing};
use crate::{is_undervalued, price_ratio};
use serde::Serialize;
use std::cmp::Ordering;

/// Attach an estimate and its ratio to a listing
pub fn score_listing(listing: CanonicalListing, predicted_price: f64) -> PredictedListing {
    let price_ratio = price_ratio(listing.price, predicted_price);
    PredictedListing {
        listing,
        predicted_price,
        price_ratio,
    }
}

/// One row of the best-deals table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UndervaluedListing {
    #[serde(rename = "Make")]
    pub make: String,
    #[serde(rename = "Model")]
    pub model: String,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Kilometers")]
    pub kilometers: f64,
    #[serde(rename = "Regional Specs")]
    pub regional_specs: String,
    #[serde(rename = "Price")]
    pub price: f64,
    #[serde(rename = "Predicted_Price")]
    pub predicted_price: f64,
    pub ratio: f64,
    #[serde(rename = "Seller Type")]
    pub seller_type: String,
    #[serde(rename = "Posted Datetime")]
    pub posted_at: PostedAt,
    #[serde(rename = "Source")]
    pub source: String,
    pub permalink: String,
}

impl From<&PredictedListing> for UndervaluedListing {
    fn from(row: &PredictedListing) -> Self {
        let l = &row.listing;
        Self {
            make: l.make.clone(),
            model: l.model.clone(),
            year: l.year,
            kilometers: l.kilometers,
            regional_specs: l.regional_specs.to_string(),
            price: l.price,
            predicted_price: row.predicted_price,
            ratio: row.price_ratio,
            seller_type: l.seller_type.to_string(),
            posted_at: l.posted_at,
            source: l.source.to_string(),
            permalink: l.permalink.clone(),
        }
    }
}

/// Listings priced under their estimate, best deal first.
/// The ratio is recomputed from the stored prices rather than trusted.
pub fn list_undervalued(rows: &[PredictedListing]) -> Vec<UndervaluedListing> {
    let mut deals: Vec<UndervaluedListing> = rows
        .iter()
        .filter(|row| {
            let ratio = price_ratio(row.listing.price, row.predicted_price);
            is_undervalued(row.listing.price, ratio)
        })
        .map(|row| UndervaluedListing {
            ratio: price_ratio(row.listing.price, row.predicted_price),
            ..UndervaluedListing::from(row)
        })
        .collect();

    deals.sort_by(|a, b| a.ratio.partial_cmp(&b.ratio).unwrap_or(Ordering::Equal));
    deals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::types::mock_listing;

    fn predicted(id: &str, price: f64, predicted_price: f64) -> PredictedListing {
        score_listing(
            CanonicalListing {
                id: id.to_string(),
                price,
                ..mock_listing()
            },
            predicted_price,
        )
    }

    #[test]
    fn test_filter_and_order() {
        let rows = vec![
            predicted("fair", 50_000.0, 60_000.0),
            predicted("free", 0.0, 60_000.0),
            predicted("over", 60_000.0, 50_000.0),
            predicted("steal", 30_000.0, 60_000.0),
        ];

        let deals = list_undervalued(&rows);

        assert_eq!(deals.len(), 2);
        assert_eq!(deals[0].ratio, 0.5);
        assert!((deals[1].ratio - 0.833).abs() < 0.001);
        assert_eq!(deals[1].predicted_price, 60_000.0);
    }

    #[test]
    fn test_zero_prediction_uses_unit_divisor() {
        let row = predicted("odd", 40_000.0, 0.0);
        assert_eq!(row.price_ratio, 40_000.0);
        assert!(list_undervalued(&[row]).is_empty());
    }

    #[test]
    fn test_serialized_columns() {
        let deals = list_undervalued(&[predicted("fair", 50_000.0, 60_000.0)]);
        let json = serde_json::to_value(&deals[0]).unwrap();

        assert_eq!(json["Predicted_Price"], 60_000.0);
        assert_eq!(json["Regional Specs"], "GCC Specs");
        assert_eq!(json["Posted Datetime"], "2024-05-01T10:30:00");
    }
}
