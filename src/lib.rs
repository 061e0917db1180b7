// Library module for testable functions

pub mod config;
pub mod error;
pub mod ingestion;
pub mod service;
pub mod valuation;

/// Predictions this close to zero divide by 1 instead
pub const RATIO_EPSILON: f64 = 1e-9;

/// Listed price relative to the model estimate
/// Formula: price / predicted, with a zero estimate treated as 1
pub fn price_ratio(price: f64, predicted: f64) -> f64 {
    let divisor = if predicted.abs() < RATIO_EPSILON {
        1.0
    } else {
        predicted
    };
    price / divisor
}

/// Priced under the estimate; a zero or negative price is bad data, not a deal
pub fn is_undervalued(price: f64, ratio: f64) -> bool {
    price > 0.0 && ratio > 0.0 && ratio < 1.0
}
