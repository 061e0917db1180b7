//! Model evaluation against the sold-out table

use crate::error::{ValuationError, ValuationResult};
use crate::ingestion::types::CanonicalListing;
use crate::valuation::engine::ValuationEngine;
use crate::valuation::features::VehicleSpec;
use crate::valuation::stats::{mean, quantile, sorted, std_dev};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluationOptions {
    /// Only automatic, petrol, left-hand-drive cars
    pub standard_only: bool,
    /// Drop prices outside 1.5 IQR of the quartiles
    pub remove_outliers: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub count: usize,
    pub rmse: f64,
    pub r_squared: f64,
    pub residual_mean: f64,
    pub residual_std: f64,
    pub residual_pct_mean: f64,
    pub residual_pct_std: f64,
    pub abs_residual_mean: f64,
    pub abs_residual_std: f64,
    pub abs_residual_pct_mean: f64,
    pub abs_residual_pct_std: f64,
}

fn is_standard(row: &CanonicalListing) -> bool {
    row.transmission_type.as_deref() == Some("Automatic Transmission")
        && row.fuel_type.as_deref() == Some("Petrol")
        && row.steering_side.as_deref() == Some("Left Hand")
}

fn within_iqr<'a>(rows: Vec<&'a CanonicalListing>) -> Vec<&'a CanonicalListing> {
    let prices = sorted(&rows.iter().map(|r| r.price).collect::<Vec<_>>());
    let (Some(q1), Some(q3)) = (quantile(&prices, 0.25), quantile(&prices, 0.75)) else {
        return rows;
    };
    let iqr = q3 - q1;
    let (lo, hi) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);
    rows.into_iter()
        .filter(|r| r.price >= lo && r.price <= hi)
        .collect()
}

/// Residuals are actual minus predicted; percentages are relative to actual
pub fn report(actual: &[f64], predicted: &[f64]) -> Option<EvaluationReport> {
    if actual.is_empty() || actual.len() != predicted.len() {
        return None;
    }
    let residuals: Vec<f64> = actual.iter().zip(predicted).map(|(a, p)| a - p).collect();
    let residual_pct: Vec<f64> = actual
        .iter()
        .zip(&residuals)
        .map(|(a, r)| r / a * 100.0)
        .collect();
    let abs_residuals: Vec<f64> = residuals.iter().map(|r| r.abs()).collect();
    let abs_pct: Vec<f64> = residual_pct.iter().map(|r| r.abs()).collect();

    let actual_mean = mean(actual)?;
    let ss_res: f64 = residuals.iter().map(|r| r * r).sum();
    let ss_tot: f64 = actual.iter().map(|a| (a - actual_mean).powi(2)).sum();

    Some(EvaluationReport {
        count: actual.len(),
        rmse: (ss_res / actual.len() as f64).sqrt(),
        r_squared: if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 },
        residual_mean: mean(&residuals)?,
        residual_std: std_dev(&residuals),
        residual_pct_mean: mean(&residual_pct)?,
        residual_pct_std: std_dev(&residual_pct),
        abs_residual_mean: mean(&abs_residuals)?,
        abs_residual_std: std_dev(&abs_residuals),
        abs_residual_pct_mean: mean(&abs_pct)?,
        abs_residual_pct_std: std_dev(&abs_pct),
    })
}

pub fn evaluate(
    engine: &ValuationEngine,
    sold_out: &[CanonicalListing],
    options: EvaluationOptions,
) -> ValuationResult<EvaluationReport> {
    let year = engine.year();
    let mut rows: Vec<&CanonicalListing> = sold_out
        .iter()
        .filter(|r| r.price > 0.0 && r.year <= year)
        .filter(|r| !options.standard_only || is_standard(r))
        .collect();
    if options.remove_outliers {
        rows = within_iqr(rows);
    }

    let specs: Vec<VehicleSpec> = rows.iter().map(|r| VehicleSpec::from_listing(r)).collect();
    let predicted = engine.predict_raw(&specs)?;
    let actual: Vec<f64> = rows.iter().map(|r| r.price).collect();

    let report = report(&actual, &predicted)
        .ok_or_else(|| ValuationError::Validation("No sold-out rows to evaluate".to_string()))?;
    info!(
        "Evaluated {} rows: RMSE {:.2}, R² {:.4}",
        report.count, report.rmse, report.r_squared
    );
    Ok(report)
}
