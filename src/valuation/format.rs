//! Price presentation - rounding happens here and nowhere else

use crate::valuation::engine::PredictionResult;
use serde::Serialize;
use std::collections::BTreeMap;

/// Whole currency units with thousands separators, e.g. `12,345`
pub fn group_thousands(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if rounded < 0.0 {
        out.insert(0, '-');
    }
    out
}

pub fn format_price(currency: &str, value: f64) -> String {
    format!("{} {}", currency, group_thousands(value))
}

pub fn format_range(currency: &str, min: f64, max: f64) -> String {
    format!("{} {} - {}", currency, group_thousands(min), group_thousands(max))
}

/// Display form of a prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayPrice {
    pub price: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub per_trim: BTreeMap<String, String>,
}

pub fn display(currency: &str, result: &PredictionResult) -> DisplayPrice {
    match result {
        PredictionResult::Point { price } => DisplayPrice {
            price: format_price(currency, *price),
            per_trim: BTreeMap::new(),
        },
        PredictionResult::Range(range) => DisplayPrice {
            price: format_range(currency, range.min, range.max),
            per_trim: range
                .per_trim
                .iter()
                .map(|(trim, price)| (trim.clone(), format_price(currency, *price)))
                .collect(),
        },
    }
}
