//! Parse functions - normalize raw marketplace exports into canonical rows
//!
//! Every source has its own raw row struct (all cells read as optional
//! strings) and a pure `normalize_*` function. The shared driver below
//! deserializes, normalizes, and drops rows that fail.

pub mod auction;
pub mod cars24;
pub mod carswitch;
pub mod dubicars;
pub mod dubizzle;
pub mod telegram;

pub use auction::{parse_emirates_auction, parse_marhaba_auctions};
pub use cars24::parse_cars24;
pub use carswitch::parse_carswitch;
pub use dubicars::parse_dubicars;
pub use dubizzle::parse_dubizzle;
pub use telegram::{parse_telegram, KnownModels, TelegramWindow};

use crate::error::RowError;
use crate::ingestion::types::RawData;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

/// Only the first few row failures per source are logged
const MAX_LOGGED_ERRORS: usize = 10;

/// Counts rejected rows for one source and logs the first few
pub(crate) struct RowTally<'a> {
    source: &'a str,
    errors: usize,
    filtered: usize,
}

impl<'a> RowTally<'a> {
    pub(crate) fn new(source: &'a str) -> Self {
        Self {
            source,
            errors: 0,
            filtered: 0,
        }
    }

    pub(crate) fn reject(&mut self, idx: usize, err: &RowError) {
        match err {
            RowError::Filtered(reason) => {
                self.filtered += 1;
                debug!("Skipped {} row {}: {}", self.source, idx, reason);
            }
            _ => {
                self.errors += 1;
                if self.errors <= MAX_LOGGED_ERRORS {
                    warn!("Failed to parse {} row {}: {}", self.source, idx, err);
                }
            }
        }
    }

    pub(crate) fn unreadable(&mut self, idx: usize, err: &csv::Error) {
        self.errors += 1;
        if self.errors <= MAX_LOGGED_ERRORS {
            warn!("Failed to deserialize {} row {}: {}", self.source, idx, err);
        }
    }

    pub(crate) fn finish(&self, kept: usize) {
        info!(
            "Parsed {} records from {} ({} errors, {} filtered)",
            kept, self.source, self.errors, self.filtered
        );
    }
}

/// Deserialize every record of `raw` as `R` and normalize it with `normalize`.
/// Rows that fail are counted and dropped; the batch always continues.
pub(crate) fn normalize_rows<R, T, F>(raw: &RawData, source: &str, mut normalize: F) -> Result<Vec<T>>
where
    R: DeserializeOwned,
    F: FnMut(R) -> Result<T, RowError>,
{
    let mut reader = raw
        .csv_reader()
        .with_context(|| format!("Failed to open {} data", source))?;

    let mut records = Vec::new();
    let mut tally = RowTally::new(source);

    for (idx, result) in reader.deserialize::<R>().enumerate() {
        match result {
            Ok(row) => match normalize(row) {
                Ok(record) => records.push(record),
                Err(e) => tally.reject(idx, &e),
            },
            Err(e) => tally.unreadable(idx, &e),
        }
    }

    tally.finish(records.len());
    Ok(records)
}

/// Trimmed, non-empty cell content
pub(crate) fn cell(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub(crate) fn owned(value: &Option<String>) -> Option<String> {
    cell(value).map(str::to_string)
}

pub(crate) fn row_id(value: &Option<String>) -> Result<String, RowError> {
    cell(value).map(str::to_string).ok_or(RowError::MissingId)
}

pub(crate) fn required<'a>(field: &'static str, value: &'a Option<String>) -> Result<&'a str, RowError> {
    cell(value).ok_or(RowError::MissingField(field))
}

/// Plain numeric cell; thousands separators are tolerated, negatives are not
pub(crate) fn coerce_number(field: &'static str, value: &Option<String>) -> Result<f64, RowError> {
    let raw = required(field, value)?;
    parse_plain_number(raw).ok_or_else(|| RowError::InvalidNumber {
        field,
        value: raw.to_string(),
    })
}

/// Numeric cell that may be negative, such as a bid difference
pub(crate) fn coerce_signed(field: &'static str, value: &Option<String>) -> Result<f64, RowError> {
    let raw = required(field, value)?;
    raw.replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| RowError::InvalidNumber {
            field,
            value: raw.to_string(),
        })
}

pub(crate) fn parse_plain_number(raw: &str) -> Option<f64> {
    raw.trim()
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

/// Whole-number year ("2019" or "2019.0")
pub(crate) fn coerce_year(value: &Option<String>) -> Result<i32, RowError> {
    let year = coerce_number("Year", value)?;
    if year.fract() != 0.0 || year > i32::MAX as f64 {
        return Err(RowError::InvalidNumber {
            field: "Year",
            value: year.to_string(),
        });
    }
    Ok(year as i32)
}
