//! Carswitch export - sparse rows whose make/model are slugified

use super::{cell, coerce_number, coerce_year, normalize_rows, owned, required, row_id};
use crate::error::RowError;
use crate::ingestion::mappings::CARSWITCH_SPECS;
use crate::ingestion::types::{CanonicalListing, PostedAt, RawData, SellerType, Source, UNKNOWN};
use crate::ingestion::utils::{parse_odometer, recover_token};
use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CarswitchRow {
    pub id: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<String>,
    /// "150,000 KM" or "62,000 Miles"
    pub mileage: Option<String>,
    pub specs: Option<String>,
    pub price: Option<String>,
    pub url: Option<String>,
    pub title: Option<String>,
}

pub fn parse_carswitch(raw: &RawData) -> Result<Vec<CanonicalListing>> {
    normalize_rows(raw, "Carswitch", normalize_carswitch)
}

pub fn normalize_carswitch(row: CarswitchRow) -> Result<CanonicalListing, RowError> {
    let id = row_id(&row.id)?;
    let title = cell(&row.title).unwrap_or_default();

    let mileage = required("Kilometers", &row.mileage)?;
    let kilometers = parse_odometer(mileage).ok_or_else(|| RowError::InvalidNumber {
        field: "Kilometers",
        value: mileage.to_string(),
    })?;

    Ok(CanonicalListing {
        id,
        make: recover_token(required("Make", &row.make)?, title),
        model: recover_token(required("Model", &row.model)?, title),
        year: coerce_year(&row.year)?,
        kilometers,
        trim: UNKNOWN.to_string(),
        regional_specs: CARSWITCH_SPECS.map(row.specs.as_deref()),
        price: coerce_number("Price", &row.price)?,
        seller_type: SellerType::Unknown,
        posted_at: PostedAt::Unknown,
        source: Source::Carswitch,
        permalink: owned(&row.url).unwrap_or_default(),
        doors: None,
        body_type: None,
        fuel_type: None,
        interior_color: None,
        exterior_color: None,
        transmission_type: None,
        steering_side: None,
        seating_capacity: None,
    })
}
