//! Cars24 export

use super::{cell, coerce_number, coerce_year, normalize_rows, owned, required, row_id};
use crate::error::RowError;
use crate::ingestion::mappings::{CARS24_COLOR, CARS24_SELLER, CARS24_SPECS, FUEL};
use crate::ingestion::types::{CanonicalListing, PostedAt, RawData, Source, UNKNOWN};
use crate::ingestion::utils::title_case;
use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Cars24Row {
    pub appointment_id: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<String>,
    pub odometer_reading: Option<String>,
    pub specs: Option<String>,
    pub price: Option<String>,
    pub url: Option<String>,
    pub car_exterior_color: Option<String>,
    pub transmission_type: Option<String>,
    pub fuel_type: Option<String>,
    pub variant: Option<String>,
    pub assortment_category: Option<String>,
}

pub fn parse_cars24(raw: &RawData) -> Result<Vec<CanonicalListing>> {
    normalize_rows(raw, "Cars24", normalize_cars24)
}

pub fn normalize_cars24(row: Cars24Row) -> Result<CanonicalListing, RowError> {
    let id = row_id(&row.appointment_id)?;

    Ok(CanonicalListing {
        id,
        make: title_case(required("Make", &row.make)?),
        model: title_case(required("Model", &row.model)?),
        year: coerce_year(&row.year)?,
        kilometers: coerce_number("Kilometers", &row.odometer_reading)?,
        trim: owned(&row.variant).unwrap_or_else(|| UNKNOWN.to_string()),
        regional_specs: CARS24_SPECS.map(row.specs.as_deref()),
        price: coerce_number("Price", &row.price)?,
        seller_type: CARS24_SELLER.map(row.assortment_category.as_deref()),
        posted_at: PostedAt::Unknown,
        source: Source::Cars24,
        permalink: owned(&row.url).unwrap_or_default(),
        doors: None,
        body_type: None,
        fuel_type: cell(&row.fuel_type).map(|f| FUEL.apply(f)),
        interior_color: None,
        exterior_color: cell(&row.car_exterior_color).map(|c| CARS24_COLOR.apply(c)),
        transmission_type: cell(&row.transmission_type).map(|t| format!("{} Transmission", t)),
        steering_side: None,
        seating_capacity: None,
    })
}
