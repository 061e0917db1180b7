//! Dubizzle exports: for-sale, on-sale and sold-out files share one layout

use super::{coerce_number, coerce_year, normalize_rows, owned, required, row_id};
use crate::error::RowError;
use crate::ingestion::mappings::{DUBIZZLE_SELLER, DUBIZZLE_SPECS, FUEL};
use crate::ingestion::types::{CanonicalListing, PostedAt, RawData, Source, UNKNOWN};
use crate::ingestion::utils::{posted_from_unix, strip_unit_word};
use anyhow::Result;
use serde::Deserialize;

/// Dubizzle CSV row structure
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DubizzleRow {
    pub id: Option<String>,
    #[serde(rename = "Make")]
    pub make: Option<String>,
    #[serde(rename = "Model")]
    pub model: Option<String>,
    #[serde(rename = "Year")]
    pub year: Option<String>,
    #[serde(rename = "Kilometers")]
    pub kilometers: Option<String>,
    #[serde(rename = "Trim")]
    pub trim: Option<String>,
    #[serde(rename = "Regional Specs")]
    pub regional_specs: Option<String>,
    #[serde(rename = "Price")]
    pub price: Option<String>,
    #[serde(rename = "Seller Type")]
    pub seller_type: Option<String>,
    /// Unix seconds
    pub added: Option<String>,
    pub permalink: Option<String>,
    #[serde(rename = "Doors")]
    pub doors: Option<String>,
    #[serde(rename = "Body Type")]
    pub body_type: Option<String>,
    #[serde(rename = "Fuel Type")]
    pub fuel_type: Option<String>,
    #[serde(rename = "Interior Color")]
    pub interior_color: Option<String>,
    #[serde(rename = "Exterior Color")]
    pub exterior_color: Option<String>,
    #[serde(rename = "Transmission Type")]
    pub transmission_type: Option<String>,
    #[serde(rename = "Steering Side")]
    pub steering_side: Option<String>,
    #[serde(rename = "Seating Capacity")]
    pub seating_capacity: Option<String>,
}

/// Parse one or more Dubizzle exports, in the given order
pub fn parse_dubizzle(raws: &[RawData]) -> Result<Vec<CanonicalListing>> {
    let mut listings = Vec::new();
    for raw in raws {
        listings.extend(normalize_rows(raw, "Dubizzle", normalize_dubizzle)?);
    }
    Ok(listings)
}

pub fn normalize_dubizzle(row: DubizzleRow) -> Result<CanonicalListing, RowError> {
    let id = row_id(&row.id)?;

    Ok(CanonicalListing {
        id,
        make: required("Make", &row.make)?.to_string(),
        model: required("Model", &row.model)?.to_string(),
        year: coerce_year(&row.year)?,
        kilometers: coerce_number("Kilometers", &row.kilometers)?,
        trim: owned(&row.trim).unwrap_or_else(|| UNKNOWN.to_string()),
        regional_specs: DUBIZZLE_SPECS.map(row.regional_specs.as_deref()),
        price: coerce_number("Price", &row.price)?,
        seller_type: DUBIZZLE_SELLER.map(row.seller_type.as_deref()),
        posted_at: row
            .added
            .as_deref()
            .map(posted_from_unix)
            .unwrap_or(PostedAt::Unknown),
        source: Source::Dubizzle,
        permalink: owned(&row.permalink).unwrap_or_default(),
        doors: owned(&row.doors).map(|d| strip_unit_word(&d, "doors")),
        body_type: owned(&row.body_type),
        fuel_type: owned(&row.fuel_type).map(|f| FUEL.apply(&f)),
        interior_color: owned(&row.interior_color),
        exterior_color: owned(&row.exterior_color),
        transmission_type: owned(&row.transmission_type),
        steering_side: owned(&row.steering_side),
        seating_capacity: owned(&row.seating_capacity).map(|s| strip_unit_word(&s, "Seater")),
    })
}
