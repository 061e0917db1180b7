//! Dubicars export

use super::{cell, coerce_number, coerce_year, normalize_rows, owned, required, row_id};
use crate::error::RowError;
use crate::ingestion::mappings::{
    DUBICARS_BODY, DUBICARS_SEATS, DUBICARS_SELLER, DUBICARS_SPECS, FUEL,
};
use crate::ingestion::types::{CanonicalListing, PostedAt, RawData, Source, UNKNOWN};
use crate::ingestion::utils::title_case;
use anyhow::Result;
use serde::Deserialize;

/// Listing ids known to be corrupt in the Dubicars feed
const BLOCKED_IDS: [&str; 1] = ["714672.0"];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DubicarsRow {
    pub item_id: Option<String>,
    pub car_make: Option<String>,
    pub car_model: Option<String>,
    pub car_year: Option<String>,
    pub mileage: Option<String>,
    pub car_trim: Option<String>,
    pub regional_specs: Option<String>,
    pub price: Option<String>,
    pub item_link: Option<String>,
    pub seller_type: Option<String>,
    pub steering_side: Option<String>,
    pub body_type: Option<String>,
    pub fuel_type: Option<String>,
    pub seats: Option<String>,
    pub gearbox: Option<String>,
    pub color: Option<String>,
}

pub fn parse_dubicars(raw: &RawData) -> Result<Vec<CanonicalListing>> {
    normalize_rows(raw, "Dubicars", normalize_dubicars)
}

pub fn normalize_dubicars(row: DubicarsRow) -> Result<CanonicalListing, RowError> {
    let id = row_id(&row.item_id)?;
    if BLOCKED_IDS.contains(&id.as_str()) {
        return Err(RowError::Filtered("blocked listing id"));
    }

    Ok(CanonicalListing {
        id,
        make: required("Make", &row.car_make)?.to_string(),
        model: required("Model", &row.car_model)?.to_string(),
        year: coerce_year(&row.car_year)?,
        kilometers: coerce_number("Kilometers", &row.mileage)?,
        trim: owned(&row.car_trim).unwrap_or_else(|| UNKNOWN.to_string()),
        regional_specs: DUBICARS_SPECS.map(row.regional_specs.as_deref()),
        price: coerce_number("Price", &row.price)?,
        seller_type: DUBICARS_SELLER.map(row.seller_type.as_deref()),
        posted_at: PostedAt::Unknown,
        source: Source::Dubicars,
        permalink: owned(&row.item_link).unwrap_or_default(),
        doors: None,
        body_type: cell(&row.body_type).map(|b| DUBICARS_BODY.apply(b)),
        fuel_type: cell(&row.fuel_type).map(|f| FUEL.apply(f)),
        interior_color: None,
        exterior_color: cell(&row.color).map(title_case),
        transmission_type: cell(&row.gearbox).map(|g| format!("{} Transmission", g)),
        steering_side: cell(&row.steering_side).map(title_case),
        seating_capacity: cell(&row.seats).map(|s| DUBICARS_SEATS.apply(s)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::types::{RegionalSpecs, SellerType};

    fn mock_row() -> DubicarsRow {
        DubicarsRow {
            item_id: Some("D100".to_string()),
            car_make: Some("Nissan".to_string()),
            car_model: Some("Patrol".to_string()),
            car_year: Some("2021".to_string()),
            mileage: Some("42000".to_string()),
            car_trim: Some("LE Platinum".to_string()),
            regional_specs: Some("GCC".to_string()),
            price: Some("210000".to_string()),
            item_link: Some("https://dubicars.com/d100".to_string()),
            seller_type: Some("Private".to_string()),
            steering_side: Some("left hand".to_string()),
            body_type: Some("SUV/Crossover".to_string()),
            fuel_type: Some("Gasoline".to_string()),
            seats: Some("9+".to_string()),
            gearbox: Some("Automatic".to_string()),
            color: Some("pearl white".to_string()),
        }
    }

    #[test]
    fn test_normalize_dubicars_vocabulary() {
        let listing = normalize_dubicars(mock_row()).unwrap();

        assert_eq!(listing.seller_type, SellerType::Owner);
        assert_eq!(listing.regional_specs, RegionalSpecs::Gcc);
        assert_eq!(listing.body_type.as_deref(), Some("SUV"));
        assert_eq!(listing.fuel_type.as_deref(), Some("Petrol"));
        assert_eq!(listing.seating_capacity.as_deref(), Some("8+"));
        assert_eq!(
            listing.transmission_type.as_deref(),
            Some("Automatic Transmission")
        );
        assert_eq!(listing.steering_side.as_deref(), Some("Left Hand"));
        assert_eq!(listing.exterior_color.as_deref(), Some("Pearl White"));
        assert_eq!(listing.posted_at, PostedAt::Unknown);
        assert_eq!(listing.doors, None);
    }

    #[test]
    fn test_other_specs_and_blocked_ids() {
        let row = DubicarsRow {
            regional_specs: Some("Other".to_string()),
            ..mock_row()
        };
        assert_eq!(
            normalize_dubicars(row).unwrap().regional_specs,
            RegionalSpecs::Other
        );

        let blocked = DubicarsRow {
            item_id: Some("714672.0".to_string()),
            ..mock_row()
        };
        assert!(matches!(
            normalize_dubicars(blocked),
            Err(RowError::Filtered(_))
        ));
    }
}
