//! Dataset row layouts - the on-disk shape of every stored table
//!
//! Each dataset has a serde row struct whose renames are the stored column
//! names. Cells are read as optional text and coerced into the domain type,
//! so one bad cell drops its row and never the table.

use crate::error::RowError;
use crate::ingestion::parse::{cell, coerce_number, coerce_signed, coerce_year, owned, required, row_id};
use crate::ingestion::types::{
    AuctionRecord, AuctionScores, CanonicalListing, PostedAt, PredictedListing, RegionalSpecs,
    SellerType, Source, UNKNOWN,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A domain type stored through a serde row struct
pub trait DatasetRecord: Sized {
    type Row: Serialize + DeserializeOwned;

    fn to_row(&self) -> Self::Row;

    fn from_row(row: Self::Row) -> Result<Self, RowError>;
}

/// Render a number the way datasets store it: integral values without a fraction
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

fn number(value: f64) -> Option<String> {
    Some(format_number(value))
}

fn optional_signed(field: &'static str, value: &Option<String>) -> Result<Option<f64>, RowError> {
    cell(value).map(|_| coerce_signed(field, value)).transpose()
}

fn regional_specs(value: &Option<String>) -> RegionalSpecs {
    cell(value)
        .and_then(RegionalSpecs::from_label)
        .unwrap_or(RegionalSpecs::Unknown)
}

fn source(value: &Option<String>) -> Result<Source, RowError> {
    cell(value)
        .and_then(Source::from_label)
        .ok_or(RowError::MissingField("Source"))
}

/// `cars_for_sale` / `cars_sold_out`
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ListingRow {
    id: Option<String>,
    #[serde(rename = "Make")]
    make: Option<String>,
    #[serde(rename = "Model")]
    model: Option<String>,
    #[serde(rename = "Year")]
    year: Option<String>,
    #[serde(rename = "Kilometers")]
    kilometers: Option<String>,
    #[serde(rename = "Trim")]
    trim: Option<String>,
    #[serde(rename = "Regional Specs")]
    regional_specs: Option<String>,
    #[serde(rename = "Price")]
    price: Option<String>,
    #[serde(rename = "Seller Type")]
    seller_type: Option<String>,
    #[serde(rename = "Posted Datetime")]
    posted_datetime: Option<String>,
    #[serde(rename = "Source")]
    source: Option<String>,
    permalink: Option<String>,
    #[serde(rename = "No of Doors")]
    doors: Option<String>,
    #[serde(rename = "Body Type")]
    body_type: Option<String>,
    #[serde(rename = "Fuel Type")]
    fuel_type: Option<String>,
    #[serde(rename = "Interior Color")]
    interior_color: Option<String>,
    #[serde(rename = "Exterior Color")]
    exterior_color: Option<String>,
    #[serde(rename = "Transmission Type")]
    transmission_type: Option<String>,
    #[serde(rename = "Steering Side")]
    steering_side: Option<String>,
    #[serde(rename = "Seating Capacity")]
    seating_capacity: Option<String>,
}

impl DatasetRecord for CanonicalListing {
    type Row = ListingRow;

    fn to_row(&self) -> ListingRow {
        ListingRow {
            id: Some(self.id.clone()),
            make: Some(self.make.clone()),
            model: Some(self.model.clone()),
            year: Some(self.year.to_string()),
            kilometers: number(self.kilometers),
            trim: Some(self.trim.clone()),
            regional_specs: Some(self.regional_specs.to_string()),
            price: number(self.price),
            seller_type: Some(self.seller_type.to_string()),
            posted_datetime: Some(String::from(self.posted_at)),
            source: Some(self.source.to_string()),
            permalink: Some(self.permalink.clone()),
            doors: self.doors.clone(),
            body_type: self.body_type.clone(),
            fuel_type: self.fuel_type.clone(),
            interior_color: self.interior_color.clone(),
            exterior_color: self.exterior_color.clone(),
            transmission_type: self.transmission_type.clone(),
            steering_side: self.steering_side.clone(),
            seating_capacity: self.seating_capacity.clone(),
        }
    }

    fn from_row(row: ListingRow) -> Result<Self, RowError> {
        // A malformed timestamp is not worth the row
        let posted_at = cell(&row.posted_datetime)
            .and_then(|v| PostedAt::try_from(v.to_string()).ok())
            .unwrap_or(PostedAt::Unknown);

        Ok(CanonicalListing {
            id: row_id(&row.id)?,
            make: required("Make", &row.make)?.to_string(),
            model: required("Model", &row.model)?.to_string(),
            year: coerce_year(&row.year)?,
            kilometers: coerce_number("Kilometers", &row.kilometers)?,
            trim: owned(&row.trim).unwrap_or_else(|| UNKNOWN.to_string()),
            regional_specs: regional_specs(&row.regional_specs),
            price: coerce_number("Price", &row.price)?,
            seller_type: cell(&row.seller_type)
                .and_then(SellerType::from_label)
                .unwrap_or(SellerType::Unknown),
            posted_at,
            source: source(&row.source)?,
            permalink: owned(&row.permalink).unwrap_or_default(),
            doors: owned(&row.doors),
            body_type: owned(&row.body_type),
            fuel_type: owned(&row.fuel_type),
            interior_color: owned(&row.interior_color),
            exterior_color: owned(&row.exterior_color),
            transmission_type: owned(&row.transmission_type),
            steering_side: owned(&row.steering_side),
            seating_capacity: owned(&row.seating_capacity),
        })
    }
}

/// `cars_predicted`: the listing columns plus the estimate and ratio
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PredictedRow {
    id: Option<String>,
    #[serde(rename = "Make")]
    make: Option<String>,
    #[serde(rename = "Model")]
    model: Option<String>,
    #[serde(rename = "Year")]
    year: Option<String>,
    #[serde(rename = "Kilometers")]
    kilometers: Option<String>,
    #[serde(rename = "Trim")]
    trim: Option<String>,
    #[serde(rename = "Regional Specs")]
    regional_specs: Option<String>,
    #[serde(rename = "Price")]
    price: Option<String>,
    #[serde(rename = "Seller Type")]
    seller_type: Option<String>,
    #[serde(rename = "Posted Datetime")]
    posted_datetime: Option<String>,
    #[serde(rename = "Source")]
    source: Option<String>,
    permalink: Option<String>,
    #[serde(rename = "No of Doors")]
    doors: Option<String>,
    #[serde(rename = "Body Type")]
    body_type: Option<String>,
    #[serde(rename = "Fuel Type")]
    fuel_type: Option<String>,
    #[serde(rename = "Interior Color")]
    interior_color: Option<String>,
    #[serde(rename = "Exterior Color")]
    exterior_color: Option<String>,
    #[serde(rename = "Transmission Type")]
    transmission_type: Option<String>,
    #[serde(rename = "Steering Side")]
    steering_side: Option<String>,
    #[serde(rename = "Seating Capacity")]
    seating_capacity: Option<String>,
    #[serde(rename = "Predicted_Price")]
    predicted_price: Option<String>,
    #[serde(rename = "price/expected_price")]
    price_ratio: Option<String>,
}

impl DatasetRecord for PredictedListing {
    type Row = PredictedRow;

    fn to_row(&self) -> PredictedRow {
        let listing = self.listing.to_row();
        PredictedRow {
            id: listing.id,
            make: listing.make,
            model: listing.model,
            year: listing.year,
            kilometers: listing.kilometers,
            trim: listing.trim,
            regional_specs: listing.regional_specs,
            price: listing.price,
            seller_type: listing.seller_type,
            posted_datetime: listing.posted_datetime,
            source: listing.source,
            permalink: listing.permalink,
            doors: listing.doors,
            body_type: listing.body_type,
            fuel_type: listing.fuel_type,
            interior_color: listing.interior_color,
            exterior_color: listing.exterior_color,
            transmission_type: listing.transmission_type,
            steering_side: listing.steering_side,
            seating_capacity: listing.seating_capacity,
            predicted_price: number(self.predicted_price),
            price_ratio: number(self.price_ratio),
        }
    }

    fn from_row(row: PredictedRow) -> Result<Self, RowError> {
        let predicted_price = coerce_signed("Predicted_Price", &row.predicted_price)?;
        let price_ratio = coerce_signed("price/expected_price", &row.price_ratio)?;
        let listing = CanonicalListing::from_row(ListingRow {
            id: row.id,
            make: row.make,
            model: row.model,
            year: row.year,
            kilometers: row.kilometers,
            trim: row.trim,
            regional_specs: row.regional_specs,
            price: row.price,
            seller_type: row.seller_type,
            posted_datetime: row.posted_datetime,
            source: row.source,
            permalink: row.permalink,
            doors: row.doors,
            body_type: row.body_type,
            fuel_type: row.fuel_type,
            interior_color: row.interior_color,
            exterior_color: row.exterior_color,
            transmission_type: row.transmission_type,
            steering_side: row.steering_side,
            seating_capacity: row.seating_capacity,
        })?;

        Ok(PredictedListing {
            listing,
            predicted_price,
            price_ratio,
        })
    }
}

/// `auction_sold_cars`; the score columns stay empty for uncovered lots
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AuctionRow {
    #[serde(rename = "Id")]
    id: Option<String>,
    #[serde(rename = "Make")]
    make: Option<String>,
    #[serde(rename = "Model")]
    model: Option<String>,
    #[serde(rename = "Year")]
    year: Option<String>,
    #[serde(rename = "Kilometers")]
    kilometers: Option<String>,
    #[serde(rename = "Regional Specs")]
    regional_specs: Option<String>,
    #[serde(rename = "Transmission")]
    transmission: Option<String>,
    #[serde(rename = "Body Type")]
    body_type: Option<String>,
    #[serde(rename = "Engine Type")]
    engine_type: Option<String>,
    #[serde(rename = "Cylinders")]
    cylinders: Option<String>,
    #[serde(rename = "Fuel Type")]
    fuel_type: Option<String>,
    #[serde(rename = "Interior Color")]
    interior_color: Option<String>,
    #[serde(rename = "Exterior Color")]
    exterior_color: Option<String>,
    #[serde(rename = "Seating Capacity")]
    seating_capacity: Option<String>,
    #[serde(rename = "No of Doors")]
    doors: Option<String>,
    #[serde(rename = "Primary Damage")]
    primary_damage: Option<String>,
    #[serde(rename = "Secondary Damage")]
    secondary_damage: Option<String>,
    #[serde(rename = "Auction Date")]
    auction_date: Option<String>,
    #[serde(rename = "Start Price")]
    start_price: Option<String>,
    #[serde(rename = "Final Price")]
    final_price: Option<String>,
    #[serde(rename = "Bid Difference")]
    bid_difference: Option<String>,
    #[serde(rename = "Bid Difference Percentage")]
    bid_difference_pct: Option<String>,
    #[serde(rename = "Participation Count")]
    participation_count: Option<String>,
    #[serde(rename = "Source")]
    source: Option<String>,
    #[serde(rename = "Min_Predicted_Price")]
    min_predicted: Option<String>,
    #[serde(rename = "Max_Predicted_Price")]
    max_predicted: Option<String>,
    #[serde(rename = "Predicted Price")]
    predicted: Option<String>,
    #[serde(rename = "Min_Final_Price_Predicted_Ratio")]
    min_ratio: Option<String>,
    #[serde(rename = "Max_Final_Price_Predicted_Ratio")]
    max_ratio: Option<String>,
    #[serde(rename = "Final Price Predicted Ratio")]
    ratio: Option<String>,
}

impl DatasetRecord for AuctionRecord {
    type Row = AuctionRow;

    fn to_row(&self) -> AuctionRow {
        let score = |f: fn(&AuctionScores) -> f64| self.scores.as_ref().map(|s| format_number(f(s)));

        AuctionRow {
            id: Some(self.id.clone()),
            make: Some(self.make.clone()),
            model: Some(self.model.clone()),
            year: Some(self.year.to_string()),
            kilometers: number(self.kilometers),
            regional_specs: Some(self.regional_specs.to_string()),
            transmission: self.transmission.clone(),
            body_type: self.body_type.clone(),
            engine_type: self.engine_type.clone(),
            cylinders: self.cylinders.clone(),
            fuel_type: self.fuel_type.clone(),
            interior_color: self.interior_color.clone(),
            exterior_color: self.exterior_color.clone(),
            seating_capacity: self.seating_capacity.clone(),
            doors: self.doors.clone(),
            primary_damage: self.primary_damage.clone(),
            secondary_damage: self.secondary_damage.clone(),
            auction_date: self.auction_date.clone(),
            start_price: number(self.start_price),
            final_price: number(self.final_price),
            bid_difference: number(self.bid_difference),
            bid_difference_pct: self.bid_difference_pct.map(format_number),
            participation_count: self.participation_count.clone(),
            source: Some(self.source.to_string()),
            min_predicted: score(|s| s.min_predicted),
            max_predicted: score(|s| s.max_predicted),
            predicted: score(|s| s.predicted),
            min_ratio: score(|s| s.min_ratio),
            max_ratio: score(|s| s.max_ratio),
            ratio: score(|s| s.ratio),
        }
    }

    fn from_row(row: AuctionRow) -> Result<Self, RowError> {
        let scores = match (
            optional_signed("Min_Predicted_Price", &row.min_predicted)?,
            optional_signed("Max_Predicted_Price", &row.max_predicted)?,
        ) {
            (Some(min_predicted), Some(max_predicted)) => Some(AuctionScores {
                min_predicted,
                max_predicted,
                predicted: coerce_signed("Predicted Price", &row.predicted)?,
                min_ratio: coerce_signed("Min_Final_Price_Predicted_Ratio", &row.min_ratio)?,
                max_ratio: coerce_signed("Max_Final_Price_Predicted_Ratio", &row.max_ratio)?,
                ratio: coerce_signed("Final Price Predicted Ratio", &row.ratio)?,
            }),
            _ => None,
        };
        let bid_difference_pct =
            optional_signed("Bid Difference Percentage", &row.bid_difference_pct)?;

        Ok(AuctionRecord {
            id: row_id(&row.id)?,
            make: required("Make", &row.make)?.to_string(),
            model: required("Model", &row.model)?.to_string(),
            year: coerce_year(&row.year)?,
            kilometers: coerce_number("Kilometers", &row.kilometers)?,
            regional_specs: regional_specs(&row.regional_specs),
            transmission: owned(&row.transmission),
            body_type: owned(&row.body_type),
            engine_type: owned(&row.engine_type),
            cylinders: owned(&row.cylinders),
            fuel_type: owned(&row.fuel_type),
            interior_color: owned(&row.interior_color),
            exterior_color: owned(&row.exterior_color),
            seating_capacity: owned(&row.seating_capacity),
            doors: owned(&row.doors),
            primary_damage: owned(&row.primary_damage),
            secondary_damage: owned(&row.secondary_damage),
            auction_date: owned(&row.auction_date),
            start_price: coerce_number("Start Price", &row.start_price)?,
            final_price: coerce_number("Final Price", &row.final_price)?,
            bid_difference: coerce_signed("Bid Difference", &row.bid_difference)?,
            bid_difference_pct,
            participation_count: owned(&row.participation_count),
            source: source(&row.source)?,
            scores,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::types::mock_listing;
    use crate::valuation::auction::tests::lot;

    fn write_rows<T: Serialize>(rows: &[T]) -> String {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in rows {
            writer.serialize(row).unwrap();
        }
        String::from_utf8(writer.into_inner().unwrap()).unwrap()
    }

    fn read_rows<T: DeserializeOwned>(text: &str) -> Vec<T> {
        csv::Reader::from_reader(text.as_bytes())
            .deserialize()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_listing_columns_and_cells() {
        let text = write_rows(&[mock_listing().to_row()]);
        let mut lines = text.lines();

        assert_eq!(
            lines.next().unwrap(),
            "id,Make,Model,Year,Kilometers,Trim,Regional Specs,Price,Seller Type,\
             Posted Datetime,Source,permalink,No of Doors,Body Type,Fuel Type,\
             Interior Color,Exterior Color,Transmission Type,Steering Side,Seating Capacity"
        );
        let cells: Vec<&str> = lines.next().unwrap().split(',').collect();
        assert_eq!(cells[4], "85000");
        assert_eq!(cells[9], "2024-05-01T10:30:00");
        // Absent attributes are empty cells
        assert_eq!(cells[15], "");
    }

    #[test]
    fn test_listing_survives_storage() {
        let text = write_rows(&[mock_listing().to_row()]);
        let rows: Vec<ListingRow> = read_rows(&text);
        let parsed = CanonicalListing::from_row(rows.into_iter().next().unwrap()).unwrap();
        assert_eq!(parsed, mock_listing());
    }

    #[test]
    fn test_listing_with_non_numeric_price_is_rejected() {
        let row = ListingRow {
            price: Some("call for price".to_string()),
            ..mock_listing().to_row()
        };
        let err = CanonicalListing::from_row(row).unwrap_err();
        assert!(matches!(err, RowError::InvalidNumber { field: "Price", .. }));
    }

    #[test]
    fn test_bad_timestamp_reads_as_unknown() {
        let row = ListingRow {
            posted_datetime: Some("yesterday".to_string()),
            ..mock_listing().to_row()
        };
        assert_eq!(CanonicalListing::from_row(row).unwrap().posted_at, PostedAt::Unknown);
    }

    #[test]
    fn test_predicted_columns_extend_listing() {
        let predicted = PredictedListing {
            listing: mock_listing(),
            predicted_price: 60_000.0,
            price_ratio: 55_000.0 / 60_000.0,
        };
        let text = write_rows(&[predicted.to_row()]);
        assert!(text
            .lines()
            .next()
            .unwrap()
            .ends_with("Seating Capacity,Predicted_Price,price/expected_price"));

        let rows: Vec<PredictedRow> = read_rows(&text);
        let parsed = PredictedListing::from_row(rows.into_iter().next().unwrap()).unwrap();
        assert_eq!(parsed, predicted);
    }

    #[test]
    fn test_auction_lot_with_loss_and_no_scores() {
        // Sold under the starting price
        let lot = lot("L1", "Toyota", "Camry", 15_000.0);
        let text = write_rows(&[lot.to_row()]);
        assert!(text.lines().nth(1).unwrap().ends_with("Marhaba Auctions,,,,,,"));

        let rows: Vec<AuctionRow> = read_rows(&text);
        let parsed = AuctionRecord::from_row(rows.into_iter().next().unwrap()).unwrap();
        assert_eq!(parsed.bid_difference, -5_000.0);
        assert_eq!(parsed, lot);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(160.0), "160");
        assert_eq!(format_number(0.5), "0.5");
    }
}
