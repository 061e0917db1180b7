//! Sold auction lots from Marhaba Auctions and Emirates Auction

use super::{cell, coerce_number, coerce_year, normalize_rows, owned, parse_plain_number, required, row_id, RowTally};
use crate::error::RowError;
use crate::ingestion::mappings::{EMIRATES_COUNTRY_SPECS, MAKE_ACRONYMS, MARHABA_SPECS};
use crate::ingestion::types::{AuctionRecord, RawData, Source};
use crate::ingestion::utils::{miles_to_km, parse_datetime_loose, parse_number, parse_python_literal, title_case};
use anyhow::Result;
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// Marhaba auction CSV row structure
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MarhabaRow {
    #[serde(rename = "_id")]
    pub id: Option<String>,
    pub make_title: Option<String>,
    pub model_title: Option<String>,
    pub year: Option<String>,
    pub odometer: Option<String>,
    pub odometer_type: Option<String>,
    pub bid_starting: Option<String>,
    /// Python literal of the winning bid; "[]" when the lot went unsold
    pub sold: Option<String>,
    pub body_type: Option<String>,
    pub primary_damage: Option<String>,
    pub secondary_damage: Option<String>,
    pub exterior_color: Option<String>,
    pub interior_color: Option<String>,
    pub transmission: Option<String>,
    pub specification: Option<String>,
    pub cylinders: Option<String>,
    pub participation_count: Option<String>,
    pub engine_type: Option<String>,
    pub fuel: Option<String>,
    pub auction_date: Option<String>,
}

/// Emirates Auction lot details, one row per lot
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct EmiratesLotRow {
    pub lot: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<String>,
    pub body_type: Option<String>,
    pub exterior: Option<String>,
    pub fuel_type: Option<String>,
    pub country_of_made: Option<String>,
    pub interior: Option<String>,
    pub seats: Option<String>,
    pub doors: Option<String>,
    pub transmission: Option<String>,
    pub odometer: Option<String>,
}

/// Emirates Auction price snapshot, many per lot
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct EmiratesSnapshotRow {
    pub lot: Option<String>,
    /// Unix seconds, possibly fractional
    pub updated_datetime: Option<String>,
    pub end_date: Option<String>,
    pub current_price: Option<String>,
    pub milage: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    lot: String,
    updated: f64,
    updated_on: NaiveDate,
    ends_on: NaiveDate,
    price: Option<String>,
    milage: Option<String>,
}

pub fn parse_marhaba_auctions(raw: &RawData) -> Result<Vec<AuctionRecord>> {
    normalize_rows(raw, "Marhaba Auctions", normalize_marhaba)
}

pub fn normalize_marhaba(row: MarhabaRow) -> Result<AuctionRecord, RowError> {
    let id = row_id(&row.id)?;

    let sold = cell(&row.sold)
        .filter(|s| *s != "[]")
        .ok_or(RowError::Filtered("lot went unsold"))?;
    let final_price = parse_python_literal(sold)
        .as_ref()
        .and_then(winning_bid)
        .ok_or_else(|| RowError::InvalidNumber {
            field: "Final Price",
            value: sold.to_string(),
        })?;

    let odometer = required("Kilometers", &row.odometer)?.replace(' ', "");
    let reading = parse_plain_number(&odometer).ok_or_else(|| RowError::InvalidNumber {
        field: "Kilometers",
        value: odometer.clone(),
    })?;
    let in_miles = cell(&row.odometer_type).is_some_and(|t| t.eq_ignore_ascii_case("Miles"));
    let kilometers = if in_miles { miles_to_km(reading) } else { reading };

    let start_price = coerce_number("Start Price", &row.bid_starting)?;
    let (bid_difference, bid_difference_pct) = bid_difference(start_price, final_price)?;

    Ok(AuctionRecord {
        id,
        make: title_case(required("Make", &row.make_title)?),
        model: title_case(required("Model", &row.model_title)?),
        year: coerce_year(&row.year)?,
        kilometers,
        regional_specs: MARHABA_SPECS.map(row.specification.as_deref()),
        transmission: cell(&row.transmission).map(|t| format!("{} Transmission", t)),
        body_type: cell(&row.body_type).map(title_case),
        engine_type: owned(&row.engine_type),
        cylinders: owned(&row.cylinders),
        fuel_type: cell(&row.fuel).map(|f| title_case(f).replace(" E/P", "")),
        interior_color: cell(&row.interior_color).map(auction_color),
        exterior_color: cell(&row.exterior_color).map(auction_color),
        seating_capacity: None,
        doors: None,
        primary_damage: owned(&row.primary_damage),
        secondary_damage: owned(&row.secondary_damage),
        auction_date: owned(&row.auction_date),
        start_price,
        final_price,
        bid_difference,
        bid_difference_pct,
        participation_count: owned(&row.participation_count),
        source: Source::MarhabaAuctions,
        scores: None,
    })
}

/// Winning bid from the `sold` payload: an object, or a list whose last entry won
fn winning_bid(sold: &Value) -> Option<f64> {
    let entry = match sold {
        Value::Array(entries) => entries.last()?,
        other => other,
    };
    match entry.get("bid_amount")? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_plain_number(s),
        _ => None,
    }
}

/// "BLACK AND WHITE" -> "Black & White"
fn auction_color(raw: &str) -> String {
    title_case(raw).replace(" And ", " & ")
}

/// Final minus start, and that difference as a percentage of the start price
/// rounded to two decimals. Lots without a positive start price are rejected.
pub fn bid_difference(start: f64, final_price: f64) -> Result<(f64, Option<f64>), RowError> {
    if start <= 0.0 {
        return Err(RowError::Filtered("start price not positive"));
    }
    let difference = final_price - start;
    let pct = (difference / start * 100.0 * 100.0).round() / 100.0;
    Ok((difference, Some(pct).filter(|p| p.is_finite())))
}

/// Join lot details with price snapshots.
///
/// The final price is the last snapshot of a lot taken on its end date; the
/// start price is its first snapshot taken before the end date. Lots missing
/// either are skipped.
pub fn parse_emirates_auction(details: &RawData, snapshots: &RawData) -> Result<Vec<AuctionRecord>> {
    let lots = normalize_rows(details, "Emirates Auction lots", |row: EmiratesLotRow| {
        let lot = row_id(&row.lot)?;
        required("Odometer", &row.odometer)?;
        Ok((lot, row))
    })?;
    let lots: HashMap<String, EmiratesLotRow> = lots.into_iter().collect();

    let mut snapshots = normalize_rows(snapshots, "Emirates Auction prices", normalize_snapshot)?;
    snapshots.sort_by(|a, b| a.updated.total_cmp(&b.updated));

    // First and last snapshot position per lot, in time order
    let mut bounds: HashMap<&str, (usize, usize)> = HashMap::new();
    for (idx, snap) in snapshots.iter().enumerate() {
        bounds
            .entry(snap.lot.as_str())
            .and_modify(|(_, last)| *last = idx)
            .or_insert((idx, idx));
    }
    let mut ordered: Vec<(usize, usize)> = bounds.into_values().collect();
    ordered.sort_by_key(|(_, last)| *last);

    let mut records = Vec::new();
    let mut tally = RowTally::new("Emirates Auction");
    for (first, last) in ordered {
        let start = &snapshots[first];
        let end = &snapshots[last];
        match assemble_emirates_lot(start, end, lots.get(&end.lot)) {
            Ok(record) => records.push(record),
            Err(e) => tally.reject(last, &e),
        }
    }
    tally.finish(records.len());

    Ok(records)
}

fn normalize_snapshot(row: EmiratesSnapshotRow) -> Result<Snapshot, RowError> {
    let lot = row_id(&row.lot)?;
    let raw_updated = required("UpdatedDatetime", &row.updated_datetime)?;
    let updated = raw_updated
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| RowError::InvalidNumber {
            field: "UpdatedDatetime",
            value: raw_updated.to_string(),
        })?;
    let updated_on = DateTime::from_timestamp(updated as i64, 0)
        .map(|dt| dt.date_naive())
        .ok_or_else(|| RowError::InvalidNumber {
            field: "UpdatedDatetime",
            value: raw_updated.to_string(),
        })?;
    let ends_on = parse_datetime_loose(required("EndDate", &row.end_date)?)
        .map(|dt| dt.date())
        .ok_or(RowError::MissingField("EndDate"))?;

    Ok(Snapshot {
        lot,
        updated,
        updated_on,
        ends_on,
        price: owned(&row.current_price),
        milage: owned(&row.milage),
    })
}

fn assemble_emirates_lot(
    start: &Snapshot,
    end: &Snapshot,
    details: Option<&EmiratesLotRow>,
) -> Result<AuctionRecord, RowError> {
    if end.updated_on != end.ends_on {
        return Err(RowError::Filtered("no snapshot on the end date"));
    }
    if start.updated_on == start.ends_on {
        return Err(RowError::Filtered("no snapshot before the end date"));
    }
    if start.milage.is_none() {
        return Err(RowError::MissingField("Milage"));
    }
    let details = details.ok_or(RowError::MissingField("Make"))?;

    let milage = required("Kilometers", &end.milage)?;
    let kilometers = parse_number(milage).ok_or_else(|| RowError::InvalidNumber {
        field: "Kilometers",
        value: milage.to_string(),
    })?;
    let start_price = coerce_number("Start Price", &start.price)?;
    let final_price = coerce_number("Final Price", &end.price)?;
    let (bid_difference, bid_difference_pct) = bid_difference(start_price, final_price)?;

    let make = title_case(required("Make", &details.make)?);

    Ok(AuctionRecord {
        id: end.lot.clone(),
        make: MAKE_ACRONYMS.apply(&make),
        model: required("Model", &details.model)?.to_string(),
        year: coerce_year(&details.year)?,
        kilometers,
        regional_specs: EMIRATES_COUNTRY_SPECS.map(details.country_of_made.as_deref()),
        transmission: cell(&details.transmission).map(|t| format!("{} Transmission", t)),
        body_type: owned(&details.body_type),
        engine_type: None,
        cylinders: None,
        fuel_type: owned(&details.fuel_type),
        interior_color: owned(&details.interior),
        exterior_color: owned(&details.exterior),
        seating_capacity: owned(&details.seats),
        doors: owned(&details.doors),
        primary_damage: None,
        secondary_damage: None,
        auction_date: Some(end.ends_on.format("%Y-%m-%d").to_string()),
        start_price,
        final_price,
        bid_difference,
        bid_difference_pct,
        participation_count: None,
        source: Source::EmiratesAuction,
        scores: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::types::RegionalSpecs;

    const MARHABA_HEADER: &str = "_id,make_title,model_title,year,odometer,odometer_type,bid_starting,sold,body_type,primary_damage,secondary_damage,exterior_color,interior_color,transmission,specification,cylinders,participation_count,engine_type,fuel,auction_date";

    #[test]
    fn test_parse_marhaba_sold_lots() {
        let raw = RawData::Csv(format!(
            "{}\n\
             M1,NISSAN,SUNNY,2018,\"10 000\",Miles,10000,\"{{'bid_amount': 12500, 'bidder': None}}\",sedan,Front End,,BLACK AND WHITE,GREY,Automatic,gcc,4,7,1.5L,PETROL E/P,2024-05-01\n\
             M2,NISSAN,SUNNY,2018,20000,KM,10000,[],sedan,,,WHITE,GREY,Automatic,gcc,4,0,1.5L,PETROL,2024-05-01\n\
             M3,NISSAN,SUNNY,2018,UNKNOWN,KM,10000,\"{{'bid_amount': 9000}}\",sedan,,,WHITE,GREY,Automatic,gcc,4,2,1.5L,PETROL,2024-05-01\n",
            MARHABA_HEADER
        ));

        let records = parse_marhaba_auctions(&raw).unwrap();
        assert_eq!(records.len(), 1);

        let lot = &records[0];
        assert_eq!(lot.make, "Nissan");
        assert_eq!(lot.kilometers, 16_000.0);
        assert_eq!(lot.final_price, 12_500.0);
        assert_eq!(lot.bid_difference, 2_500.0);
        assert_eq!(lot.bid_difference_pct, Some(25.0));
        assert_eq!(lot.regional_specs, RegionalSpecs::Gcc);
        assert_eq!(lot.exterior_color.as_deref(), Some("Black & White"));
        assert_eq!(lot.fuel_type.as_deref(), Some("Petrol"));
        assert_eq!(lot.transmission.as_deref(), Some("Automatic Transmission"));
        assert_eq!(lot.source, Source::MarhabaAuctions);
    }

    #[test]
    fn test_bid_difference_rounding() {
        assert_eq!(bid_difference(3000.0, 4000.0), Ok((1000.0, Some(33.33))));
        assert_eq!(
            bid_difference(0.0, 4000.0),
            Err(RowError::Filtered("start price not positive"))
        );
    }

    #[test]
    fn test_parse_emirates_auction() {
        let details = RawData::Csv(
            "Lot,Make,Model,Year,BodyType,Exterior,FuelType,CountryOfMade,Interior,Seats,Doors,Transmission,Odometer\n\
             L1,BMW,X5,2019,SUV,White,Petrol,Germany,Black,5,5,Automatic,45000\n\
             L2,MG,ZS,2022,SUV,Red,Petrol,China mainland,Black,5,5,Automatic,12000\n"
                .to_string(),
        );
        // 1714521600 = 2024-05-01 00:00:00 UTC, 1714608000 = 2024-05-02
        let snapshots = RawData::Csv(
            "Lot,UpdatedDatetime,EndDate,CurrentPrice,Milage\n\
             L1,1714608000.0,2024-05-02,52000,45000\n\
             L1,1714521600.0,2024-05-02,40000,45000\n\
             L1,1714611600.0,2024-05-02,55000,45000\n\
             L2,1714521600.0,2024-05-01,30000,12000\n"
                .to_string(),
        );

        let records = parse_emirates_auction(&details, &snapshots).unwrap();
        assert_eq!(records.len(), 1);

        let lot = &records[0];
        assert_eq!(lot.id, "L1");
        assert_eq!(lot.make, "BMW");
        assert_eq!(lot.start_price, 40_000.0);
        assert_eq!(lot.final_price, 55_000.0);
        assert_eq!(lot.bid_difference_pct, Some(37.5));
        assert_eq!(lot.regional_specs, RegionalSpecs::European);
        assert_eq!(lot.auction_date.as_deref(), Some("2024-05-02"));
        assert_eq!(lot.source, Source::EmiratesAuction);
    }
}
