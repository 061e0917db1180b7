//! Fetch functions - locate raw source exports in the data directory
//!
//! Scrapers drop their CSV exports into `DATA_DIR`; a missing export aborts
//! that source's stage rather than producing a partial dataset.

use crate::ingestion::types::RawData;
use anyhow::{bail, Result};
use std::path::Path;
use tracing::info;

pub const DUBIZZLE_FOR_SALE: &str = "dubizzle_cars_for_sale.csv";
pub const DUBIZZLE_ON_SALE: &str = "dubizzle_cars_on_sale.csv";
pub const DUBIZZLE_SOLD_OUT: &str = "dubizzle_cars_sold_out.csv";
pub const DUBICARS_FOR_SALE: &str = "dubicars_for_sale.csv";
pub const CARSWITCH_FOR_SALE: &str = "carswitch_cars_for_sale.csv";
pub const CARS24_FOR_SALE: &str = "cars24_cars_for_sale.csv";
pub const TELEGRAM_CHATS: &str = "telegram.csv";
pub const TELEGRAM_LISTINGS: &str = "telegram_cars_gemini.csv";
pub const MARHABA_LOTS: &str = "marhaba_auctions_cars_details.csv";
pub const EMIRATES_LOTS: &str = "emirates_auction_cars_details.csv";
pub const EMIRATES_SNAPSHOTS: &str = "emirates_auction_cars.csv";

/// Resolve one raw export
pub fn locate(data_dir: &Path, file_name: &str) -> Result<RawData> {
    let path = data_dir.join(file_name);
    if !path.is_file() {
        bail!("Source file not found: {}", path.display());
    }
    info!("Found source file {:?}", path);
    Ok(RawData::File(path))
}

/// Dubizzle for-sale exports, in keep-last order
pub fn fetch_dubizzle_for_sale(data_dir: &Path) -> Result<Vec<RawData>> {
    Ok(vec![
        locate(data_dir, DUBIZZLE_FOR_SALE)?,
        locate(data_dir, DUBIZZLE_ON_SALE)?,
    ])
}

pub fn fetch_dubizzle_sold_out(data_dir: &Path) -> Result<RawData> {
    locate(data_dir, DUBIZZLE_SOLD_OUT)
}

pub fn fetch_dubicars(data_dir: &Path) -> Result<RawData> {
    locate(data_dir, DUBICARS_FOR_SALE)
}

pub fn fetch_carswitch(data_dir: &Path) -> Result<RawData> {
    locate(data_dir, CARSWITCH_FOR_SALE)
}

pub fn fetch_cars24(data_dir: &Path) -> Result<RawData> {
    locate(data_dir, CARS24_FOR_SALE)
}

/// Extracted listings and the chat metadata they join against
pub fn fetch_telegram(data_dir: &Path) -> Result<(RawData, RawData)> {
    Ok((
        locate(data_dir, TELEGRAM_LISTINGS)?,
        locate(data_dir, TELEGRAM_CHATS)?,
    ))
}

pub fn fetch_marhaba(data_dir: &Path) -> Result<RawData> {
    locate(data_dir, MARHABA_LOTS)
}

/// Lot details and price snapshots
pub fn fetch_emirates(data_dir: &Path) -> Result<(RawData, RawData)> {
    Ok((
        locate(data_dir, EMIRATES_LOTS)?,
        locate(data_dir, EMIRATES_SNAPSHOTS)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_locate_existing_file() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join(CARS24_FOR_SALE), "appointmentId\n").unwrap();

        let raw = fetch_cars24(temp.path()).unwrap();
        match raw {
            RawData::File(path) => assert!(path.ends_with(CARS24_FOR_SALE)),
            _ => panic!("Expected File variant"),
        }
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join(DUBIZZLE_FOR_SALE), "id\n").unwrap();

        let err = fetch_dubizzle_for_sale(temp.path()).unwrap_err();
        assert!(err.to_string().contains(DUBIZZLE_ON_SALE));
    }
}
