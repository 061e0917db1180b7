//! Stage orchestration - fetch, parse, merge, enrich and write each dataset
//!
//! Every stage builds its whole table in memory before the single write at
//! the end, so a failing stage leaves the previous dataset file untouched.

use crate::config::Config;
use crate::ingestion::enrich::predict_listings;
use crate::ingestion::merge::{keep_last, merge_tables};
use crate::ingestion::parse::{self, KnownModels, TelegramWindow};
use crate::ingestion::types::{
    AuctionRecord, CanonicalListing, IngestStats, PredictedListing, Source,
};
use crate::ingestion::write::{Dataset, DatasetStore};
use crate::ingestion::fetch;
use crate::valuation::auction::score_auctions;
use crate::valuation::{ModelHandle, ReferenceVocabulary, ValuationEngine};
use anyhow::{bail, Context, Result};
use chrono::{Datelike, NaiveDateTime, Utc};
use std::path::PathBuf;
use tracing::{error, info};

/// Refresh stages in dependency order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    SoldOut,
    ForSale,
    Auction,
    Predicted,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::SoldOut, Stage::ForSale, Stage::Auction, Stage::Predicted];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::SoldOut => "sold_out",
            Stage::ForSale => "for_sale",
            Stage::Auction => "auction",
            Stage::Predicted => "predicted",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Stage::ALL.into_iter().find(|s| s.name() == name.trim())
    }

    pub fn dataset(&self) -> Dataset {
        match self {
            Stage::SoldOut => Dataset::CarsSoldOut,
            Stage::ForSale => Dataset::CarsForSale,
            Stage::Auction => Dataset::AuctionSoldCars,
            Stage::Predicted => Dataset::CarsPredicted,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

pub struct Pipeline {
    data_dir: PathBuf,
    model_path: PathBuf,
    source_order: Vec<Source>,
    recency_window_days: i64,
    store: DatasetStore,
    now: NaiveDateTime,
}

impl Pipeline {
    pub fn new(config: &Config) -> Self {
        Self {
            data_dir: config.data_dir.clone(),
            model_path: config.model_path.clone(),
            source_order: config.source_order.clone(),
            recency_window_days: config.recency_window_days,
            store: DatasetStore::new(&config.data_dir),
            now: Utc::now().naive_utc(),
        }
    }

    /// Pin the clock used for the Telegram window and model ages
    pub fn with_clock(mut self, now: NaiveDateTime) -> Self {
        self.now = now;
        self
    }

    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    fn parse_source(&self, source: Source, known: &KnownModels) -> Result<Vec<CanonicalListing>> {
        let dir = &self.data_dir;
        match source {
            Source::Dubizzle => parse::parse_dubizzle(&fetch::fetch_dubizzle_for_sale(dir)?),
            Source::Dubicars => parse::parse_dubicars(&fetch::fetch_dubicars(dir)?),
            Source::Carswitch => parse::parse_carswitch(&fetch::fetch_carswitch(dir)?),
            Source::Cars24 => parse::parse_cars24(&fetch::fetch_cars24(dir)?),
            Source::Telegram => {
                let (listings, chats) = fetch::fetch_telegram(dir)?;
                let window = TelegramWindow {
                    now: self.now,
                    days: self.recency_window_days,
                };
                parse::parse_telegram(&listings, &chats, known, window)
            }
            Source::MarhabaAuctions | Source::EmiratesAuction => {
                bail!("{} is an auction source", source)
            }
        }
    }

    /// Concatenate the for-sale sources in the configured order, keep last per id.
    /// Telegram only admits makes and models seen in the sources before it.
    pub fn build_cars_for_sale(&self) -> Result<(Vec<CanonicalListing>, IngestStats)> {
        let mut tables = Vec::with_capacity(self.source_order.len());
        let mut seen: Vec<CanonicalListing> = Vec::new();

        for source in &self.source_order {
            let known = KnownModels::from_listings(&seen);
            let table = self
                .parse_source(*source, &known)
                .with_context(|| format!("Failed to ingest {}", source))?;
            info!("{}: {} listings", source, table.len());
            seen.extend(table.iter().cloned());
            tables.push(table);
        }

        Ok(merge_tables(tables))
    }

    pub fn build_cars_sold_out(&self) -> Result<(Vec<CanonicalListing>, IngestStats)> {
        let raw = fetch::fetch_dubizzle_sold_out(&self.data_dir)?;
        let rows = parse::parse_dubizzle(std::slice::from_ref(&raw))?;
        let read = rows.len();
        let (kept, duplicates) = keep_last(rows);
        let stats = IngestStats {
            read,
            kept: kept.len(),
            dropped: 0,
            duplicates,
        };
        Ok((kept, stats))
    }

    /// Model-backed engine over the persisted sold-out vocabulary
    pub fn engine(&self) -> Result<ValuationEngine> {
        let sold_out: Vec<CanonicalListing> = self
            .store
            .read(Dataset::CarsSoldOut)
            .context("Sold-out dataset is required for valuation")?;
        Ok(ValuationEngine::new(
            ModelHandle::new(&self.model_path),
            ReferenceVocabulary::from_sold_out(&sold_out),
        )
        .with_year(self.now.year()))
    }

    pub fn build_auction_sold_cars(
        &self,
        engine: &ValuationEngine,
    ) -> Result<(Vec<AuctionRecord>, IngestStats)> {
        let marhaba = parse::parse_marhaba_auctions(&fetch::fetch_marhaba(&self.data_dir)?)?;
        let (details, snapshots) = fetch::fetch_emirates(&self.data_dir)?;
        let emirates = parse::parse_emirates_auction(&details, &snapshots)?;

        let (records, stats) = merge_tables(vec![marhaba, emirates]);
        let (scored, _) = score_auctions(engine, records)?;
        Ok((scored, stats))
    }

    pub fn build_cars_predicted(
        &self,
        engine: &ValuationEngine,
    ) -> Result<(Vec<PredictedListing>, IngestStats)> {
        let for_sale: Vec<CanonicalListing> = self.store.read(Dataset::CarsForSale)?;
        let read = for_sale.len();
        let (predicted, scores) = predict_listings(engine, for_sale)?;
        let stats = IngestStats {
            read,
            kept: predicted.len(),
            dropped: scores.uncovered + scores.failed,
            duplicates: 0,
        };
        Ok((predicted, stats))
    }

    /// Build one stage and fully replace its dataset
    pub fn run(&self, stage: Stage) -> Result<IngestStats> {
        info!("=== {} Pipeline ===", stage.dataset());

        info!("Step 1/2: Building {}...", stage.dataset());
        let stats = match stage {
            Stage::SoldOut => {
                let (rows, stats) = self.build_cars_sold_out()?;
                info!("Step 2/2: Writing {}...", stage.dataset());
                self.store.write(Dataset::CarsSoldOut, &rows)?;
                stats
            }
            Stage::ForSale => {
                let (rows, stats) = self.build_cars_for_sale()?;
                info!("Step 2/2: Writing {}...", stage.dataset());
                self.store.write(Dataset::CarsForSale, &rows)?;
                stats
            }
            Stage::Auction => {
                let engine = self.engine()?;
                let (rows, stats) = self.build_auction_sold_cars(&engine)?;
                info!("Step 2/2: Writing {}...", stage.dataset());
                self.store.write(Dataset::AuctionSoldCars, &rows)?;
                stats
            }
            Stage::Predicted => {
                let engine = self.engine()?;
                let (rows, stats) = self.build_cars_predicted(&engine)?;
                info!("Step 2/2: Writing {}...", stage.dataset());
                self.store.write(Dataset::CarsPredicted, &rows)?;
                stats
            }
        };
        Ok(stats)
    }

    /// Run stages in order, continuing past failures; returns how many failed
    pub fn run_stages(&self, stages: &[Stage]) -> usize {
        let mut failures = 0;
        for &stage in stages {
            info!("Running ingestion for: {}", stage);

            match self.run(stage) {
                Ok(stats) => {
                    info!("✓ {} completed: {}", stage, stats);
                }
                Err(e) => {
                    failures += 1;
                    error!("✗ {} failed: {:#}", stage, e);
                }
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::fetch::*;
    use chrono::NaiveDate;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    const DUBIZZLE_HEADER: &str = "id,Make,Model,Year,Kilometers,Trim,Regional Specs,Price,Seller Type,added,permalink,Doors,Body Type,Fuel Type,Interior Color,Exterior Color,Transmission Type,Steering Side,Seating Capacity";

    const MODEL_JSON: &str = r#"{
        "features": ["Age", "Kilometers", "Make", "Model", "Trim", "Regional Specs", "Age_Kilometers", "Kilometers_per_Year"],
        "intercept": 80000,
        "numeric": {"Age": -4000, "Kilometers": -0.1},
        "categorical": {"Trim": {"SE": 2000, "LE": -1000}}
    }"#;

    fn write_sources(dir: &Path) {
        let files = [
            (
                DUBIZZLE_FOR_SALE,
                format!(
                    "{}\n\
                     Z1,Toyota,Camry,2019,85000,SE,GCC Specs,55000,Dealer,1714559400,https://dubizzle.com/z1,4 doors,Sedan,Gasoline,Beige,White,Automatic Transmission,Left Hand,5 Seater\n\
                     Z2,Nissan,Patrol,2020,60000,LE,GCC Specs,150000,Owner,1714559400,https://dubizzle.com/z2,5 doors,SUV,Petrol,Black,Black,Automatic Transmission,Left Hand,7 Seater\n",
                    DUBIZZLE_HEADER
                ),
            ),
            (
                DUBIZZLE_ON_SALE,
                format!(
                    "{}\n\
                     Z1,Toyota,Camry,2019,85000,SE,GCC Specs,52000,Dealer,1714559400,https://dubizzle.com/z1,4 doors,Sedan,Petrol,Beige,White,Automatic Transmission,Left Hand,5 Seater\n",
                    DUBIZZLE_HEADER
                ),
            ),
            (
                DUBIZZLE_SOLD_OUT,
                format!(
                    "{}\n\
                     S1,Toyota,Camry,2018,90000,SE,GCC Specs,50000,Dealer,1714559400,https://dubizzle.com/s1,4 doors,Sedan,Petrol,,White,Automatic Transmission,Left Hand,5 Seater\n\
                     S2,Toyota,Camry,2018,95000,LE,GCC Specs,45000,Owner,1714559400,https://dubizzle.com/s2,4 doors,Sedan,Petrol,,White,Automatic Transmission,Left Hand,5 Seater\n\
                     S3,Nissan,Patrol,2017,120000,LE,GCC Specs,110000,Dealer,1714559400,https://dubizzle.com/s3,5 doors,SUV,Petrol,,Black,Automatic Transmission,Left Hand,7 Seater\n",
                    DUBIZZLE_HEADER
                ),
            ),
            (
                CARS24_FOR_SALE,
                "appointmentId,make,model,year,odometerReading,specs,price,url,carExteriorColor,transmissionType,fuelType,variant,assortmentCategory\n\
                 C1,toyota,camry,2021,30000,GCC,70000,https://cars24.ae/c1,Other,Automatic,Petrol,,PRIME\n"
                    .to_string(),
            ),
            (
                TELEGRAM_CHATS,
                "id,chat_username\nT1,uae_cars\nT2,uae_cars\n".to_string(),
            ),
            (
                TELEGRAM_LISTINGS,
                "Id,Make,Model,Year,Mileage,RegionalSpecs,Price,Date,SellorBuy\n\
                 T1,Toyota,Camry,2020,70000,GCC,60000,2024-05-20 09:00:00,Sell\n\
                 T2,Tesla,Model 3,2021,30000,GCC,120000,2024-05-20 09:00:00,Sell\n"
                    .to_string(),
            ),
        ];
        for (name, body) in files {
            fs::write(dir.join(name), body).unwrap();
        }
    }

    fn config(dir: &Path, order: &str) -> Config {
        let dir = dir.to_path_buf();
        let order = order.to_string();
        Config::from_lookup(move |key| match key {
            "DATA_DIR" => Some(dir.display().to_string()),
            "MODEL_PATH" => Some(dir.join("model.json").display().to_string()),
            "SOURCE_ORDER" => Some(order.clone()),
            _ => None,
        })
        .unwrap()
    }

    fn clock() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_for_sale_merges_in_source_order() {
        let temp = tempdir().unwrap();
        write_sources(temp.path());
        let pipeline = Pipeline::new(&config(temp.path(), "dubizzle,cars24,telegram"))
            .with_clock(clock());

        let (rows, stats) = pipeline.build_cars_for_sale().unwrap();

        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["Z2", "Z1", "C1", "T1"]);
        // on-sale export overrides the for-sale row
        assert_eq!(rows[1].price, 52_000.0);
        assert_eq!(stats.duplicates, 1);
    }

    #[test]
    fn test_telegram_first_admits_nothing() {
        let temp = tempdir().unwrap();
        write_sources(temp.path());
        let pipeline =
            Pipeline::new(&config(temp.path(), "telegram,dubizzle")).with_clock(clock());

        let (rows, _) = pipeline.build_cars_for_sale().unwrap();
        assert!(rows.iter().all(|r| r.source != Source::Telegram));
    }

    #[test]
    fn test_missing_source_leaves_previous_output() {
        let temp = tempdir().unwrap();
        write_sources(temp.path());
        let pipeline =
            Pipeline::new(&config(temp.path(), "dubizzle,cars24")).with_clock(clock());
        pipeline.run(Stage::ForSale).unwrap();
        let before = fs::read(pipeline.store().path(Dataset::CarsForSale)).unwrap();

        fs::remove_file(temp.path().join(CARS24_FOR_SALE)).unwrap();
        assert!(pipeline.run(Stage::ForSale).is_err());

        let after = fs::read(pipeline.store().path(Dataset::CarsForSale)).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_regeneration_is_byte_identical() {
        let temp = tempdir().unwrap();
        write_sources(temp.path());
        fs::write(temp.path().join("model.json"), MODEL_JSON).unwrap();
        let pipeline = Pipeline::new(&config(temp.path(), "dubizzle,cars24,telegram"))
            .with_clock(clock());

        let mut first = Vec::new();
        for stage in [Stage::SoldOut, Stage::ForSale, Stage::Predicted] {
            pipeline.run(stage).unwrap();
            first.push(fs::read(pipeline.store().path(stage.dataset())).unwrap());
        }
        let mut second = Vec::new();
        for stage in [Stage::SoldOut, Stage::ForSale, Stage::Predicted] {
            pipeline.run(stage).unwrap();
            second.push(fs::read(pipeline.store().path(stage.dataset())).unwrap());
        }

        assert_eq!(first, second);
    }

    #[test]
    fn test_predicted_stage() {
        let temp = tempdir().unwrap();
        write_sources(temp.path());
        fs::write(temp.path().join("model.json"), MODEL_JSON).unwrap();
        let pipeline = Pipeline::new(&config(temp.path(), "dubizzle,cars24,telegram"))
            .with_clock(clock());
        pipeline.run(Stage::SoldOut).unwrap();
        pipeline.run(Stage::ForSale).unwrap();

        let stats = pipeline.run(Stage::Predicted).unwrap();
        let rows: Vec<PredictedListing> = pipeline.store().read(Dataset::CarsPredicted).unwrap();

        assert_eq!(stats.read, 4);
        assert_eq!(rows.len(), 4);
        let z1 = rows.iter().find(|r| r.listing.id == "Z1").unwrap();
        // 80000 - 5*4000 - 8500 + 2000
        assert_eq!(z1.predicted_price, 53_500.0);
    }

    #[test]
    fn test_predicted_stage_without_model_fails() {
        let temp = tempdir().unwrap();
        write_sources(temp.path());
        let pipeline =
            Pipeline::new(&config(temp.path(), "dubizzle")).with_clock(clock());
        pipeline.run(Stage::SoldOut).unwrap();
        pipeline.run(Stage::ForSale).unwrap();

        assert!(pipeline.run(Stage::Predicted).is_err());
        assert!(!pipeline.store().path(Dataset::CarsPredicted).exists());
    }

    #[test]
    fn test_failed_stages_are_counted() {
        let temp = tempdir().unwrap();
        write_sources(temp.path());
        let pipeline =
            Pipeline::new(&config(temp.path(), "dubizzle")).with_clock(clock());

        // No model file, so only the predicted stage fails
        let failures = pipeline.run_stages(&[Stage::SoldOut, Stage::ForSale, Stage::Predicted]);
        assert_eq!(failures, 1);
        assert!(pipeline.store().path(Dataset::CarsForSale).exists());
        assert_eq!(pipeline.run_stages(&[]), 0);
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::from_name("auction"), Some(Stage::Auction));
        assert_eq!(Stage::Predicted.dataset(), Dataset::CarsPredicted);
        assert_eq!(Stage::from_name("nsw_sales"), None);
    }
}
