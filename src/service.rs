//! Query interface consumed by the presentation layer
//!
//! Datasets are read per request so an hourly refresh is picked up without a
//! restart. The reference vocabulary is fixed when the service opens.

use crate::config::Config;
use crate::error::ValuationResult;
use crate::ingestion::types::{AuctionRecord, CanonicalListing, PredictedListing};
use crate::ingestion::write::{Dataset, DatasetStore};
use crate::valuation::comparables::{list_comparables, Comparables};
use crate::valuation::evaluate::{evaluate, EvaluationOptions, EvaluationReport};
use crate::valuation::format::{display, DisplayPrice};
use crate::valuation::insights::{
    auction_insights, market_insights, AuctionInsights, InsightScope, MarketInsights,
};
use crate::valuation::undervalued::{list_undervalued, UndervaluedListing};
use crate::valuation::vocabulary::{year_range, MakeRules, ReferenceOptions};
use crate::valuation::{
    ModelHandle, PredictionResult, ReferenceVocabulary, ValuationEngine, ValuationQuery,
    VehicleSpec,
};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// A valuation together with the coerced query it was computed for
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Valuation {
    pub query: VehicleSpec,
    pub prediction: PredictionResult,
    pub display: DisplayPrice,
}

pub struct MarketService {
    store: DatasetStore,
    engine: ValuationEngine,
    currency: String,
}

impl MarketService {
    pub fn new(store: DatasetStore, engine: ValuationEngine, currency: impl Into<String>) -> Self {
        Self {
            store,
            engine,
            currency: currency.into(),
        }
    }

    /// Read the sold-out vocabulary and prepare a lazily loaded model.
    /// A broken model file does not fail here; valuations report it per request.
    pub fn open(config: &Config) -> Result<Self> {
        let store = DatasetStore::new(&config.data_dir);
        let sold_out: Vec<CanonicalListing> = store
            .read(Dataset::CarsSoldOut)
            .context("Sold-out dataset is required for the reference vocabulary")?;
        info!("Loaded {} sold-out rows for reference", sold_out.len());

        let engine = ValuationEngine::new(
            ModelHandle::new(&config.model_path),
            ReferenceVocabulary::from_sold_out(&sold_out),
        );
        Ok(Self::new(store, engine, config.currency.clone()))
    }

    pub fn valuate(&self, query: &ValuationQuery) -> ValuationResult<Valuation> {
        let spec = self.engine.resolve(query)?;
        let prediction = self.engine.valuate_resolved(&spec)?;
        Ok(Valuation {
            display: display(&self.currency, &prediction),
            query: spec,
            prediction,
        })
    }

    pub fn list_comparables(&self, make: &str, model: &str, year: i32) -> Result<Comparables> {
        let active: Vec<CanonicalListing> = self.store.read(Dataset::CarsForSale)?;
        let sold_out: Vec<CanonicalListing> = self.store.read(Dataset::CarsSoldOut)?;
        Ok(list_comparables(&active, &sold_out, make, model, year))
    }

    pub fn list_undervalued(&self) -> Result<Vec<UndervaluedListing>> {
        let predicted: Vec<PredictedListing> = self.store.read(Dataset::CarsPredicted)?;
        Ok(list_undervalued(&predicted))
    }

    /// Active listings with a real price
    pub fn list_cars_for_sale(&self) -> Result<Vec<CanonicalListing>> {
        let rows: Vec<CanonicalListing> = self.store.read(Dataset::CarsForSale)?;
        Ok(rows.into_iter().filter(|r| r.price > 0.0).collect())
    }

    pub fn list_auction_cars(&self) -> Result<Vec<AuctionRecord>> {
        let rows: Vec<AuctionRecord> = self.store.read(Dataset::AuctionSoldCars)?;
        Ok(rows.into_iter().filter(|r| r.start_price > 0.0).collect())
    }

    pub fn market_insights(&self, scope: InsightScope) -> Result<MarketInsights> {
        let dataset = match scope {
            InsightScope::ForSale => Dataset::CarsForSale,
            InsightScope::SoldOut => Dataset::CarsSoldOut,
        };
        let rows: Vec<CanonicalListing> = self.store.read(dataset)?;
        Ok(market_insights(&rows, scope, self.engine.year()))
    }

    pub fn auction_insights(&self) -> Result<AuctionInsights> {
        let rows = self.list_auction_cars()?;
        Ok(auction_insights(&rows, &self.currency))
    }

    pub fn evaluate_model(&self, options: EvaluationOptions) -> Result<EvaluationReport> {
        let sold_out: Vec<CanonicalListing> = self.store.read(Dataset::CarsSoldOut)?;
        Ok(evaluate(&self.engine, &sold_out, options)?)
    }

    pub fn options(&self) -> ReferenceOptions {
        self.engine.vocabulary().options()
    }

    pub fn filtering_rules(&self) -> BTreeMap<String, MakeRules> {
        self.engine.vocabulary().filtering_rules()
    }

    pub fn years(&self) -> Vec<i32> {
        year_range(self.engine.year())
    }
}
