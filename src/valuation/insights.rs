//! Market and auction insights over the canonical tables

use crate::ingestion::types::{AuctionRecord, CanonicalListing, SellerType};
use crate::valuation::stats::{describe, top_counts, top_means, Describe, LabelCount, LabelValue};
use crate::valuation::vocabulary::MIN_YEAR;
use serde::Serialize;
use std::collections::BTreeMap;

const TOP: Option<usize> = Some(10);
const PRICE_BUCKET: f64 = 50_000.0;
const PRICE_BUCKETS: usize = 10;
const KM_PER_YEAR_BUCKET: f64 = 5_000.0;
const KM_PER_YEAR_BUCKETS: usize = 10;

/// Which table the rows come from; sold-out rows may carry a zero price
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsightScope {
    ForSale,
    SoldOut,
}

impl InsightScope {
    fn keeps_price(&self, price: f64) -> bool {
        match self {
            InsightScope::ForSale => price > 0.0,
            InsightScope::SoldOut => price >= 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MakeModels {
    pub total: usize,
    pub models: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketInsights {
    pub total: usize,
    pub top_makes: Vec<LabelCount>,
    pub avg_price_by_make: Vec<LabelValue>,
    pub avg_kilometers_by_make: Vec<LabelValue>,
    pub price_distribution: Option<Describe>,
    pub year_distribution: BTreeMap<i32, usize>,
    pub regional_specs_distribution: Vec<LabelCount>,
    pub seller_type_distribution: Vec<LabelCount>,
    pub body_type_distribution: Vec<LabelCount>,
    pub fuel_type_distribution: Vec<LabelCount>,
    pub transmission_distribution: Vec<LabelCount>,
    pub age_distribution: BTreeMap<i32, usize>,
    pub price_by_age: BTreeMap<i32, f64>,
    pub kilometers_by_age: BTreeMap<i32, f64>,
    pub make_model_distribution: BTreeMap<String, MakeModels>,
    pub top_make_model_by_avg_price: Vec<LabelValue>,
    pub top_make_model_by_avg_kilometers: Vec<LabelValue>,
    pub price_ranges: Vec<LabelCount>,
    pub kilometers_per_year_ranges: Vec<LabelCount>,
    pub top_makes_by_source: BTreeMap<String, Vec<LabelCount>>,
}

/// Bucket labels of width `step` (in thousands) plus an open top bucket
fn bucket_labels(step: f64, buckets: usize) -> Vec<String> {
    let k = (step / 1_000.0) as usize;
    let mut labels: Vec<String> = (0..buckets)
        .map(|i| format!("{}k-{}k", i * k, (i + 1) * k))
        .collect();
    labels.push(format!("{}k+", buckets * k));
    labels
}

/// Right-closed buckets with zero in the first; anything past the last
/// edge lands in the open bucket
fn bucket_index(value: f64, step: f64, buckets: usize) -> usize {
    if value > step * buckets as f64 {
        return buckets;
    }
    ((value / step).ceil() as usize).saturating_sub(1)
}

fn bucket_counts(values: impl Iterator<Item = f64>, step: f64, buckets: usize) -> Vec<LabelCount> {
    let mut counts = vec![0usize; buckets + 1];
    for value in values {
        counts[bucket_index(value, step, buckets)] += 1;
    }
    bucket_labels(step, buckets)
        .into_iter()
        .zip(counts)
        .map(|(label, count)| LabelCount { label, count })
        .collect()
}

fn group_mean(pairs: impl Iterator<Item = (i32, f64)>) -> BTreeMap<i32, f64> {
    let mut groups: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
    for (key, value) in pairs {
        let entry = groups.entry(key).or_default();
        entry.0 += value;
        entry.1 += 1;
    }
    groups
        .into_iter()
        .map(|(key, (sum, n))| (key, sum / n as f64))
        .collect()
}

fn tally<K: Ord>(keys: impl Iterator<Item = K>) -> BTreeMap<K, usize> {
    let mut out = BTreeMap::new();
    for key in keys {
        *out.entry(key).or_default() += 1;
    }
    out
}

pub fn market_insights(
    rows: &[CanonicalListing],
    scope: InsightScope,
    current_year: i32,
) -> MarketInsights {
    let rows: Vec<&CanonicalListing> = rows
        .iter()
        .filter(|r| scope.keeps_price(r.price))
        .filter(|r| r.year >= MIN_YEAR && r.year <= current_year)
        .collect();
    let age = |r: &CanonicalListing| current_year - r.year;
    let make_model = |r: &CanonicalListing| format!("{} {}", r.make, r.model);

    let prices: Vec<f64> = rows.iter().map(|r| r.price).collect();

    let mut make_model_distribution: BTreeMap<String, MakeModels> = BTreeMap::new();
    for r in &rows {
        let entry = make_model_distribution
            .entry(r.make.clone())
            .or_insert_with(|| MakeModels {
                total: 0,
                models: BTreeMap::new(),
            });
        entry.total += 1;
        *entry.models.entry(r.model.clone()).or_default() += 1;
    }

    let mut by_source: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for r in &rows {
        by_source
            .entry(r.source.to_string())
            .or_default()
            .push(r.make.as_str());
    }

    MarketInsights {
        total: rows.len(),
        top_makes: top_counts(rows.iter().copied().map(|r| r.make.as_str()), TOP),
        avg_price_by_make: top_means(
            rows.iter().copied().map(|r| (r.make.clone(), r.price)),
            TOP,
        ),
        avg_kilometers_by_make: top_means(
            rows.iter().copied().map(|r| (r.make.clone(), r.kilometers)),
            TOP,
        ),
        price_distribution: describe(&prices),
        year_distribution: tally(rows.iter().copied().map(|r| r.year)),
        regional_specs_distribution: top_counts(
            rows.iter().copied().map(|r| r.regional_specs.label()),
            None,
        ),
        seller_type_distribution: top_counts(
            rows.iter()
                .copied()
                .filter(|r| r.seller_type != SellerType::Unknown)
                .map(|r| r.seller_type.label()),
            None,
        ),
        body_type_distribution: top_counts(
            rows.iter().copied().filter_map(|r| r.body_type.as_deref()),
            TOP,
        ),
        fuel_type_distribution: top_counts(
            rows.iter().copied().filter_map(|r| r.fuel_type.as_deref()),
            None,
        ),
        transmission_distribution: top_counts(
            rows.iter().copied().filter_map(|r| r.transmission_type.as_deref()),
            None,
        ),
        age_distribution: tally(rows.iter().copied().map(|r| age(r))),
        price_by_age: group_mean(rows.iter().copied().map(|r| (age(r), r.price))),
        kilometers_by_age: group_mean(rows.iter().copied().map(|r| (age(r), r.kilometers))),
        make_model_distribution,
        top_make_model_by_avg_price: top_means(
            rows.iter().copied().map(|r| (make_model(r), r.price)),
            TOP,
        ),
        top_make_model_by_avg_kilometers: top_means(
            rows.iter().copied().map(|r| (make_model(r), r.kilometers)),
            TOP,
        ),
        price_ranges: bucket_counts(prices.iter().copied(), PRICE_BUCKET, PRICE_BUCKETS),
        kilometers_per_year_ranges: bucket_counts(
            rows.iter().copied().map(|r| r.kilometers / age(r).max(1) as f64),
            KM_PER_YEAR_BUCKET,
            KM_PER_YEAR_BUCKETS,
        ),
        top_makes_by_source: by_source
            .into_iter()
            .map(|(source, makes)| (source, top_counts(makes, TOP)))
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuctionInsights {
    pub total: usize,
    pub make_distribution: Vec<LabelCount>,
    pub make_model_distribution: Vec<LabelCount>,
    pub year_distribution: BTreeMap<i32, usize>,
    pub kilometers: Option<Describe>,
    pub auction_date_distribution: Vec<LabelCount>,
    pub regional_specs_distribution: Vec<LabelCount>,
    pub primary_damage_distribution: Vec<LabelCount>,
    pub participation_distribution: Vec<LabelCount>,
    pub bid_difference: Option<Describe>,
    pub summary: String,
}

pub fn auction_insights(records: &[AuctionRecord], currency: &str) -> AuctionInsights {
    let make_models: Vec<String> = records
        .iter()
        .map(|r| format!("{} {}", r.make, r.model))
        .collect();
    let kilometers: Vec<f64> = records.iter().map(|r| r.kilometers).collect();
    let bids: Vec<f64> = records.iter().map(|r| r.bid_difference).collect();
    let finals: Vec<f64> = records.iter().map(|r| r.final_price).collect();
    let make_distribution = top_counts(records.iter().map(|r| r.make.as_str()), TOP);
    let bid_difference = describe(&bids);

    let summary = match (describe(&finals), make_distribution.first()) {
        (Some(finals), Some(top)) => format!(
            "Total auction cars: {}. Average final price: {} {:.2}. Average bid difference: {} {:.2}. Most common make: {}.",
            records.len(),
            currency,
            finals.mean,
            currency,
            bid_difference.map(|d| d.mean).unwrap_or(0.0),
            top.label
        ),
        _ => "Total auction cars: 0.".to_string(),
    };

    AuctionInsights {
        total: records.len(),
        make_model_distribution: top_counts(make_models.iter().map(String::as_str), TOP),
        make_distribution,
        year_distribution: tally(records.iter().map(|r| r.year)),
        kilometers: describe(&kilometers),
        auction_date_distribution: top_counts(
            records.iter().filter_map(|r| r.auction_date.as_deref()),
            TOP,
        ),
        regional_specs_distribution: top_counts(
            records.iter().map(|r| r.regional_specs.label()),
            None,
        ),
        primary_damage_distribution: top_counts(
            records.iter().filter_map(|r| r.primary_damage.as_deref()),
            TOP,
        ),
        participation_distribution: top_counts(
            records.iter().filter_map(|r| r.participation_count.as_deref()),
            TOP,
        ),
        bid_difference,
        summary,
    }
}
