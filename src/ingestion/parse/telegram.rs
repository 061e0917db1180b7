//! Telegram chat listings
//!
//! Free-form posts already extracted into rough fields. Only recent "Sell"
//! posts for makes and models the structured sources know are kept.

use super::{cell, normalize_rows, parse_plain_number, required, row_id};
use crate::error::RowError;
use crate::ingestion::mappings::TELEGRAM_SPECS;
use crate::ingestion::types::{CanonicalListing, PostedAt, RawData, SellerType, Source, UNKNOWN};
use crate::ingestion::utils::parse_datetime_loose;
use anyhow::Result;
use chrono::{Duration, NaiveDateTime};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

const PERMALINK_BASE: &str = "https://t.me/";

/// Posters abbreviate large numbers; one or two digits get scaled up
const SHORTHAND_MAX_DIGITS: usize = 2;
const MILEAGE_SHORTHAND_FACTOR: f64 = 100_000.0;
const PRICE_SHORTHAND_FACTOR: f64 = 10_000.0;

/// Tokens stripped from the free-text price
const PRICE_NOISE: [&str; 5] = ["NotProvided", "AED", ",", "迪", "x"];

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TelegramChatRow {
    pub id: Option<String>,
    pub chat_username: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TelegramListingRow {
    #[serde(rename = "Id")]
    pub id: Option<String>,
    #[serde(rename = "Make")]
    pub make: Option<String>,
    #[serde(rename = "Model")]
    pub model: Option<String>,
    #[serde(rename = "Year")]
    pub year: Option<String>,
    #[serde(rename = "Mileage")]
    pub mileage: Option<String>,
    #[serde(rename = "RegionalSpecs")]
    pub regional_specs: Option<String>,
    #[serde(rename = "Price")]
    pub price: Option<String>,
    #[serde(rename = "Date")]
    pub date: Option<String>,
    #[serde(rename = "SellorBuy")]
    pub sell_or_buy: Option<String>,
}

/// Makes and models observed in the structured sources
#[derive(Debug, Default, Clone)]
pub struct KnownModels {
    makes: HashSet<String>,
    models: HashSet<String>,
}

impl KnownModels {
    pub fn from_listings(listings: &[CanonicalListing]) -> Self {
        Self {
            makes: listings.iter().map(|l| l.make.clone()).collect(),
            models: listings.iter().map(|l| l.model.clone()).collect(),
        }
    }

    pub fn contains(&self, make: &str, model: &str) -> bool {
        self.makes.contains(make) && self.models.contains(model)
    }
}

/// Posts must be strictly newer than `now - days`
#[derive(Debug, Clone, Copy)]
pub struct TelegramWindow {
    pub now: NaiveDateTime,
    pub days: i64,
}

impl TelegramWindow {
    fn cutoff(&self) -> NaiveDateTime {
        self.now - Duration::days(self.days)
    }
}

/// Join chat metadata with extracted listings and normalize them
pub fn parse_telegram(
    listings: &RawData,
    chats: &RawData,
    known: &KnownModels,
    window: TelegramWindow,
) -> Result<Vec<CanonicalListing>> {
    let chat_rows = normalize_rows(chats, "Telegram chats", |row: TelegramChatRow| {
        Ok((row_id(&row.id)?, required("chat_username", &row.chat_username)?.to_string()))
    })?;
    let usernames: HashMap<String, String> = chat_rows.into_iter().collect();

    let cutoff = window.cutoff();
    normalize_rows(listings, "Telegram", |row: TelegramListingRow| {
        normalize_telegram(row, &usernames, known, cutoff)
    })
}

pub fn normalize_telegram(
    row: TelegramListingRow,
    usernames: &HashMap<String, String>,
    known: &KnownModels,
    cutoff: NaiveDateTime,
) -> Result<CanonicalListing, RowError> {
    let id = row_id(&row.id)?;
    let username = usernames
        .get(&id)
        .ok_or(RowError::Filtered("no matching chat"))?;

    let make = required("Make", &row.make)?;
    let model = required("Model", &row.model)?;
    if !known.contains(make, model) {
        return Err(RowError::Filtered("make or model not listed elsewhere"));
    }
    if cell(&row.sell_or_buy) != Some("Sell") {
        return Err(RowError::Filtered("not a sale post"));
    }

    let posted = cell(&row.date)
        .and_then(parse_datetime_loose)
        .filter(|posted| *posted > cutoff)
        .ok_or(RowError::Filtered("outside recency window"))?;

    Ok(CanonicalListing {
        id,
        make: make.to_string(),
        model: model.to_string(),
        year: telegram_year(required("Year", &row.year)?)?,
        kilometers: telegram_mileage(required("Kilometers", &row.mileage)?)?,
        trim: UNKNOWN.to_string(),
        regional_specs: TELEGRAM_SPECS.map(row.regional_specs.as_deref()),
        price: telegram_price(required("Price", &row.price)?)?,
        seller_type: SellerType::Unknown,
        posted_at: PostedAt::Known(posted),
        source: Source::Telegram,
        permalink: format!("{}{}", PERMALINK_BASE, username),
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

/// "19" -> 2019
fn telegram_year(raw: &str) -> Result<i32, RowError> {
    let raw = raw.trim();
    let expanded = if raw.len() == 2 {
        format!("20{}", raw)
    } else {
        raw.to_string()
    };
    expanded
        .parse::<i32>()
        .map_err(|_| RowError::InvalidNumber {
            field: "Year",
            value: raw.to_string(),
        })
}

fn telegram_mileage(raw: &str) -> Result<f64, RowError> {
    shorthand_number("Kilometers", raw.trim(), MILEAGE_SHORTHAND_FACTOR)
}

fn telegram_price(raw: &str) -> Result<f64, RowError> {
    let cleaned = PRICE_NOISE
        .iter()
        .fold(raw.to_string(), |acc, noise| acc.replace(noise, ""));
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Err(RowError::MissingField("Price"));
    }
    shorthand_number("Price", cleaned, PRICE_SHORTHAND_FACTOR)
}

fn shorthand_number(field: &'static str, raw: &str, factor: f64) -> Result<f64, RowError> {
    let value = parse_plain_number(raw).ok_or_else(|| RowError::InvalidNumber {
        field,
        value: raw.to_string(),
    })?;
    if raw.chars().count() <= SHORTHAND_MAX_DIGITS {
        Ok(value * factor)
    } else {
        Ok(value)
    }
}
