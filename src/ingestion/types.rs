//! Core data types for the ingestion pipeline
//! Pure data structures with no behavior beyond label conversion

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Sentinel for any categorical value that cannot be determined
pub const UNKNOWN: &str = "Unknown";

/// Timestamp layout used by the Posted Datetime column
pub const POSTED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Raw data from various sources - tagged unions
#[derive(Debug)]
pub enum RawData {
    File(PathBuf),
    Csv(String),
}

impl RawData {
    /// Open a header-aware CSV reader over the payload
    pub fn csv_reader(&self) -> anyhow::Result<csv::Reader<Box<dyn std::io::Read + '_>>> {
        let inner: Box<dyn std::io::Read + '_> = match self {
            RawData::File(path) => Box::new(std::fs::File::open(path)?),
            RawData::Csv(text) => Box::new(text.as_bytes()),
        };
        Ok(csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(inner))
    }
}

/// Originating marketplace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Source {
    Dubizzle,
    Dubicars,
    Carswitch,
    Cars24,
    Telegram,
    #[serde(rename = "Marhaba Auctions")]
    MarhabaAuctions,
    #[serde(rename = "Emirates Auction")]
    EmiratesAuction,
}

impl Source {
    pub fn label(&self) -> &'static str {
        match self {
            Source::Dubizzle => "Dubizzle",
            Source::Dubicars => "Dubicars",
            Source::Carswitch => "Carswitch",
            Source::Cars24 => "Cars24",
            Source::Telegram => "Telegram",
            Source::MarhabaAuctions => "Marhaba Auctions",
            Source::EmiratesAuction => "Emirates Auction",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        [
            Source::Dubizzle,
            Source::Dubicars,
            Source::Carswitch,
            Source::Cars24,
            Source::Telegram,
            Source::MarhabaAuctions,
            Source::EmiratesAuction,
        ]
        .into_iter()
        .find(|s| s.label() == label)
    }

    /// Parse the lowercase key used in configuration (`SOURCE_ORDER`)
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_lowercase().as_str() {
            "dubizzle" => Some(Source::Dubizzle),
            "dubicars" => Some(Source::Dubicars),
            "carswitch" => Some(Source::Carswitch),
            "cars24" => Some(Source::Cars24),
            "telegram" => Some(Source::Telegram),
            "marhaba" | "marhaba_auctions" => Some(Source::MarhabaAuctions),
            "emirates" | "emirates_auction" => Some(Source::EmiratesAuction),
            _ => None,
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Market a vehicle was built or imported for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RegionalSpecs {
    #[serde(rename = "GCC Specs")]
    Gcc,
    #[serde(rename = "American Specs")]
    American,
    #[serde(rename = "European Specs")]
    European,
    #[serde(rename = "Japanese Specs")]
    Japanese,
    #[serde(rename = "Canadian Specs")]
    Canadian,
    #[serde(rename = "Korean Specs")]
    Korean,
    #[serde(rename = "Chinese Specs")]
    Chinese,
    Other,
    Unknown,
}

impl RegionalSpecs {
    pub const ALL: [RegionalSpecs; 9] = [
        RegionalSpecs::Gcc,
        RegionalSpecs::American,
        RegionalSpecs::European,
        RegionalSpecs::Japanese,
        RegionalSpecs::Canadian,
        RegionalSpecs::Korean,
        RegionalSpecs::Chinese,
        RegionalSpecs::Other,
        RegionalSpecs::Unknown,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RegionalSpecs::Gcc => "GCC Specs",
            RegionalSpecs::American => "American Specs",
            RegionalSpecs::European => "European Specs",
            RegionalSpecs::Japanese => "Japanese Specs",
            RegionalSpecs::Canadian => "Canadian Specs",
            RegionalSpecs::Korean => "Korean Specs",
            RegionalSpecs::Chinese => "Chinese Specs",
            RegionalSpecs::Other => "Other",
            RegionalSpecs::Unknown => UNKNOWN,
        }
    }

    /// Exact canonical label lookup; anything else is `None`
    pub fn from_label(label: &str) -> Option<Self> {
        RegionalSpecs::ALL
            .into_iter()
            .find(|s| s.label() == label.trim())
    }
}

impl std::fmt::Display for RegionalSpecs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SellerType {
    Dealer,
    Owner,
    Unknown,
}

impl SellerType {
    pub fn label(&self) -> &'static str {
        match self {
            SellerType::Dealer => "Dealer",
            SellerType::Owner => "Owner",
            SellerType::Unknown => UNKNOWN,
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Dealer" => Some(SellerType::Dealer),
            "Owner" => Some(SellerType::Owner),
            UNKNOWN => Some(SellerType::Unknown),
            _ => None,
        }
    }
}

impl std::fmt::Display for SellerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// When a listing was posted, if the source exposes it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PostedAt {
    Known(NaiveDateTime),
    Unknown,
}

impl TryFrom<String> for PostedAt {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let value = value.trim();
        if value.is_empty() || value == UNKNOWN {
            return Ok(PostedAt::Unknown);
        }
        NaiveDateTime::parse_from_str(value, POSTED_FORMAT)
            .map(PostedAt::Known)
            .map_err(|e| format!("invalid posted datetime {:?}: {}", value, e))
    }
}

impl From<PostedAt> for String {
    fn from(value: PostedAt) -> Self {
        match value {
            PostedAt::Known(ts) => ts.format(POSTED_FORMAT).to_string(),
            PostedAt::Unknown => UNKNOWN.to_string(),
        }
    }
}

/// Canonical listing - one row per observed for-sale or sold-out car
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalListing {
    pub id: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub kilometers: f64,
    pub trim: String,
    pub regional_specs: RegionalSpecs,
    pub price: f64,
    pub seller_type: SellerType,
    pub posted_at: PostedAt,
    pub source: Source,
    pub permalink: String,

    // Descriptive attributes, absent when the source does not carry them
    pub doors: Option<String>,
    pub body_type: Option<String>,
    pub fuel_type: Option<String>,
    pub interior_color: Option<String>,
    pub exterior_color: Option<String>,
    pub transmission_type: Option<String>,
    pub steering_side: Option<String>,
    pub seating_capacity: Option<String>,
}

/// Listing augmented with the model estimate (`cars_predicted`)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictedListing {
    pub listing: CanonicalListing,
    pub predicted_price: f64,
    pub price_ratio: f64,
}

/// Sold auction lot (`auction_sold_cars`)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuctionRecord {
    pub id: String,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub kilometers: f64,
    pub regional_specs: RegionalSpecs,
    pub transmission: Option<String>,
    pub body_type: Option<String>,
    pub engine_type: Option<String>,
    pub cylinders: Option<String>,
    pub fuel_type: Option<String>,
    pub interior_color: Option<String>,
    pub exterior_color: Option<String>,
    pub seating_capacity: Option<String>,
    pub doors: Option<String>,
    pub primary_damage: Option<String>,
    pub secondary_damage: Option<String>,
    pub auction_date: Option<String>,
    pub start_price: f64,
    pub final_price: f64,
    pub bid_difference: f64,
    pub bid_difference_pct: Option<f64>,
    pub participation_count: Option<String>,
    pub source: Source,
    pub scores: Option<AuctionScores>,
}

/// Model-derived columns of an auction lot
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AuctionScores {
    pub min_predicted: f64,
    pub max_predicted: f64,
    pub predicted: f64,
    pub min_ratio: f64,
    pub max_ratio: f64,
    pub ratio: f64,
}

/// Per-stage ingestion statistics
#[derive(Debug, Default, Clone, PartialEq)]
pub struct IngestStats {
    pub read: usize,
    pub kept: usize,
    pub dropped: usize,
    pub duplicates: usize,
}

impl std::fmt::Display for IngestStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "read: {}, kept: {}, dropped: {}, duplicates: {}",
            self.read, self.kept, self.dropped, self.duplicates
        )
    }
}

/// Fixture shared by test modules across the crate
#[cfg(test)]
pub(crate) fn mock_listing() -> CanonicalListing {
    use chrono::NaiveDate;

    CanonicalListing {
        id: "A1".to_string(),
        make: "Toyota".to_string(),
        model: "Camry".to_string(),
        year: 2019,
        kilometers: 85_000.0,
        trim: "SE".to_string(),
        regional_specs: RegionalSpecs::Gcc,
        price: 55_000.0,
        seller_type: SellerType::Dealer,
        posted_at: PostedAt::Known(
            NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(10, 30, 0)
                .unwrap(),
        ),
        source: Source::Dubizzle,
        permalink: "https://example.com/a1".to_string(),
        doors: Some("4".to_string()),
        body_type: Some("Sedan".to_string()),
        fuel_type: Some("Petrol".to_string()),
        interior_color: None,
        exterior_color: Some("White".to_string()),
        transmission_type: Some("Automatic Transmission".to_string()),
        steering_side: Some("Left Hand".to_string()),
        seating_capacity: Some("5".to_string()),
    }
}
