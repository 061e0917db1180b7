//! Configuration loaded from environment variables

use crate::ingestion::types::Source;
use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_SOURCE_ORDER: [Source; 5] = [
    Source::Dubizzle,
    Source::Dubicars,
    Source::Carswitch,
    Source::Cars24,
    Source::Telegram,
];

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub model_path: PathBuf,
    /// For-sale sources in ingestion order; later sources win on duplicate ids
    pub source_order: Vec<Source>,
    pub recency_window_days: i64,
    pub currency: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys take their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source_order = match lookup("SOURCE_ORDER") {
            Some(list) => parse_source_order(&list).context("Invalid SOURCE_ORDER")?,
            None => DEFAULT_SOURCE_ORDER.to_vec(),
        };

        let recency_window_days = match lookup("RECENCY_WINDOW_DAYS") {
            Some(days) => days
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|d| *d > 0)
                .with_context(|| format!("Invalid RECENCY_WINDOW_DAYS: {:?}", days))?,
            None => 60,
        };

        Ok(Config {
            data_dir: lookup("DATA_DIR")
                .unwrap_or_else(|| "./car_data".to_string())
                .into(),
            model_path: lookup("MODEL_PATH")
                .unwrap_or_else(|| "./models/price_model.json".to_string())
                .into(),
            source_order,
            recency_window_days,
            currency: lookup("CURRENCY").unwrap_or_else(|| "AED".to_string()),
        })
    }
}

fn parse_source_order(list: &str) -> Result<Vec<Source>> {
    let mut order = Vec::new();
    for key in list.split(',').map(str::trim).filter(|k| !k.is_empty()) {
        let source = Source::from_key(key).with_context(|| format!("Unknown source {:?}", key))?;
        if matches!(source, Source::MarhabaAuctions | Source::EmiratesAuction) {
            bail!("{} is an auction source, not a listing source", source);
        }
        if order.contains(&source) {
            bail!("Source {} listed twice", source);
        }
        order.push(source);
    }
    if order.is_empty() {
        bail!("No sources listed");
    }
    Ok(order)
}
