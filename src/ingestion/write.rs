//! Write functions - persist logical datasets as CSV with atomic replace
//!
//! Every write goes to a temporary file in the dataset directory and is then
//! renamed over the previous file, so readers see either the old or the new
//! table and never a torn one. A failed write leaves the old file in place.

use crate::ingestion::parse::normalize_rows;
use crate::ingestion::records::DatasetRecord;
use crate::ingestion::types::RawData;
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use tracing::info;

/// Logical datasets produced by the ingestion pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    CarsForSale,
    CarsSoldOut,
    AuctionSoldCars,
    CarsPredicted,
}

impl Dataset {
    pub fn name(&self) -> &'static str {
        match self {
            Dataset::CarsForSale => "cars_for_sale",
            Dataset::CarsSoldOut => "cars_sold_out",
            Dataset::AuctionSoldCars => "auction_sold_cars",
            Dataset::CarsPredicted => "cars_predicted",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.csv", self.name())
    }
}

impl std::fmt::Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// CSV-backed store of named datasets in one directory
#[derive(Debug, Clone)]
pub struct DatasetStore {
    dir: PathBuf,
}

impl DatasetStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, dataset: Dataset) -> PathBuf {
        self.dir.join(dataset.file_name())
    }

    /// Read a dataset as all-string cells, coercing each row into `T`.
    /// Rows that fail coercion are dropped, not repaired.
    pub fn read<T: DatasetRecord>(&self, dataset: Dataset) -> Result<Vec<T>> {
        normalize_rows(&RawData::File(self.path(dataset)), dataset.name(), T::from_row)
    }

    /// Fully replace a dataset
    pub fn write<T: DatasetRecord>(&self, dataset: Dataset, rows: &[T]) -> Result<usize> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create dataset directory {:?}", self.dir))?;

        let mut tmp = NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("Failed to stage dataset {}", dataset))?;
        {
            let mut writer = csv::Writer::from_writer(&mut tmp);
            for row in rows {
                writer.serialize(row.to_row())?;
            }
            writer.flush()?;
        }
        tmp.flush()?;
        tmp.as_file().sync_all()?;

        let path = self.path(dataset);
        tmp.persist(&path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to replace dataset {} at {:?}", dataset, path))?;

        info!("Wrote {} rows to {}", rows.len(), dataset);
        Ok(rows.len())
    }
}
