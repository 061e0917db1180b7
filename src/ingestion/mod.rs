//! Data ingestion module - functional pipeline for multi-source car listing data

pub mod enrich;
pub mod fetch;
pub mod mappings;
pub mod merge;
pub mod parse;
pub mod pipeline;
pub mod records;
pub mod types;
pub mod utils;
pub mod write;

pub use pipeline::{Pipeline, Stage};
pub use types::*;
pub use write::{Dataset, DatasetStore};
