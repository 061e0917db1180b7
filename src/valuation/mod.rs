//! Valuation module - features, model boundary and everything that consumes predictions

pub mod auction;
pub mod comparables;
pub mod engine;
pub mod evaluate;
pub mod features;
pub mod format;
pub mod insights;
pub mod model;
pub mod stats;
pub mod undervalued;
pub mod vocabulary;

pub use engine::{PredictionResult, TrimRange, ValuationEngine, ValuationQuery};
pub use features::{derive_features, FeatureRow, VehicleSpec, FEATURE_NAMES};
pub use model::{AdditiveModel, ModelHandle, PriceModel};
pub use vocabulary::ReferenceVocabulary;
