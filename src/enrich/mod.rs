//! Enrichment of directory records
//!
//! This module joins crawled records with their cached portrait and the
//! outputs of external prediction services:
//! - Name decomposition into last and first name
//! - Prediction service contracts and the HTTP adapter
//! - Per-record joining with per-field fault isolation
//! - Dataset assembly over every persisted partition

mod assembler;
mod joiner;
mod name;
mod predictors;

pub use assembler::{AssemblyStats, DatasetAssembler};
pub use joiner::EnrichmentJoiner;
pub use name::{decompose_name, NameParts};
pub use predictors::{
    DisabledPredictor, EthnicityPredictor, Gender, GenderPredictor, HttpPredictionClient,
    ImagePredictor,
};
