//! Polyscan Core - Domain models, configuration, and distribution statistics
//!
//! This crate contains the types shared by the extraction, decomposition and
//! retrieval crates, plus the pure statistical reductions applied to
//! histogram-style insight responses.

pub mod config;
pub mod error;
pub mod models;
pub mod stats;

pub use error::{PolyscanError, Result};
