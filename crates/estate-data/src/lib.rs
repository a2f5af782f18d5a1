//! Data layer for the estate analyzer.
//!
//! Loads transaction and regional CSV files, groups and pivots records,
//! and shapes the named views into JSON envelopes.

pub mod aggregator;
pub mod analysis;
pub mod pivot;
pub mod reader;
pub mod regional;
pub mod response;
pub mod views;

pub use analysis::{load_dataset, render, Dataset, ViewKind, ViewParams};
pub use estate_core as core;
pub use response::Envelope;
