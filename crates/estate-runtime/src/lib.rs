//! Runtime layer for the estate analyzer.
//!
//! Owns the dataset cache and the two ways views leave the process:
//! JSON files in batch mode and HTTP responses in serve mode.

pub mod batch;
pub mod data_manager;
pub mod server;

pub use data_manager::DatasetCache;
pub use estate_core as core;
pub use estate_data as data;
