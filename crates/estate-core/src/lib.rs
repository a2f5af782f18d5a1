//! Core types for the real-estate transaction analyzer.
//!
//! Holds the record/table model, the cell-cleaning primitives (date and
//! number coercion), calendar bucket assignment, configuration and the
//! shared error type. Nothing here performs I/O except config validation.

pub mod buckets;
pub mod dates;
pub mod error;
pub mod models;
pub mod numeric;
pub mod settings;

pub use error::{EstateError, Result};
