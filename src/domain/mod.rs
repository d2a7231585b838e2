//! Core domain types and logic.

pub mod series;
pub mod signal;
pub mod listing;
pub mod params;
pub mod ledger;
pub mod metrics;
pub mod engine;
pub mod dual;
pub mod config_validation;
pub mod error;
