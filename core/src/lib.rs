//! RiskDesk core — classification, aggregation and the interactive table
//! contract for batches of fraud-scored transactions.

pub mod aggregator;
pub mod analysis;
pub mod backend;
pub mod classifier;
pub mod config;
pub mod error;
pub mod event;
pub mod export;
pub mod rng;
pub mod sample;
pub mod session;
pub mod store;
pub mod table;
pub mod transaction;
pub mod types;
pub mod upload;
