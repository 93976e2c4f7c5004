// src/lib.rs

pub mod awards;
pub mod c_api;
pub mod config;
pub mod core;
pub mod error;
pub mod ledger;
pub mod library;
pub mod persistence;
pub mod stats;
pub mod tracker;

pub use crate::core::engine::RecommendationEngine;
pub use crate::error::{Error, Result};
pub use crate::ledger::StatsLedger;
pub use crate::tracker::ReadingTracker;
