//! Equity screening, technical indicators and random-sampling portfolio
//! optimization over daily price history.

pub mod analysis;
pub mod config;
pub mod covariance;
pub mod data;
pub mod error;
pub mod frontier;
pub mod indicators;
pub mod monte_carlo;
pub mod portfolio;
pub mod report;
pub mod returns;
pub mod screener;

pub use error::{AnalyticsError, AnalyticsResult};
