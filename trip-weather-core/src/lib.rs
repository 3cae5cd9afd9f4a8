//! Core library for the `trip-weather` CLI.
//!
//! This crate defines:
//! - The city catalog and forecast sources
//! - The fetch and analysis stages that produce per-city daily statistics
//! - Aggregation of daily statistics into a rated table, and selection of the best cities
//! - Configuration and the explicit logging context shared by the stages
//!
//! It is used by `trip-weather-cli`, but the stages can also be driven individually.

pub mod aggregate;
pub mod analyze;
pub mod catalog;
pub mod config;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod provider;
pub mod select;
pub mod stats;
pub mod table;

pub use aggregate::Aggregator;
pub use analyze::{Analyzer, BuiltinAnalyzer, CommandAnalyzer};
pub use catalog::CityCatalog;
pub use config::Config;
pub use error::{RowError, SelectError};
pub use logging::LogContext;
pub use model::{AggregatedTable, CityRow, Conclusion, DailyStatsDocument, WeatherRecord};
pub use pipeline::Pipeline;
pub use provider::{ForecastSource, HttpForecastSource};
pub use select::Selector;
