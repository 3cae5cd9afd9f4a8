use async_trait::async_trait;
use std::fmt::Debug;

use crate::error::FetchError;

pub mod http;

pub use http::HttpForecastSource;

/// Anything that can turn a forecast URL into a forecast document.
#[async_trait]
pub trait ForecastSource: Send + Sync + Debug {
    async fn get_forecast(&self, url: &str) -> Result<serde_json::Value, FetchError>;
}
