use std::{path::Path, sync::Arc};

use anyhow::{Context, Result};
use tokio::task::JoinSet;
use tracing::{error, info, instrument::WithSubscriber};

use crate::{catalog::CityCatalog, model::WeatherRecord, provider::ForecastSource};

/// Fetches forecasts for every city of a catalog concurrently.
#[derive(Debug, Clone)]
pub struct Fetcher {
    catalog: Arc<CityCatalog>,
    source: Arc<dyn ForecastSource>,
}

impl Fetcher {
    pub fn new(catalog: CityCatalog, source: Arc<dyn ForecastSource>) -> Self {
        Self { catalog: Arc::new(catalog), source }
    }

    /// One record per catalog city, in catalog order. Failed cities carry no forecast.
    pub async fn fetch_all(&self) -> Vec<WeatherRecord> {
        info!(cities = self.catalog.len(), "Fetching weather data from API...");

        let mut set = JoinSet::new();
        for (idx, city) in self.catalog.cities().enumerate() {
            let fetcher = self.clone();
            let city = city.to_string();
            set.spawn(
                async move { (idx, fetcher.fetch_city(&city).await) }.with_current_subscriber(),
            );
        }

        let mut slots: Vec<Option<WeatherRecord>> = vec![None; self.catalog.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, record)) => slots[idx] = Some(record),
                Err(err) => error!(error = %err, "Fetch task failed"),
            }
        }

        let records: Vec<_> = self
            .catalog
            .cities()
            .zip(slots)
            .map(|(city, slot)| {
                slot.unwrap_or_else(|| WeatherRecord { city: city.to_string(), forecast: None })
            })
            .collect();

        info!(
            received = records.iter().filter(|r| r.forecast.is_some()).count(),
            "Weather data from API received!"
        );
        records
    }

    /// Never fails: lookup and fetch errors are logged and leave `forecast` empty.
    pub async fn fetch_city(&self, city: &str) -> WeatherRecord {
        let url = match self.catalog.url_for(city) {
            Ok(url) => url,
            Err(err) => {
                error!(city, "{err}");
                return WeatherRecord { city: city.to_string(), forecast: None };
            }
        };

        let forecast = match self.source.get_forecast(url).await {
            Ok(data) => Some(data),
            Err(err) => {
                error!(city, url, "{err}");
                None
            }
        };

        WeatherRecord { city: city.to_string(), forecast }
    }
}

/// Write every non-empty forecast to `<dir>/<CITY>.json`. Returns how many were written.
pub async fn save_records(records: &[WeatherRecord], dir: &Path) -> Result<usize> {
    info!(dir = %dir.display(), "Saving weather data...");
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create weather data directory: {}", dir.display()))?;

    let mut set = JoinSet::new();
    for record in records {
        let Some(forecast) = record.forecast.as_ref() else {
            continue;
        };
        let path = dir.join(format!("{}.json", record.city));
        let body = serde_json::to_string_pretty(forecast)
            .with_context(|| format!("Failed to serialize forecast for {}", record.city))?;

        set.spawn(
            async move {
                tokio::fs::write(&path, body)
                    .await
                    .with_context(|| format!("Failed to write {}", path.display()))
            }
            .with_current_subscriber(),
        );
    }

    let mut saved = 0;
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Ok(())) => saved += 1,
            Ok(Err(err)) => error!("{err:#}"),
            Err(err) => error!(error = %err, "Save task failed"),
        }
    }

    info!(saved, "Weather data saved!");
    Ok(saved)
}
