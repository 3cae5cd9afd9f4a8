use std::{sync::Arc, time::Instant};

use anyhow::{Context, Result};
use tracing::{info, instrument::WithSubscriber};

use crate::{
    aggregate::Aggregator,
    analyze::{
        AnalyzeSummary, Analyzer, analyze_dir, analyzer_from_config, remove_json_files,
    },
    config::Config,
    fetch::{Fetcher, save_records},
    logging::LogContext,
    model::{AggregatedTable, Conclusion, WeatherRecord},
    provider::{ForecastSource, HttpForecastSource},
    select::Selector,
    table,
};

/// The four stages wired to one configuration and one logging context.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: Config,
    log: LogContext,
    source: Arc<dyn ForecastSource>,
    analyzer: Arc<dyn Analyzer>,
}

impl Pipeline {
    /// HTTP forecast source and the configured analyzer.
    pub fn new(config: Config, log: LogContext) -> Result<Self> {
        let source = HttpForecastSource::new(config.fetch_timeout())
            .context("Failed to set up forecast source")?;
        Ok(Self::with_source(config, log, Arc::new(source)))
    }

    pub fn with_source(config: Config, log: LogContext, source: Arc<dyn ForecastSource>) -> Self {
        let analyzer = analyzer_from_config(&config.analyzer);
        Self { config, log, source, analyzer }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetch every catalog city and save the forecasts that arrived.
    ///
    /// Forecasts and analyses of earlier runs are removed first, so a city
    /// whose fetch fails now has no files for the later stages to pick up.
    pub async fn fetch(&self) -> Result<Vec<WeatherRecord>> {
        async {
            for dir in [&self.config.weather_data_dir, &self.config.analyze_dir] {
                let removed = remove_json_files(dir)
                    .await
                    .with_context(|| format!("Failed to clear {}", dir.display()))?;
                if removed > 0 {
                    info!(dir = %dir.display(), removed, "Removed files of the previous run");
                }
            }

            let fetcher = Fetcher::new(self.config.catalog(), Arc::clone(&self.source));
            let records = fetcher.fetch_all().await;
            save_records(&records, &self.config.weather_data_dir).await?;
            Ok::<_, anyhow::Error>(records)
        }
        .with_subscriber(self.log.dispatch().clone())
        .await
    }

    pub async fn analyze(&self) -> Result<AnalyzeSummary> {
        analyze_dir(
            Arc::clone(&self.analyzer),
            &self.config.weather_data_dir,
            &self.config.analyze_dir,
        )
        .with_subscriber(self.log.dispatch().clone())
        .await
        .context("Analysis stage failed")
    }

    /// Aggregate the analysis directory and persist the table.
    pub async fn aggregate(&self) -> Result<AggregatedTable> {
        let aggregator = Aggregator::new(self.log.clone(), self.config.read_timeout());
        let table = aggregator
            .aggregate_dir(&self.config.analyze_dir)
            .await
            .context("Aggregation stage failed")?;

        self.log
            .scope(|| table::persist(&table, &self.config.aggregated_csv_path, &self.config.table))
            .context("Failed to persist aggregated table")?;

        Ok(table)
    }

    pub fn conclude(&self, table: &AggregatedTable) -> Result<Conclusion> {
        Ok(Selector::new(self.log.clone()).select(table)?)
    }

    /// All stages in order.
    pub async fn run(&self) -> Result<Conclusion> {
        let started = Instant::now();

        self.fetch().await?;
        self.analyze().await?;
        let table = self.aggregate().await?;
        let conclusion = self.conclude(&table)?;

        self.log.scope(|| {
            info!(elapsed_ms = started.elapsed().as_millis() as u64, "Pipeline finished");
        });
        Ok(conclusion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::SelectError, provider::testing::StaticSource};
    use serde_json::{Value, json};
    use std::collections::BTreeMap;
    use tempfile::{TempDir, tempdir};

    fn forecast(days: &[(&str, f64, &str)]) -> Value {
        let forecasts: Vec<Value> = days
            .iter()
            .map(|(date, temp, condition)| {
                let hours: Vec<Value> = (0..24)
                    .map(|h| json!({"hour": h.to_string(), "temp": temp, "condition": condition}))
                    .collect();
                json!({"date": date, "hours": hours})
            })
            .collect();
        json!({ "forecasts": forecasts })
    }

    fn config_in(dir: &TempDir, cities: &[&str]) -> Config {
        Config {
            weather_data_dir: dir.path().join("weather_data"),
            analyze_dir: dir.path().join("analyze_data"),
            aggregated_csv_path: dir.path().join("aggregated_data.csv"),
            log_file: dir.path().join("weather_app.log"),
            cities: cities
                .iter()
                .map(|c| (c.to_string(), format!("mem://{}", c.to_lowercase())))
                .collect::<BTreeMap<_, _>>(),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn run_picks_the_best_city_end_to_end() {
        let dir = tempdir().expect("tempdir");
        let mut source = StaticSource::default();
        // 20 degrees, 11 dry hours -> rating 2
        source.responses.insert(
            "mem://moscow".into(),
            forecast(&[("2022-05-18", 20.0, "clear"), ("2022-05-19", 20.0, "cloudy")]),
        );
        // 44 degrees, 11 dry hours -> rating 4
        source.responses.insert("mem://cairo".into(), forecast(&[("2022-05-18", 44.0, "clear")]));
        // always raining: zero dry hours, dropped
        source.responses.insert("mem://london".into(), forecast(&[("2022-05-18", 15.0, "rain")]));

        let config = config_in(&dir, &["MOSCOW", "CAIRO", "LONDON", "PARIS"]);
        let pipeline = Pipeline::with_source(config, LogContext::silent(), Arc::new(source));

        let conclusion = pipeline.run().await.expect("pipeline");

        assert_eq!(conclusion, Conclusion { max_rating: 4, cities: vec!["Cairo".into()] });
        assert!(dir.path().join("analyze_data").join("MOSCOW.json").exists());
        assert!(!dir.path().join("weather_data").join("PARIS.json").exists());

        let csv = std::fs::read_to_string(dir.path().join("aggregated_data.csv")).expect("csv");
        let first_city = csv.lines().nth(1).expect("first data line");
        assert!(first_city.starts_with("Cairo;"));
    }

    #[tokio::test]
    async fn failed_fetch_does_not_reuse_previous_forecast() {
        let dir = tempdir().expect("tempdir");
        let config = config_in(&dir, &["MOSCOW", "CAIRO"]);

        let mut first = StaticSource::default();
        first.responses.insert("mem://moscow".into(), forecast(&[("2022-05-18", 22.0, "clear")]));
        first.responses.insert("mem://cairo".into(), forecast(&[("2022-05-18", 88.0, "clear")]));
        let pipeline = Pipeline::with_source(config.clone(), LogContext::silent(), Arc::new(first));
        let conclusion = pipeline.run().await.expect("first run");
        assert_eq!(conclusion.cities, ["Cairo"]);

        let mut second = StaticSource::default();
        second.responses.insert("mem://moscow".into(), forecast(&[("2022-05-18", 22.0, "clear")]));
        let pipeline = Pipeline::with_source(config, LogContext::silent(), Arc::new(second));
        let conclusion = pipeline.run().await.expect("second run");

        assert_eq!(conclusion, Conclusion { max_rating: 2, cities: vec!["Moscow".into()] });
        assert!(!dir.path().join("weather_data").join("CAIRO.json").exists());
        assert!(!dir.path().join("analyze_data").join("CAIRO.json").exists());
    }

    #[tokio::test]
    async fn run_without_any_data_is_no_data() {
        let dir = tempdir().expect("tempdir");
        let config = config_in(&dir, &["PARIS"]);
        let pipeline =
            Pipeline::with_source(config, LogContext::silent(), Arc::new(StaticSource::default()));

        let err = pipeline.run().await.unwrap_err();

        assert_eq!(err.downcast_ref::<SelectError>(), Some(&SelectError::NoData));
    }
}
