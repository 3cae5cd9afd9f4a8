//! Reduction of per-city daily statistics into a rated table.
//!
//! Every city is reduced on its own. A city whose document cannot be read,
//! parsed or averaged is dropped with a warning; the batch always continues.
//! The resulting table is sorted by rating (descending) with ties kept in
//! processing order, so the output does not depend on task completion order.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    time::Duration,
};

use tokio::task::JoinSet;
use tracing::{info, instrument::WithSubscriber, warn};

use crate::{
    analyze::json_files,
    error::{AggregateError, RowError},
    logging::LogContext,
    model::{AggregatedTable, CityRow, DailyStatsDocument, DayFigures, display_name},
    stats::{mean_present, rating, round_to},
};

const AVERAGE_DECIMALS: u32 = 2;

#[derive(Debug, Clone)]
pub struct Aggregator {
    log: LogContext,
    read_timeout: Duration,
}

impl Aggregator {
    pub fn new(log: LogContext, read_timeout: Duration) -> Self {
        Self { log, read_timeout }
    }

    /// Reduce one document into a city row.
    pub fn build_row(document: &DailyStatsDocument, city: &str) -> Result<CityRow, RowError> {
        if document.days.is_empty() {
            return Err(RowError::UnreadableDocument {
                city: city.to_string(),
                reason: "document has no days".to_string(),
            });
        }

        let daily: Vec<DayFigures> = document
            .days
            .iter()
            .map(|day| DayFigures {
                date: day.date.clone(),
                temp_avg: day.temp_avg,
                precip_free_hours: day.precipitation_free_hours,
            })
            .collect();

        let avg_temperature = mean_present(daily.iter().map(|d| d.temp_avg))
            .map(|m| round_to(m, AVERAGE_DECIMALS))
            .ok_or_else(|| RowError::EmptyMean { city: city.to_string(), field: "temperature" })?;

        let avg_precip_free_hours = mean_present(daily.iter().map(|d| d.precip_free_hours))
            .map(|m| round_to(m, AVERAGE_DECIMALS))
            .ok_or_else(|| RowError::EmptyMean {
                city: city.to_string(),
                field: "precipitation-free hours",
            })?;

        let rating = rating(avg_temperature, avg_precip_free_hours)
            .ok_or_else(|| RowError::UndefinedRating { city: city.to_string() })?;

        Ok(CityRow {
            city: city.to_string(),
            daily,
            avg_temperature,
            avg_precip_free_hours,
            rating,
        })
    }

    /// Parse raw document bytes, then reduce them.
    pub fn build_row_from_slice(bytes: &[u8], city: &str) -> Result<CityRow, RowError> {
        let document: DailyStatsDocument =
            serde_json::from_slice(bytes).map_err(|err| RowError::UnreadableDocument {
                city: city.to_string(),
                reason: err.to_string(),
            })?;
        Self::build_row(&document, city)
    }

    /// Aggregate in-memory documents, processed in iteration order.
    ///
    /// City names are normalized for display.
    pub fn aggregate<I, S>(&self, documents: I) -> AggregatedTable
    where
        I: IntoIterator<Item = (S, DailyStatsDocument)>,
        S: AsRef<str>,
    {
        self.log.scope(|| {
            let outcomes = documents
                .into_iter()
                .map(|(city, doc)| Self::build_row(&doc, &display_name(city.as_ref())))
                .collect();
            assemble(outcomes)
        })
    }

    /// Aggregate every `*.json` analysis file of `dir`, one task per file.
    ///
    /// Files are processed in name order; the city is the capitalized file stem.
    pub async fn aggregate_dir(&self, dir: &Path) -> Result<AggregatedTable, AggregateError> {
        aggregate_files(dir, self.read_timeout)
            .with_subscriber(self.log.dispatch().clone())
            .await
    }
}

async fn aggregate_files(dir: &Path, read_timeout: Duration) -> Result<AggregatedTable, AggregateError> {
    info!(dir = %dir.display(), "Aggregating analysis data...");

    let files = json_files(dir)
        .await
        .map_err(|source| AggregateError::Io { path: dir.to_path_buf(), source })?;
    let submitted = files.len();

    let mut set = JoinSet::new();
    for (idx, path) in files.into_iter().enumerate() {
        set.spawn(async move { (idx, read_row(path, read_timeout).await) }.with_current_subscriber());
    }

    let mut slots: Vec<Option<Result<CityRow, RowError>>> = vec![None; submitted];
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((idx, outcome)) => slots[idx] = Some(outcome),
            Err(err) => warn!(error = %err, "Aggregation task lost"),
        }
    }

    let table = assemble(collect_outcomes(slots)?);
    info!(rows = table.len(), dropped = submitted - table.len(), "Aggregation finished");
    Ok(table)
}

/// Every submitted city must have an outcome, failed or not.
fn collect_outcomes(
    slots: Vec<Option<Result<CityRow, RowError>>>,
) -> Result<Vec<Result<CityRow, RowError>>, AggregateError> {
    let submitted = slots.len();
    let accounted = slots.iter().filter(|slot| slot.is_some()).count();
    slots
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or(AggregateError::Incomplete { submitted, accounted })
}

async fn read_row(path: PathBuf, limit: Duration) -> Result<CityRow, RowError> {
    let city = display_name(&path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default());

    let bytes = match tokio::time::timeout(limit, tokio::fs::read(&path)).await {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(err)) => {
            return Err(RowError::UnreadableDocument { city, reason: err.to_string() });
        }
        Err(_) => {
            return Err(RowError::UnreadableDocument {
                city,
                reason: format!("read timed out after {limit:?}"),
            });
        }
    };

    Aggregator::build_row_from_slice(&bytes, &city)
}

/// Drop failures and duplicate cities, then sort.
fn assemble(outcomes: Vec<Result<CityRow, RowError>>) -> AggregatedTable {
    let mut seen = HashSet::new();
    let mut rows = Vec::with_capacity(outcomes.len());

    for outcome in outcomes {
        match outcome {
            Ok(row) if !seen.insert(row.city.clone()) => {
                warn!(city = %row.city, "Duplicate city, keeping the first row");
            }
            Ok(row) => rows.push(row),
            Err(err) => warn!("{err}; city dropped"),
        }
    }

    AggregatedTable::from_rows(rows)
}
