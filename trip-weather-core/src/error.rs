use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Please check that city {0} exists")]
    UnknownCity(String),
}

/// Failure of a single forecast request.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Something wrong with API: {0}")]
    Connection(#[source] reqwest::Error),

    #[error("Bad API request: status {status}: {body}")]
    BadStatus {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Bad JSON data from response: {0}")]
    InvalidResponse(#[source] serde_json::Error),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Analyze command error [Code {code}]: {stderr}")]
    Command { code: i32, stderr: String },

    #[error("Forecast in {path} is not valid: {source}")]
    InvalidForecast {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Why a city has no row in the aggregated table.
///
/// None of these abort the batch: the aggregator logs them and moves on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("document for {city} is unreadable: {reason}")]
    UnreadableDocument { city: String, reason: String },

    #[error("no {field} values to average for {city}")]
    EmptyMean { city: String, field: &'static str },

    #[error("rating for {city} is undefined: average precipitation-free hours is zero")]
    UndefinedRating { city: String },
}

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("Failed to list analysis directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Aggregation incomplete: {accounted} of {submitted} cities accounted for")]
    Incomplete { submitted: usize, accounted: usize },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectError {
    #[error(
        "No city data to rate: every city was dropped during aggregation.\n\
         Hint: check the log file for fetch and analysis errors."
    )]
    NoData,
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("Failed to write table {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to flush table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Table delimiter must be a single ASCII character, got {0:?}")]
    Delimiter(char),
}
