use serde::{Deserialize, Serialize};

/// Raw forecast for one city, as returned by the forecast source.
///
/// `forecast` is `None` when the city could not be resolved or fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherRecord {
    pub city: String,
    pub forecast: Option<serde_json::Value>,
}

/// Per-city output of the analysis step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStatsDocument {
    pub days: Vec<DayEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayEntry {
    pub date: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours_start: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours_end: Option<u32>,
    #[serde(default)]
    pub hours_count: u32,

    #[serde(default)]
    pub temp_avg: Option<f64>,

    #[serde(
        default,
        rename = "relevant_cond_hours",
        alias = "precipitation_free_hours"
    )]
    pub precipitation_free_hours: Option<f64>,
}

/// One day of a city row. Missing values stay `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct DayFigures {
    pub date: String,
    pub temp_avg: Option<f64>,
    pub precip_free_hours: Option<f64>,
}

/// Aggregated statistics of one city.
#[derive(Debug, Clone, PartialEq)]
pub struct CityRow {
    pub city: String,
    pub daily: Vec<DayFigures>,
    pub avg_temperature: f64,
    pub avg_precip_free_hours: f64,
    pub rating: i64,
}

/// City rows sorted by rating, best first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedTable {
    rows: Vec<CityRow>,
}

impl AggregatedTable {
    /// Stable sort by descending rating: equal ratings keep the given order.
    pub fn from_rows(mut rows: Vec<CityRow>) -> Self {
        rows.sort_by(|a, b| b.rating.cmp(&a.rating));
        Self { rows }
    }

    pub fn rows(&self) -> &[CityRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// The best-rated cities of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conclusion {
    pub max_rating: i64,
    pub cities: Vec<String>,
}

/// `"MOSCOW"` -> `"Moscow"`.
pub fn display_name(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
