//! Delimited export of an [`AggregatedTable`].
//!
//! One record per city: the city name, a temperature and a dry-hours column
//! for every date, both averages, then the rating. Dates are the union of
//! every city's dates in chronological order; a city without a value for a
//! date leaves the cell empty.

use std::{collections::BTreeSet, path::Path};

use chrono::NaiveDate;
use csv::WriterBuilder;
use tracing::info;

use crate::{config::TableConfig, error::TableError, model::AggregatedTable};

const TEMPERATURE_SUFFIX: &str = "temperature";
const DRY_HOURS_SUFFIX: &str = "dry hours";

/// Union of row dates, chronological. Unparseable dates sort after real ones.
pub fn date_axis(table: &AggregatedTable) -> Vec<String> {
    let dates: BTreeSet<&str> =
        table.rows().iter().flat_map(|row| row.daily.iter().map(|d| d.date.as_str())).collect();

    let mut dates: Vec<String> = dates.into_iter().map(str::to_string).collect();
    dates.sort_by_key(|d| (NaiveDate::parse_from_str(d, "%Y-%m-%d").is_err(), d.clone()));
    dates
}

fn format_number(value: f64, decimal_separator: char) -> String {
    let text = format!("{value:.3}");
    if decimal_separator == '.' { text } else { text.replace('.', &decimal_separator.to_string()) }
}

/// Table as records, header first.
pub fn to_records(table: &AggregatedTable, format: &TableConfig) -> Vec<Vec<String>> {
    let dates = date_axis(table);
    let num =
        |v: Option<f64>| v.map(|v| format_number(v, format.decimal_separator)).unwrap_or_default();

    let mut header = vec!["City".to_string()];
    for date in &dates {
        header.push(format!("{date} {TEMPERATURE_SUFFIX}"));
        header.push(format!("{date} {DRY_HOURS_SUFFIX}"));
    }
    header.push(format!("Average {TEMPERATURE_SUFFIX}"));
    header.push(format!("Average {DRY_HOURS_SUFFIX}"));
    header.push("Rating".to_string());

    let mut records = vec![header];
    for row in table.rows() {
        let mut record = vec![row.city.clone()];
        for date in &dates {
            let day = row.daily.iter().find(|d| &d.date == date);
            record.push(num(day.and_then(|d| d.temp_avg)));
            record.push(num(day.and_then(|d| d.precip_free_hours)));
        }
        record.push(num(Some(row.avg_temperature)));
        record.push(num(Some(row.avg_precip_free_hours)));
        record.push(row.rating.to_string());
        records.push(record);
    }
    records
}

/// Write the table to `path`, replacing any previous file.
pub fn persist(table: &AggregatedTable, path: &Path, format: &TableConfig) -> Result<(), TableError> {
    if !format.delimiter.is_ascii() {
        return Err(TableError::Delimiter(format.delimiter));
    }
    let delimiter = format.delimiter as u8;

    let csv_err = |source| TableError::Csv { path: path.to_path_buf(), source };
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(false)
        .from_path(path)
        .map_err(csv_err)?;

    for record in to_records(table, format) {
        writer.write_record(&record).map_err(csv_err)?;
    }
    writer.flush().map_err(|source| TableError::Io { path: path.to_path_buf(), source })?;

    info!(path = %path.display(), rows = table.len(), "Aggregated table saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CityRow, DayFigures};
    use tempfile::tempdir;

    fn figures(date: &str, t: Option<f64>, h: Option<f64>) -> DayFigures {
        DayFigures { date: date.to_string(), temp_avg: t, precip_free_hours: h }
    }

    fn table() -> AggregatedTable {
        AggregatedTable::from_rows(vec![
            CityRow {
                city: "Moscow".into(),
                daily: vec![
                    figures("2022-05-18", Some(13.091), Some(11.0)),
                    figures("2022-05-19", None, None),
                ],
                avg_temperature: 13.09,
                avg_precip_free_hours: 11.0,
                rating: 1,
            },
            CityRow {
                city: "Paris".into(),
                daily: vec![
                    figures("2022-05-19", Some(24.0), Some(6.0)),
                    figures("2022-05-20", Some(23.06), Some(5.0)),
                ],
                avg_temperature: 23.53,
                avg_precip_free_hours: 5.5,
                rating: 4,
            },
        ])
    }

    #[test]
    fn date_axis_is_union_in_order() {
        assert_eq!(date_axis(&table()), ["2022-05-18", "2022-05-19", "2022-05-20"]);
    }

    #[test]
    fn records_follow_rating_order_with_gaps() {
        let format = TableConfig { delimiter: ';', decimal_separator: ',' };
        let records = to_records(&table(), &format);

        assert_eq!(
            records[0],
            [
                "City",
                "2022-05-18 temperature",
                "2022-05-18 dry hours",
                "2022-05-19 temperature",
                "2022-05-19 dry hours",
                "2022-05-20 temperature",
                "2022-05-20 dry hours",
                "Average temperature",
                "Average dry hours",
                "Rating",
            ]
        );
        assert_eq!(
            records[1],
            ["Paris", "", "", "24,000", "6,000", "23,060", "5,000", "23,530", "5,500", "4"]
        );
        assert_eq!(
            records[2],
            ["Moscow", "13,091", "11,000", "", "", "", "", "13,090", "11,000", "1"]
        );
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.len() == records[0].len()));
    }

    #[test]
    fn persist_writes_delimited_file() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("aggregated_data.csv");
        let format = TableConfig { delimiter: ',', decimal_separator: '.' };

        persist(&table(), &path, &format).expect("persist");

        let contents = std::fs::read_to_string(&path).expect("csv");
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("City,2022-05-18 temperature,2022-05-18 dry hours,"));
        assert_eq!(lines[1], "Paris,,,24.000,6.000,23.060,5.000,23.530,5.500,4");
        assert_eq!(lines[2], "Moscow,13.091,11.000,,,,,13.090,11.000,1");
    }

    #[test]
    fn persist_rejects_non_ascii_delimiter() {
        let dir = tempdir().expect("tempdir");
        let format = TableConfig { delimiter: '→', decimal_separator: ',' };

        let err = persist(&table(), &dir.path().join("t.csv"), &format).unwrap_err();
        assert!(matches!(err, TableError::Delimiter('→')));
    }

    #[test]
    fn persist_rejects_latin1_delimiter() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("t.csv");
        let format = TableConfig { delimiter: 'é', decimal_separator: ',' };

        let err = persist(&table(), &path, &format).unwrap_err();
        assert!(matches!(err, TableError::Delimiter('é')));
        assert!(!path.exists());
    }
}
