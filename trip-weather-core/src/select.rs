use tracing::info;

use crate::{
    error::SelectError,
    logging::LogContext,
    model::{AggregatedTable, Conclusion},
};

pub const REPORT_HEADER: &str = "Favorable cities for a trip / Города благоприятные для поездки:";

/// Picks the best-rated cities of an aggregated table.
#[derive(Debug, Clone)]
pub struct Selector {
    log: LogContext,
}

impl Selector {
    pub fn new(log: LogContext) -> Self {
        Self { log }
    }

    /// Every city sharing the maximum rating, in table order.
    pub fn select(&self, table: &AggregatedTable) -> Result<Conclusion, SelectError> {
        self.log.scope(|| -> Result<Conclusion, SelectError> {
            let max_rating =
                table.rows().iter().map(|row| row.rating).max().ok_or(SelectError::NoData)?;

            let cities: Vec<String> = table
                .rows()
                .iter()
                .filter(|row| row.rating == max_rating)
                .map(|row| row.city.clone())
                .collect();

            info!(max_rating, cities = ?cities, "Best cities selected");
            Ok(Conclusion { max_rating, cities })
        })
    }
}

impl Conclusion {
    /// Header line, then one city per line.
    pub fn render(&self) -> String {
        std::iter::once(REPORT_HEADER)
            .chain(self.cities.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CityRow;

    fn row(city: &str, rating: i64) -> CityRow {
        CityRow {
            city: city.to_string(),
            daily: Vec::new(),
            avg_temperature: 0.0,
            avg_precip_free_hours: 1.0,
            rating,
        }
    }

    fn selector() -> Selector {
        Selector::new(LogContext::silent())
    }

    #[test]
    fn single_winner() {
        let table = AggregatedTable::from_rows(vec![row("Moscow", 1), row("Paris", 15)]);

        let conclusion = selector().select(&table).expect("conclusion");

        assert_eq!(conclusion, Conclusion { max_rating: 15, cities: vec!["Paris".into()] });
        assert_eq!(conclusion.render(), format!("{REPORT_HEADER}\nParis"));
    }

    #[test]
    fn all_tied_cities_are_reported() {
        let table = AggregatedTable::from_rows(vec![
            row("Berlin", 3),
            row("Cairo", 7),
            row("London", 5),
            row("Abudhabi", 7),
            row("Roma", 7),
        ]);

        let conclusion = selector().select(&table).expect("conclusion");

        assert_eq!(conclusion.max_rating, 7);
        assert_eq!(conclusion.cities, ["Cairo", "Abudhabi", "Roma"]);
        assert_eq!(conclusion.render(), format!("{REPORT_HEADER}\nCairo\nAbudhabi\nRoma"));
    }

    #[test]
    fn negative_ratings_still_have_a_maximum() {
        let table = AggregatedTable::from_rows(vec![row("Novosibirsk", -3), row("Kazan", -1)]);
        let conclusion = selector().select(&table).expect("conclusion");
        assert_eq!(conclusion.cities, ["Kazan"]);
    }

    #[test]
    fn computed_ratings_pick_paris() {
        use crate::{aggregate::Aggregator, model::DailyStatsDocument};

        let parse = |body: &str| -> DailyStatsDocument {
            serde_json::from_str(body).expect("document")
        };
        let moscow = parse(
            r#"{"days": [
                {"date": "2022-05-18", "temp_avg": 13.091, "relevant_cond_hours": 11},
                {"date": "2022-05-19", "temp_avg": 10.727, "relevant_cond_hours": 5},
                {"date": "2022-05-20", "temp_avg": 11.364, "relevant_cond_hours": 11},
                {"date": "2022-05-21", "temp_avg": null, "relevant_cond_hours": null},
                {"date": "2022-05-22"}
            ]}"#,
        );
        let paris = parse(
            r#"{"days": [
                {"date": "2022-05-18", "temp_avg": 23.0, "relevant_cond_hours": 5},
                {"date": "2022-05-19", "temp_avg": 24.06, "relevant_cond_hours": 6}
            ]}"#,
        );

        let table = Aggregator::new(LogContext::silent(), std::time::Duration::from_secs(1))
            .aggregate([("moscow", moscow), ("paris", paris)]);
        let conclusion = selector().select(&table).expect("conclusion");

        assert_eq!(conclusion, Conclusion { max_rating: 4, cities: vec!["Paris".into()] });
    }

    #[test]
    fn empty_table_is_no_data() {
        let err = selector().select(&AggregatedTable::default()).unwrap_err();
        assert_eq!(err, SelectError::NoData);
    }
}
