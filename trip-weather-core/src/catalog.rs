use std::collections::BTreeMap;

use crate::error::CatalogError;

const BASE_URL: &str = "https://code.s3.yandex.net/async-module";

/// Cities served by the forecast source, in the order they are fetched.
pub const DEFAULT_CITIES: &[&str] = &[
    "MOSCOW",
    "PARIS",
    "LONDON",
    "BERLIN",
    "BEIJING",
    "KAZAN",
    "SPETERSBURG",
    "VOLGOGRAD",
    "NOVOSIBIRSK",
    "KALININGRAD",
    "ABUDHABI",
    "WARSZAWA",
    "BUCHAREST",
    "ROMA",
    "CAIRO",
];

/// Maps city names to forecast URLs. Names are stored upper-case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityCatalog {
    urls: BTreeMap<String, String>,
    order: Vec<String>,
}

impl Default for CityCatalog {
    fn default() -> Self {
        Self::from_pairs(DEFAULT_CITIES.iter().map(|city| {
            let url = format!("{BASE_URL}/{}-response.json", city.to_lowercase());
            (city.to_string(), url)
        }))
    }
}

impl CityCatalog {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut urls = BTreeMap::new();
        let mut order = Vec::new();

        for (city, url) in pairs {
            let city = city.into().to_uppercase();
            if urls.insert(city.clone(), url.into()).is_none() {
                order.push(city);
            }
        }

        Self { urls, order }
    }

    /// Case-insensitive lookup.
    pub fn url_for(&self, city: &str) -> Result<&str, CatalogError> {
        self.urls
            .get(&city.to_uppercase())
            .map(String::as_str)
            .ok_or_else(|| CatalogError::UnknownCity(city.to_string()))
    }

    pub fn cities(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
