use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::error::FetchError;

use super::ForecastSource;

/// Fetches forecast JSON over HTTP with a per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpForecastSource {
    http: Client,
}

impl HttpForecastSource {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder().timeout(timeout).build().map_err(FetchError::Client)?;
        Ok(Self { http })
    }
}

#[async_trait]
impl ForecastSource for HttpForecastSource {
    async fn get_forecast(&self, url: &str) -> Result<serde_json::Value, FetchError> {
        let res = self.http.get(url).send().await.map_err(FetchError::Connection)?;

        let status = res.status();
        let body = res.text().await.map_err(FetchError::Connection)?;

        if !status.is_success() {
            return Err(FetchError::BadStatus { status, body: truncate_body(&body) });
        }

        serde_json::from_str(&body).map_err(FetchError::InvalidResponse)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    fn source() -> HttpForecastSource {
        HttpForecastSource::new(Duration::from_secs(5)).expect("client")
    }

    #[tokio::test]
    async fn returns_parsed_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/moscow-response.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"forecasts": []})))
            .mount(&server)
            .await;

        let url = format!("{}/moscow-response.json", server.uri());
        let data = source().get_forecast(&url).await.expect("forecast");

        assert_eq!(data, json!({"forecasts": []}));
    }

    #[tokio::test]
    async fn non_success_status_is_bad_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = source().get_forecast(&server.uri()).await.unwrap_err();

        match err {
            FetchError::BadStatus { status, body } => {
                assert_eq!(status.as_u16(), 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&server)
            .await;

        let err = source().get_forecast(&server.uri()).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_connection_error() {
        let err = source().get_forecast("http://127.0.0.1:9/forecast.json").await.unwrap_err();
        assert!(matches!(err, FetchError::Connection(_)));
    }

    #[test]
    fn truncates_long_bodies() {
        let long = "x".repeat(300);
        assert_eq!(truncate_body(&long).len(), 203);
        assert_eq!(truncate_body("short"), "short");
    }
}
