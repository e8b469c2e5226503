use crate::core::country::{ExchangeRateSnapshot, RateTable};
use crate::core::error::{AppError, AppResult};
use crate::core::source::RateSource;
use crate::providers::util::fetch_text;
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

const SOURCE: &str = "exchange rates";

/// Client for the open.er-api.com latest-rates endpoint, USD based.
pub struct OpenErApiProvider {
    base_url: String,
    timeout: Duration,
}

impl OpenErApiProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        OpenErApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    result: String,
    #[serde(default)]
    rates: RateTable,
}

fn parse_rates(text: &str) -> AppResult<RateTable> {
    let data: RatesResponse = serde_json::from_str(text)
        .map_err(|e| AppError::SourceDataInvalid(format!("Failed to parse rates: {e}")))?;
    if data.result != "success" {
        return Err(AppError::SourceDataInvalid(format!(
            "Rate source reported result '{}'",
            data.result
        )));
    }
    Ok(data.rates)
}

#[async_trait]
impl RateSource for OpenErApiProvider {
    #[instrument(name = "RatesFetch", skip(self), fields(base_url = %self.base_url))]
    async fn fetch_rates(&self) -> AppResult<ExchangeRateSnapshot> {
        let url = format!("{}/v6/latest/USD", self.base_url);
        let text = fetch_text(SOURCE, &url, self.timeout).await?;
        let rates = parse_rates(&text)?;
        debug!("Fetched {} exchange rates", rates.len());
        Ok(ExchangeRateSnapshot {
            rates,
            captured_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v6/latest/USD"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;
        mock_server
    }

    #[tokio::test]
    async fn test_successful_rates_fetch() {
        let mock_response = r#"{
            "result": "success",
            "base_code": "USD",
            "time_last_update_unix": 1700000000,
            "rates": {"USD": 1, "NGN": 1600.25, "EUR": 0.92}
        }"#;
        let mock_server = create_mock_server(mock_response).await;
        let provider = OpenErApiProvider::new(&mock_server.uri(), Duration::from_secs(5));

        let snapshot = provider.fetch_rates().await.unwrap();
        assert_eq!(snapshot.rates.len(), 3);
        assert_eq!(snapshot.rates.get("NGN"), Some(&1600.25));
        assert_eq!(snapshot.rates.get("USD"), Some(&1.0));
    }

    #[tokio::test]
    async fn test_non_success_result_is_an_error() {
        let mock_response = r#"{"result": "error", "error-type": "unsupported-code"}"#;
        let mock_server = create_mock_server(mock_response).await;
        let provider = OpenErApiProvider::new(&mock_server.uri(), Duration::from_secs(5));

        let err = provider.fetch_rates().await.unwrap_err();
        assert!(matches!(err, AppError::SourceDataInvalid(_)), "{err:?}");
        assert_eq!(
            err.to_string(),
            "External data source returned invalid data: Rate source reported result 'error'"
        );
    }

    #[tokio::test]
    async fn test_malformed_rates_response() {
        let mock_server = create_mock_server(r#"{"rates": {"EUR": "x"}}"#).await;
        let provider = OpenErApiProvider::new(&mock_server.uri(), Duration::from_secs(5));

        let err = provider.fetch_rates().await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse rates"));
    }
}
