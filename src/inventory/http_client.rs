use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::domain::stock::{StockQuery, StockResult};
use super::{StockAvailabilityClient, StockCheckError};

/// One row of the inventory service's answer
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InventoryResponse {
    sku_code: String,
    #[serde(alias = "inStock")]
    is_in_stock: bool,
}

/// Talks to `GET {base_url}/api/inventory?skuCode=..&skuCode=..`
pub struct HttpStockClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStockClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, StockCheckError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| StockCheckError::Protocol(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/inventory", self.base_url)
    }
}

fn classify(error: reqwest::Error, deadline: Duration) -> StockCheckError {
    if error.is_timeout() {
        StockCheckError::Timeout(deadline)
    } else if error.is_connect() {
        StockCheckError::Unreachable(error.to_string())
    } else {
        StockCheckError::Protocol(error.to_string())
    }
}

#[async_trait]
impl StockAvailabilityClient for HttpStockClient {
    async fn check_availability(
        &self,
        query: &StockQuery,
        deadline: Duration,
    ) -> Result<StockResult, StockCheckError> {
        let params: Vec<(&str, &str)> = query
            .codes()
            .iter()
            .map(|code| ("skuCode", code.as_str()))
            .collect();

        tracing::debug!(
            codes = query.len(),
            deadline_ms = deadline.as_millis() as u64,
            "Checking stock availability"
        );

        let response = self
            .client
            .get(self.endpoint())
            .query(&params)
            .timeout(deadline)
            .send()
            .await
            .map_err(|e| classify(e, deadline))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StockCheckError::Protocol(format!(
                "inventory responded with status {}",
                status
            )));
        }

        let rows: Vec<InventoryResponse> = response
            .json()
            .await
            .map_err(|e| classify(e, deadline))?;

        let result: StockResult = rows
            .into_iter()
            .map(|row| (row.sku_code, row.is_in_stock))
            .collect();

        tracing::debug!(
            requested = query.len(),
            answered = result.len(),
            "Stock availability received"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_single_batched_request_for_all_codes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/inventory"))
            .and(query_param("skuCode", "SKU1"))
            .and(query_param("skuCode", "SKU2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "skuCode": "SKU1", "isInStock": true },
                { "skuCode": "SKU2", "isInStock": false }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpStockClient::new(server.uri()).unwrap();
        let query = StockQuery::from_codes(["SKU1", "SKU2", "SKU1"]);

        let result = client
            .check_availability(&query, Duration::from_secs(2))
            .await
            .unwrap();

        assert!(result.is_available("SKU1"));
        assert!(!result.is_available("SKU2"));
        assert_eq!(result.first_unavailable(&query), Some("SKU2"));
    }

    #[tokio::test]
    async fn test_codes_missing_from_answer_are_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/inventory"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "skuCode": "SKU1", "inStock": true }
            ])))
            .mount(&server)
            .await;

        let client = HttpStockClient::new(format!("{}/", server.uri())).unwrap();
        let query = StockQuery::from_codes(["SKU1", "UNKNOWN"]);

        let result = client
            .check_availability(&query, Duration::from_secs(2))
            .await
            .unwrap();

        assert!(result.is_available("SKU1"));
        assert_eq!(result.first_unavailable(&query), Some("UNKNOWN"));
    }

    #[tokio::test]
    async fn test_server_error_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/inventory"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = HttpStockClient::new(server.uri()).unwrap();
        let result = client
            .check_availability(&StockQuery::from_codes(["SKU1"]), Duration::from_secs(2))
            .await;

        assert!(matches!(result, Err(StockCheckError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_malformed_body_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/inventory"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = HttpStockClient::new(server.uri()).unwrap();
        let result = client
            .check_availability(&StockQuery::from_codes(["SKU1"]), Duration::from_secs(2))
            .await;

        assert!(matches!(result, Err(StockCheckError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_slow_inventory_times_out_at_deadline() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/inventory"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([]))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client = HttpStockClient::new(server.uri()).unwrap();
        let started = std::time::Instant::now();
        let result = client
            .check_availability(&StockQuery::from_codes(["SKU1"]), Duration::from_millis(200))
            .await;

        assert!(matches!(result, Err(StockCheckError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_refused_connection_is_unreachable() {
        // Nothing listens on the discard port locally
        let client = HttpStockClient::new("http://127.0.0.1:9").unwrap();
        let result = client
            .check_availability(&StockQuery::from_codes(["SKU1"]), Duration::from_secs(2))
            .await;

        assert!(matches!(result, Err(StockCheckError::Unreachable(_))));
    }
}
