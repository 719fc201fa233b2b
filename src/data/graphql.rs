//! Product GraphQL API.
//!
//! One blocking POST per product, asking only for the price history.

use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::{Value, json};

use crate::data::html::product_id_from_path;
use crate::data::json::find_price_history;
use crate::data::source::Source;
use crate::domain::RawObservation;
use crate::error::AppError;
use crate::io::ingest::observations_from_values;

const DEFAULT_TIMEOUT_SECS: u64 = 20;
const OPERATION_NAME: &str = "PDP_GET_PRODUCT_DETAILS";
const QUERY: &str = "query PDP_GET_PRODUCT_DETAILS($productId: Int!) {
  productDetails: productDetailsV4(productId: $productId) {
    product {
      priceDevelopment {
        priceHistory { date price { amountIncl } }
      }
    }
  }
}";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphqlRequest<'a> {
    operation_name: &'a str,
    variables: Value,
    query: &'a str,
}

/// Price history for the product behind `product_url`.
pub struct GraphqlSource {
    client: Client,
    endpoint: Url,
    product_id: u64,
}

impl GraphqlSource {
    /// Build from a product URL; the endpoint defaults to `https://<host>/api/graphql`.
    ///
    /// `PRICE_HISTORY_ENDPOINT` and `PRICE_HISTORY_TIMEOUT_SECS` (also read
    /// from `.env`) override the endpoint and the request timeout.
    pub fn from_env(product_url: &str) -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let url = Url::parse(product_url)
            .map_err(|e| AppError::input(format!("Invalid product URL '{product_url}': {e}")))?;
        let product_id = product_id_from_path(url.path())
            .ok_or_else(|| AppError::input(format!("No product id in URL '{product_url}'.")))?;

        let endpoint = match std::env::var("PRICE_HISTORY_ENDPOINT") {
            Ok(raw) => Url::parse(&raw)
                .map_err(|e| AppError::input(format!("Invalid PRICE_HISTORY_ENDPOINT '{raw}': {e}")))?,
            Err(_) => {
                let host = url
                    .host_str()
                    .ok_or_else(|| AppError::input(format!("No host in URL '{product_url}'.")))?;
                Url::parse(&format!("https://{host}/api/graphql"))
                    .map_err(|e| AppError::input(format!("Invalid API endpoint for host '{host}': {e}")))?
            }
        };

        let timeout_secs = match std::env::var("PRICE_HISTORY_TIMEOUT_SECS") {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|_| {
                AppError::input(format!("PRICE_HISTORY_TIMEOUT_SECS must be a whole number of seconds, got '{raw}'."))
            })?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::runtime(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            product_id,
        })
    }

    pub fn product_id(&self) -> u64 {
        self.product_id
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn request_body(&self) -> GraphqlRequest<'static> {
        GraphqlRequest {
            operation_name: OPERATION_NAME,
            variables: json!({ "productId": self.product_id }),
            query: QUERY,
        }
    }
}

impl Source for GraphqlSource {
    fn name(&self) -> &str {
        "graphql"
    }

    fn fetch(&self) -> Result<Option<Vec<RawObservation>>, AppError> {
        tracing::debug!(endpoint = %self.endpoint, product_id = self.product_id, "requesting price history");

        let resp = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&self.request_body())
            .send()
            .map_err(|e| AppError::runtime(format!("Price history request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::runtime(format!(
                "Price history request failed with status {}.",
                resp.status()
            )));
        }

        let body: Value = resp
            .json()
            .map_err(|e| AppError::runtime(format!("Failed to parse price history response: {e}")))?;

        Ok(observations_from_response(&body))
    }
}

/// Observations from a GraphQL response body.
pub fn observations_from_response(body: &Value) -> Option<Vec<RawObservation>> {
    if let Some(errors) = body.get("errors").and_then(Value::as_array) {
        for err in errors {
            tracing::warn!(error = %err, "GraphQL error");
        }
    }
    let items = find_price_history(body, &["priceHistory"])?;
    let observations = observations_from_values(items);
    (!observations.is_empty()).then_some(observations)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_history_is_extracted() {
        let body = json!({
            "data": {"productDetails": {"product": {"priceDevelopment": {"priceHistory": [
                {"date": "2025-01-02T00:00:00+01:00", "price": {"amountIncl": 249.0}},
                {"date": "2025-02-10T00:00:00+01:00", "price": {"amountIncl": 229.0}}
            ]}}}}
        });
        let observations = observations_from_response(&body).unwrap();
        assert_eq!(observations.len(), 2);
    }

    #[test]
    fn error_response_has_no_history() {
        let body = json!({"errors": [{"message": "not found"}], "data": null});
        assert!(observations_from_response(&body).is_none());
    }

    #[test]
    fn request_body_shape() {
        let body = GraphqlRequest {
            operation_name: OPERATION_NAME,
            variables: json!({ "productId": 42 }),
            query: QUERY,
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["operationName"], "PDP_GET_PRODUCT_DETAILS");
        assert_eq!(v["variables"]["productId"], 42);
        assert!(v["query"].as_str().unwrap().contains("priceHistory"));
    }
}
