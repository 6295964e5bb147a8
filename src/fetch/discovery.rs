use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::endpoint::Endpoint;
use super::fetcher::{FetchError, Fetcher};

/// Names of every index in the exchange's all-indices listing.
pub async fn discover_indices(
    fetcher: &Fetcher,
    shutdown: &CancellationToken,
) -> Result<Vec<String>, FetchError> {
    let payload = fetcher.fetch(&Endpoint::AllIndices, shutdown).await?;
    Ok(index_names(&payload))
}

/// Index and equity symbols that have option chains.
pub async fn discover_underlyings(
    fetcher: &Fetcher,
    shutdown: &CancellationToken,
) -> Result<Underlyings, FetchError> {
    let payload = fetcher.fetch(&Endpoint::Underlyings, shutdown).await?;
    Ok(Underlyings::from_payload(&payload))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Underlyings {
    pub indices: Vec<String>,
    pub stocks: Vec<String>,
}

impl Underlyings {
    pub fn from_payload(payload: &Value) -> Self {
        Self {
            indices: symbols(&payload["data"]["IndexList"]),
            stocks: symbols(&payload["data"]["UnderlyingList"]),
        }
    }
}

pub fn index_names(payload: &Value) -> Vec<String> {
    payload["data"]
        .as_array()
        .map(|rows| {
            rows.iter()
                .filter_map(|row| row.get("index").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn symbols(list: &Value) -> Vec<String> {
    list.as_array()
        .map(|rows| {
            rows.iter()
                .filter_map(|row| row.get("symbol").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
