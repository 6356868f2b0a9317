use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::lookup::{LookupError, ReverseLookup};
use crate::models::Coordinate;

pub const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org/reverse";
pub const DEFAULT_USER_AGENT: &str = "geostamp/0.1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Reverse geocoding against a Nominatim-compatible `/reverse` endpoint.
pub struct NominatimLookup {
    client: reqwest::Client,
    endpoint: String,
}

impl NominatimLookup {
    pub fn new(endpoint: impl Into<String>, user_agent: &str) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| LookupError::RequestFailed(err.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait::async_trait]
impl ReverseLookup for NominatimLookup {
    async fn lookup(&self, coordinate: &Coordinate) -> Result<String, LookupError> {
        let params = [
            ("lat", coordinate.latitude().to_string()),
            ("lon", coordinate.longitude().to_string()),
            ("format", String::from("jsonv2")),
        ];
        let url = reqwest::Url::parse_with_params(&self.endpoint, &params)
            .map_err(|err| LookupError::RequestFailed(err.to_string()))?;

        debug!("reverse lookup: {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| LookupError::RequestFailed(err.to_string()))?;

        let body: Value = response
            .json()
            .await
            .map_err(|err| LookupError::RequestFailed(err.to_string()))?;

        display_name(&body).ok_or_else(|| LookupError::NoMatch(coordinate.clone()))
    }
}

fn display_name(body: &Value) -> Option<String> {
    if body.get("error").is_some() {
        return None;
    }

    body.get("display_name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
}
