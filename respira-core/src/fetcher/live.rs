use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{model::RawCityReading, wire};

use super::{AirQualityFetcher, FetchError};

/// Fetches the latest readings for all cities from the MonterreyRespira
/// endpoint.
#[derive(Debug, Clone)]
pub struct LiveFetcher {
    endpoint: String,
    http: Client,
}

impl LiveFetcher {
    pub fn new(endpoint: String, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("respira/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { endpoint, http })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AirQualityFetcher for LiveFetcher {
    async fn fetch_all(&self) -> Result<Vec<RawCityReading>, FetchError> {
        debug!(endpoint = %self.endpoint, "requesting latest readings");

        let res = self.http.get(&self.endpoint).send().await.map_err(|e| {
            warn!(error = %e, "request to air quality source failed");
            FetchError::Transport(describe(&e))
        })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| FetchError::Transport(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let readings = wire::decode_readings(&body)?;
        if readings.is_empty() {
            return Err(FetchError::Empty);
        }

        debug!(readings = readings.len(), "received readings");
        Ok(readings)
    }
}

fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("could not connect to server: {err}")
    } else {
        err.to_string()
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let cut = (0..=MAX)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}
