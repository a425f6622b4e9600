use crate::{
    Config, RawCityReading,
    fetcher::{live::LiveFetcher, simulated::SimulatedFetcher},
    registry::LocationRegistry,
};
use async_trait::async_trait;
use std::{convert::TryFrom, fmt::Debug, time::Duration};
use thiserror::Error;

pub mod live;
pub mod simulated;

/// Why a fetch produced no usable readings. Every variant is retryable from
/// the consumer's point of view.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("network error: {0}")]
    Transport(String),

    #[error("server responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response format: {0}")]
    Malformed(String),

    #[error("the source returned no readings")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Live,
    Simulated,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Live => "live",
            SourceKind::Simulated => "simulated",
        }
    }

    pub const fn all() -> &'static [SourceKind] {
        &[SourceKind::Live, SourceKind::Simulated]
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for SourceKind {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "live" => Ok(SourceKind::Live),
            "simulated" => Ok(SourceKind::Simulated),
            _ => Err(anyhow::anyhow!(
                "Unknown source '{value}'. Supported sources: live, simulated."
            )),
        }
    }
}

/// Retrieves the current readings for every known location in one call.
///
/// Implementations never retry and never return a partial set.
#[async_trait]
pub trait AirQualityFetcher: Send + Sync + Debug {
    async fn fetch_all(&self) -> Result<Vec<RawCityReading>, FetchError>;
}

/// Construct the fetcher for an explicit source.
pub fn fetcher_for(
    kind: SourceKind,
    config: &Config,
    registry: &LocationRegistry,
) -> anyhow::Result<Box<dyn AirQualityFetcher>> {
    let boxed: Box<dyn AirQualityFetcher> = match kind {
        SourceKind::Live => {
            let timeout = Duration::from_secs(config.request_timeout_secs);
            Box::new(LiveFetcher::new(config.endpoint().to_owned(), timeout)?)
        }
        SourceKind::Simulated => Box::new(SimulatedFetcher::new(registry.clone())),
    };

    Ok(boxed)
}

/// Construct the fetcher selected by `use_simulated_source`.
pub fn fetcher_from_config(
    config: &Config,
    registry: &LocationRegistry,
) -> anyhow::Result<Box<dyn AirQualityFetcher>> {
    fetcher_for(config.source_kind(), config, registry)
}
