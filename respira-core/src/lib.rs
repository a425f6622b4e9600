//! Core library for the Respira air quality dashboard.
//!
//! This crate defines:
//! - Severity classification and presentation themes
//! - The registry of monitoring locations
//! - Fetchers for the live and simulated sources
//! - A single-slot expiring cache
//! - Normalization of upstream readings into canonical records
//! - The [`Dashboard`] that keeps the selected location's data current
//!
//! It is used by `respira-cli`, but any UI can subscribe to a [`Dashboard`].

pub mod advisory;
pub mod alerts;
pub mod cache;
pub mod clock;
pub mod config;
pub mod dashboard;
pub mod fetcher;
pub mod history;
pub mod model;
pub mod normalize;
pub mod registry;
pub mod severity;
pub mod theme;
pub mod wire;

pub use config::Config;
pub use dashboard::{Dashboard, DashboardState, DataSource, Phase};
pub use fetcher::{AirQualityFetcher, FetchError, SourceKind};
pub use model::{AirQualityRecord, RawCityReading};
pub use normalize::normalize;
pub use registry::{Location, LocationRegistry};
pub use severity::{Severity, classify};
pub use theme::{Theme, theme_for};
