use async_trait::async_trait;
use chrono::Utc;
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::sync::Mutex;

use crate::{model::RawCityReading, registry::LocationRegistry};

use super::{AirQualityFetcher, FetchError};

/// Stand-in source producing plausible random readings for every registry
/// location. Used for demos and when no live endpoint is reachable.
#[derive(Debug)]
pub struct SimulatedFetcher {
    registry: LocationRegistry,
    rng: Mutex<StdRng>,
}

impl SimulatedFetcher {
    pub fn new(registry: LocationRegistry) -> Self {
        Self {
            registry,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_seed(registry: LocationRegistry, seed: u64) -> Self {
        Self {
            registry,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

#[async_trait]
impl AirQualityFetcher for SimulatedFetcher {
    async fn fetch_all(&self) -> Result<Vec<RawCityReading>, FetchError> {
        let now = Utc::now();
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());

        let readings = self
            .registry
            .iter()
            .map(|loc| RawCityReading {
                city_id: Some(loc.id),
                city_name: loc.name.clone(),
                latitude: Some(loc.latitude),
                longitude: Some(loc.longitude),
                reading_timestamp: Some(now),
                aqi: Some(rng.gen_range(30..230)),
                main_pollutant: Some("pm25".to_string()),
                temperature_c: Some(f64::from(rng.gen_range(20..35_i32))),
                humidity_percent: Some(f64::from(rng.gen_range(40..70_i32))),
                wind_speed_ms: Some(f64::from(rng.gen_range(5..25_i32))),
                wind_direction_deg: Some(f64::from(rng.gen_range(0..360_i32))),
                weather_icon_code: None,
                last_update_at: Some(now),
            })
            .collect();

        Ok(readings)
    }
}
