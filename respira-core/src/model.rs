use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::severity::Severity;

/// One location's reading as delivered by the upstream source.
///
/// This is the unit that gets cached. Older payload shapes are converted into
/// it by [`crate::wire`], which is why `city_id` is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCityReading {
    #[serde(default)]
    pub city_id: Option<u32>,
    #[serde(alias = "name")]
    pub city_name: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub reading_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub aqi: Option<i32>,
    #[serde(default)]
    pub main_pollutant: Option<String>,
    #[serde(default)]
    pub temperature_c: Option<f64>,
    #[serde(default)]
    pub humidity_percent: Option<f64>,
    #[serde(default)]
    pub wind_speed_ms: Option<f64>,
    #[serde(default)]
    pub wind_direction_deg: Option<f64>,
    #[serde(default)]
    pub weather_icon_code: Option<String>,
    #[serde(default)]
    pub last_update_at: Option<DateTime<Utc>>,
}

impl RawCityReading {
    /// A reading with only identity fields set.
    pub fn new(city_id: Option<u32>, city_name: impl Into<String>) -> Self {
        Self {
            city_id,
            city_name: city_name.into(),
            latitude: None,
            longitude: None,
            reading_timestamp: None,
            aqi: None,
            main_pollutant: None,
            temperature_c: None,
            humidity_percent: None,
            wind_speed_ms: None,
            wind_direction_deg: None,
            weather_icon_code: None,
            last_update_at: None,
        }
    }

    pub fn with_aqi(mut self, aqi: i32) -> Self {
        self.aqi = Some(aqi);
        self
    }
}

/// Per-pollutant concentrations.
///
/// The live source only publishes the composite index, so every field is
/// `None` for its readings: the breakdown is not available from the current
/// source. `None` means unknown, never zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PollutantBreakdown {
    pub pm25: Option<f64>,
    pub pm10: Option<f64>,
    pub o3: Option<f64>,
    pub no2: Option<f64>,
    pub so2: Option<f64>,
    pub co: Option<f64>,
}

impl PollutantBreakdown {
    pub const UNAVAILABLE: PollutantBreakdown = PollutantBreakdown {
        pm25: None,
        pm10: None,
        o3: None,
        no2: None,
        so2: None,
        co: None,
    };

    pub fn is_available(&self) -> bool {
        [self.pm25, self.pm10, self.o3, self.no2, self.so2, self.co].iter().any(Option::is_some)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed_ms: Option<f64>,
    pub direction_deg: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordLocation {
    /// Registry id of the location the record was built for.
    pub id: u32,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Normalized snapshot of the selected location's current reading.
///
/// `status` always equals `classify(aqi)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualityRecord {
    pub aqi: i32,
    pub status: Severity,
    pub pollutants: PollutantBreakdown,
    pub temperature_c: Option<f64>,
    pub humidity_percent: Option<f64>,
    pub wind: Wind,
    pub timestamp: Option<DateTime<Utc>>,
    pub location: RecordLocation,
    pub weather_icon_code: Option<String>,
    pub main_pollutant: Option<String>,
}
