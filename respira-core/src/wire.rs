//! Decoding of upstream payloads.
//!
//! The upstream schema has changed over time. The current shape decodes
//! straight into [`RawCityReading`]; older shapes get their own struct and a
//! conversion. Nothing past this module sees the wire format.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::{fetcher::FetchError, model::RawCityReading};

#[derive(Debug, Deserialize)]
struct LegacyWind {
    #[serde(default)]
    speed: Option<f64>,
    #[serde(default)]
    direction: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct LegacyLocation {
    name: String,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
}

/// First-generation shape: no city id, location nested, matched by name.
#[derive(Debug, Deserialize)]
struct CityReadingV1 {
    #[serde(default)]
    aqi: Option<i32>,
    #[serde(default)]
    temperature: Option<f64>,
    #[serde(default)]
    humidity: Option<f64>,
    #[serde(default)]
    wind: Option<LegacyWind>,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    location: LegacyLocation,
}

impl From<CityReadingV1> for RawCityReading {
    fn from(v: CityReadingV1) -> Self {
        let (wind_speed_ms, wind_direction_deg) =
            v.wind.map(|w| (w.speed, w.direction)).unwrap_or((None, None));

        RawCityReading {
            city_id: None,
            city_name: v.location.name,
            latitude: v.location.latitude,
            longitude: v.location.longitude,
            reading_timestamp: v.timestamp,
            aqi: v.aqi,
            main_pollutant: None,
            temperature_c: v.temperature,
            humidity_percent: v.humidity,
            wind_speed_ms,
            wind_direction_deg,
            weather_icon_code: None,
            last_update_at: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireReading {
    Current(RawCityReading),
    V1(CityReadingV1),
}

impl From<WireReading> for RawCityReading {
    fn from(w: WireReading) -> Self {
        match w {
            WireReading::Current(r) => r,
            WireReading::V1(v) => v.into(),
        }
    }
}

/// Decode a response body into readings.
///
/// The body must be a JSON array whose elements all match a known shape.
/// An empty array is decoded successfully; callers decide whether that is an
/// error.
pub fn decode_readings(body: &str) -> Result<Vec<RawCityReading>, FetchError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| FetchError::Malformed(format!("response is not valid JSON: {e}")))?;

    let Value::Array(items) = value else {
        return Err(FetchError::Malformed(format!(
            "expected a JSON array, got {}",
            json_kind(&value)
        )));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value::<WireReading>(item)
                .map(RawCityReading::from)
                .map_err(|e| {
                    FetchError::Malformed(format!(
                        "element {i} matches no known reading shape: {e}"
                    ))
                })
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
