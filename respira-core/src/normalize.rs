use crate::{
    model::{AirQualityRecord, PollutantBreakdown, RawCityReading, RecordLocation, Wind},
    registry::Location,
    severity::classify,
};

/// Build the canonical record for `target` out of a full fetch.
///
/// Readings are matched by `city_id`; readings without an id (older payload
/// shapes) are matched by name. Returns `None` when no reading matches or the
/// match has no AQI: a missing reading is never reported as clean air.
pub fn normalize(readings: &[RawCityReading], target: &Location) -> Option<AirQualityRecord> {
    let reading = find_reading(readings, target)?;
    let aqi = reading.aqi?;

    let location = RecordLocation {
        id: target.id,
        name: if reading.city_name.trim().is_empty() {
            target.name.clone()
        } else {
            reading.city_name.clone()
        },
        latitude: reading.latitude.unwrap_or(target.latitude),
        longitude: reading.longitude.unwrap_or(target.longitude),
    };

    Some(AirQualityRecord {
        aqi,
        status: classify(f64::from(aqi)),
        pollutants: PollutantBreakdown::UNAVAILABLE,
        temperature_c: reading.temperature_c,
        humidity_percent: reading.humidity_percent,
        wind: Wind {
            speed_ms: reading.wind_speed_ms,
            direction_deg: reading.wind_direction_deg,
        },
        timestamp: reading.reading_timestamp.or(reading.last_update_at),
        location,
        weather_icon_code: reading.weather_icon_code.clone(),
        main_pollutant: reading.main_pollutant.clone(),
    })
}

fn find_reading<'a>(
    readings: &'a [RawCityReading],
    target: &Location,
) -> Option<&'a RawCityReading> {
    readings.iter().find(|r| r.city_id == Some(target.id)).or_else(|| {
        readings
            .iter()
            .filter(|r| r.city_id.is_none())
            .find(|r| r.city_name.trim().eq_ignore_ascii_case(target.name.trim()))
    })
}
