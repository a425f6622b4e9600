use chrono::Local;
use respira_core::{
    AirQualityRecord, DashboardState, DataSource, LocationRegistry, Phase,
    advisory::{self, Pollutant},
    alerts::{AlertRule, triggered},
    history::HistoricalPoint,
    registry::Location,
};

pub fn locations(registry: &LocationRegistry) {
    for loc in registry.iter() {
        println!(
            "{:>3}  {:<34} {:>10.5} {:>11.5}",
            loc.id, loc.name, loc.latitude, loc.longitude
        );
    }
}

pub fn state(state: &DashboardState, rules: &[AlertRule]) {
    println!("== {} ==", state.selected.name);

    if let Some(error) = &state.error {
        println!("! Could not reach the air quality source: {error}");
        if state.data.is_some() {
            println!("! Showing the last good reading.");
        } else {
            println!("! Try again with `respira refresh`.");
        }
    }

    match state.phase() {
        Phase::Idle => println!("No data loaded yet."),
        Phase::Loading if state.data.is_none() => println!("Loading..."),
        Phase::NoData => {
            println!("The source has no current reading for this location.");
            return;
        }
        _ => {}
    }

    let Some(record) = &state.data else {
        return;
    };

    if let Some(name) = foreign_reading(&state.selected, record) {
        println!("Last good reading below is for {name}.");
    }

    println!("AQI {}  ({})", record.aqi, record.status.label());
    if let Some(theme) = &state.theme {
        println!(
            "theme {} / {} [{}]",
            theme.primary, theme.secondary, theme.gradient
        );
    }

    if let Some(code) = &record.main_pollutant {
        match Pollutant::from_code(code) {
            Some(p) => println!("Main pollutant: {} - {}", p.name(), p.description()),
            None => println!("Main pollutant: {code}"),
        }
    }
    if !record.pollutants.is_available() {
        println!("Pollutant breakdown: not available from current source");
    }

    let temp = opt(record.temperature_c, "°C");
    let humidity = opt(record.humidity_percent, "%");
    let wind = opt(record.wind.speed_ms, " m/s");
    let direction = opt(record.wind.direction_deg, "°");
    println!("Temperature {temp}  Humidity {humidity}  Wind {wind} from {direction}");

    if let Some(at) = state.updated_at {
        let origin = match state.source {
            Some(DataSource::Cache) => "cached",
            Some(DataSource::Network) => "fetched",
            None => "updated",
        };
        let local = at.with_timezone(&Local);
        println!("{origin} at {}", local.format("%Y-%m-%d %H:%M"));
    }

    println!();
    println!("{}", advisory::description(record.status));
    for rec in advisory::recommendations(record.status) {
        println!("  - {}: {}", rec.title, rec.description);
    }

    let fired = triggered(rules, record);
    if !fired.is_empty() {
        println!();
        for rule in fired {
            println!("ALERT [{}] {} >= {}", rule.id, rule.metric, rule.threshold);
        }
    }
}

pub fn history(location: &Location, week: &[HistoricalPoint]) {
    println!("== {} (simulated) ==", location.name);
    println!("{:<12} {:>5} {:>7} {:>7}", "date", "aqi", "pm2.5", "pm10");
    for point in week {
        println!(
            "{:<12} {:>5} {:>7.0} {:>7.0}",
            point.date.to_string(),
            point.aqi,
            point.pm25,
            point.pm10
        );
    }
}

/// Name of the place `record` was read for, when that is not the selection.
fn foreign_reading<'a>(selected: &Location, record: &'a AirQualityRecord) -> Option<&'a str> {
    (record.location.id != selected.id).then_some(record.location.name.as_str())
}

fn opt(value: Option<f64>, unit: &str) -> String {
    value
        .map(|v| format!("{v:.1}{unit}"))
        .unwrap_or_else(|| "n/a".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use respira_core::{RawCityReading, normalize};

    #[test]
    fn names_the_place_a_leftover_reading_belongs_to() {
        let santa_catarina = Location::new(1, "Santa Catarina", 25.67325, -100.45813);
        let apodaca = Location::new(2, "Apodaca", 25.78195, -100.18804);
        let readings = [RawCityReading::new(Some(1), "Santa Catarina").with_aqi(60)];
        let record = normalize(&readings, &santa_catarina).unwrap();

        assert_eq!(foreign_reading(&apodaca, &record), Some("Santa Catarina"));
        assert_eq!(foreign_reading(&santa_catarina, &record), None);
    }

    #[test]
    fn missing_values_render_as_not_available() {
        assert_eq!(opt(None, "%"), "n/a");
        assert_eq!(opt(Some(21.04), "°C"), "21.0°C");
    }
}
