//! Health guidance attached to each severity and pollutant.

use serde::Serialize;

use crate::severity::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub icon: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

const fn rec(icon: &'static str, title: &'static str, description: &'static str) -> Recommendation {
    Recommendation {
        icon,
        title,
        description,
    }
}

pub fn description(status: Severity) -> &'static str {
    match status {
        Severity::Good => "Air quality is satisfactory and poses little or no health risk.",
        Severity::Moderate => {
            "Air quality is acceptable, but there may be a moderate risk for some sensitive people."
        }
        Severity::UnhealthySensitive => {
            "Members of sensitive groups may experience health effects. The general public is not likely to be affected."
        }
        Severity::Unhealthy => {
            "Everyone may begin to experience health effects; sensitive groups may experience more serious effects."
        }
        Severity::VeryUnhealthy => {
            "Health warning of emergency conditions. The entire population is more likely to be affected."
        }
        Severity::Hazardous => {
            "Health alert: everyone may experience more serious health effects. Avoid all outdoor activity."
        }
        Severity::Unknown => "No valid air quality reading is available for this location.",
    }
}

pub fn recommendations(status: Severity) -> [Recommendation; 3] {
    match status {
        Severity::Good => [
            rec(
                "sunny",
                "Outdoor activities",
                "It is safe to be outdoors today, enjoy it.",
            ),
            rec("walk", "Exercise", "Ideal conditions for outdoor exercise."),
            rec(
                "happy",
                "Air quality",
                "Air quality is excellent, with no health risk.",
            ),
        ],
        Severity::Moderate => [
            rec(
                "sunny",
                "Outdoor activities",
                "Outdoor activities are fine in moderation.",
            ),
            rec(
                "walk",
                "Exercise",
                "Sensitive people should consider reducing intense outdoor exercise.",
            ),
            rec(
                "warning",
                "Caution",
                "People with respiratory conditions should watch for symptoms.",
            ),
        ],
        Severity::UnhealthySensitive => [
            rec(
                "alert",
                "Sensitive groups",
                "Children, older adults and people with respiratory problems should limit time outdoors.",
            ),
            rec(
                "walk",
                "Exercise",
                "Consider exercising indoors or lowering the intensity.",
            ),
            rec(
                "warning",
                "Monitoring",
                "Keep an eye on pollution levels through the day.",
            ),
        ],
        Severity::Unhealthy => [
            rec(
                "alert",
                "Limit exposure",
                "Avoid outdoor exercise and reduce time outside.",
            ),
            rec(
                "home",
                "Indoors",
                "Keep windows closed to keep polluted air out.",
            ),
            rec(
                "medical",
                "Health",
                "Wear a mask outdoors, especially with respiratory conditions.",
            ),
        ],
        Severity::VeryUnhealthy => [
            rec(
                "warning",
                "Avoid outdoors",
                "Stay indoors and avoid any outdoor physical activity.",
            ),
            rec(
                "home",
                "At home",
                "Keep all windows closed and consider an air purifier.",
            ),
            rec(
                "medical",
                "Protection",
                "Wear an N95 mask if you must go out.",
            ),
        ],
        Severity::Hazardous => [
            rec(
                "warning",
                "Emergency",
                "Sanitary emergency conditions, avoid leaving home.",
            ),
            rec(
                "home",
                "Shelter",
                "Stay indoors and seal windows and doors if possible.",
            ),
            rec(
                "medical",
                "Protection",
                "If you go out, wear an N95 mask and keep exposure to a minimum.",
            ),
        ],
        Severity::Unknown => [
            rec(
                "info",
                "No data",
                "There is no current reading for this location.",
            ),
            rec(
                "refresh",
                "Try again",
                "Readings usually update within the hour.",
            ),
            rec(
                "map",
                "Nearby",
                "Check a nearby monitoring location in the meantime.",
            ),
        ],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Pollutant {
    Pm25,
    Pm10,
    O3,
    No2,
    So2,
    Co,
}

impl Pollutant {
    /// Parse an upstream pollutant code such as `pm25`, `PM2.5` or `o3`.
    pub fn from_code(code: &str) -> Option<Self> {
        let normalized: String = code
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "pm25" => Some(Pollutant::Pm25),
            "pm10" => Some(Pollutant::Pm10),
            "o3" => Some(Pollutant::O3),
            "no2" => Some(Pollutant::No2),
            "so2" => Some(Pollutant::So2),
            "co" => Some(Pollutant::Co),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Pollutant::Pm25 => "PM2.5",
            Pollutant::Pm10 => "PM10",
            Pollutant::O3 => "Ozone (O₃)",
            Pollutant::No2 => "Nitrogen dioxide (NO₂)",
            Pollutant::So2 => "Sulfur dioxide (SO₂)",
            Pollutant::Co => "Carbon monoxide (CO)",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Pollutant::Pm25 => {
                "Fine particles 2.5 micrometers or smaller that can penetrate deep into the lungs."
            }
            Pollutant::Pm10 => {
                "Inhalable particles 10 micrometers or smaller that can enter the lungs."
            }
            Pollutant::O3 => {
                "Gas formed in the atmosphere by reactions between pollutants and sunlight."
            }
            Pollutant::No2 => {
                "Irritant gas mostly from burning fossil fuels such as coal, oil and gas."
            }
            Pollutant::So2 => {
                "Irritant gas produced by burning sulfur-bearing fuels such as coal and oil."
            }
            Pollutant::Co => "Toxic gas produced by incomplete combustion of carbon-based fuels.",
        }
    }
}
