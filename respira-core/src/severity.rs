use serde::{Deserialize, Serialize};

/// Health-risk category derived from an AQI value.
///
/// Variants are declared in increasing order of risk, with `Unknown` as a
/// sentinel for missing or invalid index values. Use [`Severity::risk_rank`]
/// when an ordering is needed; `Unknown` has no rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Good,
    Moderate,
    UnhealthySensitive,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
    Unknown,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Good => "good",
            Severity::Moderate => "moderate",
            Severity::UnhealthySensitive => "unhealthy_sensitive",
            Severity::Unhealthy => "unhealthy",
            Severity::VeryUnhealthy => "very_unhealthy",
            Severity::Hazardous => "hazardous",
            Severity::Unknown => "unknown",
        }
    }

    /// Human-facing label.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Good => "Good",
            Severity::Moderate => "Moderate",
            Severity::UnhealthySensitive => "Unhealthy for sensitive groups",
            Severity::Unhealthy => "Unhealthy",
            Severity::VeryUnhealthy => "Very unhealthy",
            Severity::Hazardous => "Hazardous",
            Severity::Unknown => "Unknown",
        }
    }

    /// Position in the risk scale, `0` for good up to `5` for hazardous.
    pub fn risk_rank(&self) -> Option<u8> {
        match self {
            Severity::Good => Some(0),
            Severity::Moderate => Some(1),
            Severity::UnhealthySensitive => Some(2),
            Severity::Unhealthy => Some(3),
            Severity::VeryUnhealthy => Some(4),
            Severity::Hazardous => Some(5),
            Severity::Unknown => None,
        }
    }

    pub const fn all() -> &'static [Severity] {
        &[
            Severity::Good,
            Severity::Moderate,
            Severity::UnhealthySensitive,
            Severity::Unhealthy,
            Severity::VeryUnhealthy,
            Severity::Hazardous,
            Severity::Unknown,
        ]
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify an AQI value. Bounds are inclusive upper limits; anything above
/// 300 is hazardous and NaN is unknown.
pub fn classify(aqi: f64) -> Severity {
    if aqi.is_nan() {
        Severity::Unknown
    } else if aqi <= 50.0 {
        Severity::Good
    } else if aqi <= 100.0 {
        Severity::Moderate
    } else if aqi <= 150.0 {
        Severity::UnhealthySensitive
    } else if aqi <= 200.0 {
        Severity::Unhealthy
    } else if aqi <= 300.0 {
        Severity::VeryUnhealthy
    } else {
        Severity::Hazardous
    }
}
