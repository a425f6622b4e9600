use serde::{Deserialize, Serialize};

use crate::model::AirQualityRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertMetric {
    Aqi,
    Pm25,
    Pm10,
    O3,
    No2,
    So2,
    Co,
}

impl AlertMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertMetric::Aqi => "aqi",
            AlertMetric::Pm25 => "pm25",
            AlertMetric::Pm10 => "pm10",
            AlertMetric::O3 => "o3",
            AlertMetric::No2 => "no2",
            AlertMetric::So2 => "so2",
            AlertMetric::Co => "co",
        }
    }

    /// Current value of this metric in `record`, if the source provides it.
    pub fn value_in(&self, record: &AirQualityRecord) -> Option<f64> {
        let p = &record.pollutants;
        match self {
            AlertMetric::Aqi => Some(f64::from(record.aqi)),
            AlertMetric::Pm25 => p.pm25,
            AlertMetric::Pm10 => p.pm10,
            AlertMetric::O3 => p.o3,
            AlertMetric::No2 => p.no2,
            AlertMetric::So2 => p.so2,
            AlertMetric::Co => p.co,
        }
    }
}

impl std::fmt::Display for AlertMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-defined threshold on one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    pub id: String,
    pub metric: AlertMetric,
    pub threshold: f64,
    #[serde(default = "active_by_default")]
    pub active: bool,
}

fn active_by_default() -> bool {
    true
}

impl AlertRule {
    pub fn new(id: impl Into<String>, metric: AlertMetric, threshold: f64) -> Self {
        Self {
            id: id.into(),
            metric,
            threshold,
            active: true,
        }
    }

    /// Rule set used until the user configures their own.
    pub fn defaults() -> Vec<AlertRule> {
        vec![AlertRule::new("default-aqi", AlertMetric::Aqi, 150.0)]
    }

    pub fn is_triggered_by(&self, record: &AirQualityRecord) -> bool {
        self.active
            && self.metric.value_in(record).is_some_and(|value| value >= self.threshold)
    }
}

/// Active rules whose metric is known and at or above its threshold.
pub fn triggered<'a>(rules: &'a [AlertRule], record: &AirQualityRecord) -> Vec<&'a AlertRule> {
    rules.iter().filter(|rule| rule.is_triggered_by(record)).collect()
}
