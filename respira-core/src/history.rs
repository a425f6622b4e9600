//! Synthetic daily history.
//!
//! The source has no historical endpoint. These series are generated and
//! carry no accuracy guarantee; they exist so charts have something to show.

use chrono::{Days, NaiveDate};
use rand::Rng;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistoricalPoint {
    pub date: NaiveDate,
    pub aqi: i32,
    pub pm25: f64,
    pub pm10: f64,
}

/// Seven daily points ending at `today`, oldest first.
pub fn synthetic_week<R: Rng + ?Sized>(today: NaiveDate, rng: &mut R) -> Vec<HistoricalPoint> {
    (0..7u64)
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(back)))
        .map(|date| HistoricalPoint {
            date,
            aqi: rng.gen_range(30..180),
            pm25: f64::from(rng.gen_range(10..151_i32)),
            pm10: f64::from(rng.gen_range(20..181_i32)),
        })
        .collect()
}

/// [`synthetic_week`] seeded from the thread-local generator.
pub fn simulated_week(today: NaiveDate) -> Vec<HistoricalPoint> {
    synthetic_week(today, &mut rand::thread_rng())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn week_is_ordered_and_ends_today() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        let week = synthetic_week(today, &mut rng);
        assert_eq!(week.len(), 7);
        assert_eq!(week[0].date, NaiveDate::from_ymd_opt(2024, 2, 25).unwrap());
        assert_eq!(week[6].date, today);
        assert!(week.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn values_stay_in_range() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut rng = StdRng::seed_from_u64(99);

        for point in synthetic_week(today, &mut rng) {
            assert!((30..180).contains(&point.aqi));
            assert!((10.0..=150.0).contains(&point.pm25));
            assert!((20.0..=180.0).contains(&point.pm10));
        }
    }
}
