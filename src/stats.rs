//! Summary statistics over a cleaned trips artifact.
//!
//! The serving layer does its own aggregation; this summary exists for
//! operators checking a pipeline run from the command line.

use serde::Serialize;
use tracing::info;

use crate::records::EnrichedTripRecord;

#[derive(Debug, Default, Serialize)]
pub struct TripSummary {
    pub total_trips: usize,
    pub weekend_trips: usize,
    pub peak_hour_trips: usize,
    pub zero_distance_trips: usize,

    pub weekend_pct: f64,
    pub peak_hour_pct: f64,

    pub avg_speed_kmh: f64,
    pub speed_stddev: f64,
    pub avg_fare_per_km: f64,
    pub avg_duration_sec: f64,
}

impl TripSummary {
    pub fn from_records(records: &[EnrichedTripRecord]) -> Self {
        let mut s = TripSummary {
            total_trips: records.len(),
            ..Default::default()
        };

        let mut speeds = Vec::with_capacity(records.len());
        let mut fares_per_km = Vec::with_capacity(records.len());
        let mut durations = Vec::with_capacity(records.len());

        for record in records {
            if record.is_weekend {
                s.weekend_trips += 1;
            }
            if record.is_peak_hour {
                s.peak_hour_trips += 1;
            }
            if record.trip_distance_km == 0.0 {
                s.zero_distance_trips += 1;
            } else {
                // Sentinel rows would drag the averages toward zero.
                speeds.push(record.avg_speed_kmh);
                fares_per_km.push(record.fare_per_km);
            }
            durations.push(record.trip_duration_sec as f64);
        }

        s.weekend_pct = pct(s.weekend_trips, s.total_trips);
        s.peak_hour_pct = pct(s.peak_hour_trips, s.total_trips);
        s.avg_speed_kmh = mean(&speeds);
        s.speed_stddev = stddev(&speeds, s.avg_speed_kmh);
        s.avg_fare_per_km = mean(&fares_per_km);
        s.avg_duration_sec = mean(&durations);

        s
    }
}

/// Logs a summary as pretty-printed JSON.
pub fn print_summary(summary: &TripSummary) -> anyhow::Result<()> {
    info!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}

pub fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// Arithmetic mean. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation given a pre-computed mean. Returns 0.0 for
/// empty input.
pub fn stddev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;

    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn record(speed: f64, weekend: bool, peak: bool) -> EnrichedTripRecord {
        let pickup =
            NaiveDateTime::parse_from_str("2019-01-01 08:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        EnrichedTripRecord {
            pickup_datetime: pickup,
            dropoff_datetime: pickup + chrono::Duration::minutes(15),
            pickup_latitude: None,
            pickup_longitude: None,
            dropoff_latitude: None,
            dropoff_longitude: None,
            pickup_location_id: Some(161),
            dropoff_location_id: Some(237),
            trip_distance_km: 5.0,
            fare_amount: 12.0,
            tip_amount: 2.0,
            total_amount: 14.0,
            passenger_count: 1,
            payment_type: Some(1),
            trip_duration_sec: 900,
            avg_speed_kmh: speed,
            fare_per_km: 2.4,
            pickup_hour: 8,
            pickup_weekday: 1,
            is_weekend: weekend,
            is_peak_hour: peak,
            haversine_km: None,
            idle_time_ratio: 0.0,
            trip_efficiency: 0.0,
        }
    }

    #[test]
    fn test_pct_with_zero_total() {
        assert_eq!(pct(10, 0), 0.0);
    }

    #[test]
    fn test_mean_and_stddev() {
        let values = [2.0, 4.0, 6.0];
        let m = mean(&values);
        assert_eq!(m, 4.0);
        assert!((stddev(&values, m) - (8.0f64 / 3.0).sqrt()).abs() < 1e-9);
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(stddev(&[], 0.0), 0.0);
    }

    #[test]
    fn test_summary_counts_and_shares() {
        let records = vec![
            record(20.0, false, true),
            record(30.0, true, false),
            record(10.0, false, false),
            record(40.0, true, true),
        ];
        let summary = TripSummary::from_records(&records);

        assert_eq!(summary.total_trips, 4);
        assert_eq!(summary.weekend_trips, 2);
        assert_eq!(summary.peak_hour_trips, 2);
        assert_eq!(summary.weekend_pct, 50.0);
        assert_eq!(summary.avg_speed_kmh, 25.0);
        assert_eq!(summary.avg_duration_sec, 900.0);
    }

    #[test]
    fn test_zero_distance_rows_excluded_from_speed_average() {
        let mut sentinel = record(0.0, false, false);
        sentinel.trip_distance_km = 0.0;
        sentinel.fare_per_km = 0.0;

        let records = vec![record(20.0, false, false), sentinel];
        let summary = TripSummary::from_records(&records);

        assert_eq!(summary.zero_distance_trips, 1);
        assert_eq!(summary.avg_speed_kmh, 20.0);
    }

    #[test]
    fn test_empty_summary() {
        let summary = TripSummary::from_records(&[]);
        assert_eq!(summary.total_trips, 0);
        assert_eq!(summary.avg_speed_kmh, 0.0);
    }
}
