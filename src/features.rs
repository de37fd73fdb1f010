//! Feature engineering over validated trips.
//!
//! Every derived field the dashboard queries is computed here, once, so the
//! serving layer only ever does plain lookups. Formulas are pipeline-owned:
//! they take their constants from [`PipelineConfig`] and are not tunable per
//! request.

use chrono::{Datelike, Timelike};
use tracing::info;

use crate::config::PipelineConfig;
use crate::records::{haversine_km, EnrichedTripRecord, ExclusionRecord, ValidatedTripRecord};

/// Reason attached to records whose computed duration is not positive. This
/// check needs parsed timestamps, so it lives here rather than in the
/// cleaner; equal pickup/dropoff timestamps land in this bucket.
pub const NON_POSITIVE_DURATION: &str = "non-positive-duration";

/// Weekday indices (Monday = 0) treated as weekend.
const WEEKEND_DAYS: [u32; 2] = [5, 6];

/// Computes derived fields for each validated trip, excluding records with
/// non-positive duration.
pub fn enrich_trips(
    records: Vec<ValidatedTripRecord>,
    config: &PipelineConfig,
) -> (Vec<EnrichedTripRecord>, Vec<ExclusionRecord>) {
    let total = records.len();
    let mut enriched = Vec::with_capacity(total);
    let mut excluded = Vec::new();

    for record in records {
        let duration_sec = (record.dropoff_datetime - record.pickup_datetime).num_seconds();
        if duration_sec <= 0 {
            excluded.push(ExclusionRecord::from_validated(&record, NON_POSITIVE_DURATION));
            continue;
        }
        enriched.push(enrich_record(record, duration_sec, config));
    }

    info!(
        total,
        enriched = enriched.len(),
        excluded = excluded.len(),
        "Feature engineering complete"
    );

    (enriched, excluded)
}

fn enrich_record(
    record: ValidatedTripRecord,
    trip_duration_sec: i64,
    config: &PipelineConfig,
) -> EnrichedTripRecord {
    let duration_hours = trip_duration_sec as f64 / 3600.0;

    // Zero-distance trips get a 0.0 sentinel instead of a division.
    let (avg_speed_kmh, fare_per_km) = if record.trip_distance_km > 0.0 {
        (
            record.trip_distance_km / duration_hours,
            record.fare_amount / record.trip_distance_km,
        )
    } else {
        (0.0, 0.0)
    };

    let pickup_hour = record.pickup_datetime.hour();
    let pickup_weekday = record.pickup_datetime.weekday().num_days_from_monday();
    let is_weekend = WEEKEND_DAYS.contains(&pickup_weekday);
    let is_peak_hour = config.is_peak_hour(pickup_hour);

    let haversine = match (
        record.pickup_latitude,
        record.pickup_longitude,
        record.dropoff_latitude,
        record.dropoff_longitude,
    ) {
        (Some(plat), Some(plon), Some(dlat), Some(dlon)) => {
            Some(haversine_km(plat, plon, dlat, dlon))
        }
        _ => None,
    };

    // Straight-line vs. metered distance scores. Without coordinates (or with
    // a zero metered distance) both fall back to the 0.0 sentinel.
    let (idle_time_ratio, trip_efficiency) = match haversine {
        Some(h) if record.trip_distance_km > 0.0 => {
            let efficiency = h / record.trip_distance_km;
            ((1.0 - efficiency).clamp(0.0, 1.0), efficiency)
        }
        _ => (0.0, 0.0),
    };

    EnrichedTripRecord {
        pickup_datetime: record.pickup_datetime,
        dropoff_datetime: record.dropoff_datetime,
        pickup_latitude: record.pickup_latitude,
        pickup_longitude: record.pickup_longitude,
        dropoff_latitude: record.dropoff_latitude,
        dropoff_longitude: record.dropoff_longitude,
        pickup_location_id: record.pickup_location_id,
        dropoff_location_id: record.dropoff_location_id,
        trip_distance_km: record.trip_distance_km,
        fare_amount: record.fare_amount,
        tip_amount: record.tip_amount,
        total_amount: record.total_amount,
        passenger_count: record.passenger_count,
        payment_type: record.payment_type,
        trip_duration_sec,
        avg_speed_kmh,
        fare_per_km,
        pickup_hour,
        pickup_weekday,
        is_weekend,
        is_peak_hour,
        haversine_km: haversine,
        idle_time_ratio,
        trip_efficiency,
    }
}
