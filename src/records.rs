//! Record types flowing through the pipeline.
//!
//! Each stage consumes one record type and produces the next: raw records
//! come straight off the source file with nothing guaranteed, validated
//! records carry the invariants the cleaner enforced, and enriched records
//! add the derived analytic fields. Rejected records are snapshotted as
//! [`ExclusionRecord`]s instead of being dropped silently.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One observed trip as read from the trips source. Timestamps are kept as
/// raw strings so that unparsable values survive loading and are rejected
/// with a reason by the cleaner rather than aborting the load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTripRecord {
    pub pickup_datetime: String,
    pub dropoff_datetime: String,

    // Either coordinate pairs or zone ids identify the endpoints; sources
    // provide one or the other (sometimes both).
    pub pickup_latitude: Option<f64>,
    pub pickup_longitude: Option<f64>,
    pub dropoff_latitude: Option<f64>,
    pub dropoff_longitude: Option<f64>,
    pub pickup_location_id: Option<i64>,
    pub dropoff_location_id: Option<i64>,

    pub trip_distance_km: Option<f64>,
    pub fare_amount: Option<f64>,
    pub tip_amount: Option<f64>,
    pub total_amount: Option<f64>,
    pub passenger_count: Option<i64>,
    pub payment_type: Option<i64>,
}

/// A trip that passed every cleaning predicate. Numerics are concrete and
/// non-negative, timestamps are parsed, and dropoff is not before pickup.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTripRecord {
    pub pickup_datetime: NaiveDateTime,
    pub dropoff_datetime: NaiveDateTime,

    pub pickup_latitude: Option<f64>,
    pub pickup_longitude: Option<f64>,
    pub dropoff_latitude: Option<f64>,
    pub dropoff_longitude: Option<f64>,
    pub pickup_location_id: Option<i64>,
    pub dropoff_location_id: Option<i64>,

    pub trip_distance_km: f64,
    pub fare_amount: f64,
    pub tip_amount: f64,
    pub total_amount: f64,
    pub passenger_count: i64,
    pub payment_type: Option<i64>,
}

/// A validated trip plus the derived fields written to the cleaned artifact.
///
/// Sentinel policy: `avg_speed_kmh` and `fare_per_km` are 0.0 when
/// `trip_distance_km` is 0; `haversine_km` is empty when the record carries
/// no coordinates, and the haversine-derived scores fall back to 0.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedTripRecord {
    pub pickup_datetime: NaiveDateTime,
    pub dropoff_datetime: NaiveDateTime,

    pub pickup_latitude: Option<f64>,
    pub pickup_longitude: Option<f64>,
    pub dropoff_latitude: Option<f64>,
    pub dropoff_longitude: Option<f64>,
    pub pickup_location_id: Option<i64>,
    pub dropoff_location_id: Option<i64>,

    pub trip_distance_km: f64,
    pub fare_amount: f64,
    pub tip_amount: f64,
    pub total_amount: f64,
    pub passenger_count: i64,
    pub payment_type: Option<i64>,

    // derived fields
    pub trip_duration_sec: i64,
    pub avg_speed_kmh: f64,
    pub fare_per_km: f64,
    pub pickup_hour: u32,
    pub pickup_weekday: u32,
    pub is_weekend: bool,
    pub is_peak_hour: bool,
    pub haversine_km: Option<f64>,
    pub idle_time_ratio: f64,
    pub trip_efficiency: f64,
}

/// Pipeline stage that rejected a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    #[serde(rename = "cleaning")]
    Cleaning,
    #[serde(rename = "feature-engineering")]
    FeatureEngineering,
}

/// Snapshot of a rejected record: enough identifying fields to find it in
/// the source, plus the stage and the name of the first predicate it failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExclusionRecord {
    pub pickup_datetime: String,
    pub dropoff_datetime: String,
    pub pickup_location_id: Option<i64>,
    pub dropoff_location_id: Option<i64>,
    pub pickup_latitude: Option<f64>,
    pub pickup_longitude: Option<f64>,
    pub trip_distance_km: Option<f64>,
    pub total_amount: Option<f64>,
    pub stage: PipelineStage,
    pub reason: String,
}

impl ExclusionRecord {
    /// Snapshot a raw record rejected during cleaning.
    pub fn from_raw(raw: &RawTripRecord, reason: &str) -> Self {
        ExclusionRecord {
            pickup_datetime: raw.pickup_datetime.clone(),
            dropoff_datetime: raw.dropoff_datetime.clone(),
            pickup_location_id: raw.pickup_location_id,
            dropoff_location_id: raw.dropoff_location_id,
            pickup_latitude: raw.pickup_latitude,
            pickup_longitude: raw.pickup_longitude,
            trip_distance_km: raw.trip_distance_km,
            total_amount: raw.total_amount,
            stage: PipelineStage::Cleaning,
            reason: reason.to_string(),
        }
    }

    /// Snapshot a validated record rejected during feature engineering.
    pub fn from_validated(record: &ValidatedTripRecord, reason: &str) -> Self {
        ExclusionRecord {
            pickup_datetime: record.pickup_datetime.format(TIMESTAMP_FORMAT).to_string(),
            dropoff_datetime: record.dropoff_datetime.format(TIMESTAMP_FORMAT).to_string(),
            pickup_location_id: record.pickup_location_id,
            dropoff_location_id: record.dropoff_location_id,
            pickup_latitude: record.pickup_latitude,
            pickup_longitude: record.pickup_longitude,
            trip_distance_km: Some(record.trip_distance_km),
            total_amount: Some(record.total_amount),
            stage: PipelineStage::FeatureEngineering,
            reason: reason.to_string(),
        }
    }
}

/// One row of the zone lookup table. Geometry is carried separately as an
/// opaque blob keyed by `location_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneRecord {
    #[serde(alias = "locationid", alias = "LocationID")]
    pub location_id: i64,
    pub borough: String,
    pub zone: String,
    pub service_zone: String,
}

/// Timestamp layout used by the trips source.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parses a source timestamp, accepting the space-separated source layout
/// and the ISO 8601 `T` variant.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(value.trim(), "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

/// Great-circle distance in kilometres between two coordinate pairs.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;

    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp_space_layout() {
        let parsed = parse_timestamp("2019-01-01 08:00:00").unwrap();
        assert_eq!(parsed.format(TIMESTAMP_FORMAT).to_string(), "2019-01-01 08:00:00");
    }

    #[test]
    fn test_parse_timestamp_iso_layout() {
        assert!(parse_timestamp("2019-01-01T08:00:00").is_some());
    }

    #[test]
    fn test_parse_timestamp_garbage() {
        assert!(parse_timestamp("not-a-timestamp").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_haversine_zero_distance() {
        assert_eq!(haversine_km(40.75, -73.98, 40.75, -73.98), 0.0);
    }

    #[test]
    fn test_haversine_known_distance() {
        // Times Square to JFK is roughly 21 km as the crow flies
        let d = haversine_km(40.7580, -73.9855, 40.6413, -73.7781);
        assert!(d > 20.0 && d < 23.0, "got {d}");
    }

    #[test]
    fn test_exclusion_from_raw_keeps_raw_strings() {
        let raw = RawTripRecord {
            pickup_datetime: "garbage".to_string(),
            dropoff_datetime: "2019-01-01 08:15:00".to_string(),
            trip_distance_km: Some(5.0),
            ..Default::default()
        };
        let excl = ExclusionRecord::from_raw(&raw, "required-fields-present");
        assert_eq!(excl.pickup_datetime, "garbage");
        assert_eq!(excl.stage, PipelineStage::Cleaning);
        assert_eq!(excl.reason, "required-fields-present");
    }
}
