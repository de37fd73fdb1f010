//! Record-level validation.
//!
//! An ordered list of named predicates is applied to every raw record; a
//! record is rejected by the first predicate it fails, so each exclusion
//! carries exactly one reason. Cleaning never alters values — kept records
//! pass through with only their types firmed up.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use tracing::info;

use crate::config::PipelineConfig;
use crate::records::{parse_timestamp, ExclusionRecord, RawTripRecord, ValidatedTripRecord};

/// Predicate names, in evaluation order. These strings are the exclusion
/// log's reason vocabulary for the cleaning stage.
pub const REQUIRED_FIELDS_PRESENT: &str = "required-fields-present";
pub const TEMPORAL_ORDER: &str = "temporal-order";
pub const NON_NEGATIVE_NUMERIC_FIELDS: &str = "non-negative-numeric-fields";
pub const PLAUSIBLE_BOUNDS: &str = "plausible-bounds";
pub const DUPLICATE_DETECTION: &str = "duplicate-detection";

/// Identity tuple for within-batch duplicate detection. Coordinates are
/// compared by bit pattern, which is exact-match semantics for values read
/// from the same source file.
type TripKey = (
    NaiveDateTime,
    NaiveDateTime,
    Option<i64>,
    Option<i64>,
    Option<(u64, u64)>,
    Option<(u64, u64)>,
);

fn trip_key(record: &ValidatedTripRecord) -> TripKey {
    let bits = |lat: Option<f64>, lon: Option<f64>| match (lat, lon) {
        (Some(lat), Some(lon)) => Some((lat.to_bits(), lon.to_bits())),
        _ => None,
    };
    (
        record.pickup_datetime,
        record.dropoff_datetime,
        record.pickup_location_id,
        record.dropoff_location_id,
        bits(record.pickup_latitude, record.pickup_longitude),
        bits(record.dropoff_latitude, record.dropoff_longitude),
    )
}

/// Partitions raw records into validated records and exclusions.
pub fn clean_trips(
    records: Vec<RawTripRecord>,
    config: &PipelineConfig,
) -> (Vec<ValidatedTripRecord>, Vec<ExclusionRecord>) {
    let total = records.len();
    let mut kept = Vec::with_capacity(total);
    let mut excluded = Vec::new();
    let mut seen: HashSet<TripKey> = HashSet::new();

    for raw in records {
        match validate_record(&raw, config) {
            Ok(valid) => {
                if !seen.insert(trip_key(&valid)) {
                    excluded.push(ExclusionRecord::from_raw(&raw, DUPLICATE_DETECTION));
                } else {
                    kept.push(valid);
                }
            }
            Err(reason) => excluded.push(ExclusionRecord::from_raw(&raw, reason)),
        }
    }

    info!(
        total,
        kept = kept.len(),
        excluded = excluded.len(),
        "Trip cleaning complete"
    );

    (kept, excluded)
}

/// Runs the non-duplicate predicates in order, returning the validated
/// record or the name of the first predicate that failed.
fn validate_record(
    raw: &RawTripRecord,
    config: &PipelineConfig,
) -> Result<ValidatedTripRecord, &'static str> {
    // 1. required-fields-present
    let pickup = parse_timestamp(&raw.pickup_datetime);
    let dropoff = parse_timestamp(&raw.dropoff_datetime);
    let (Some(pickup), Some(dropoff)) = (pickup, dropoff) else {
        return Err(REQUIRED_FIELDS_PRESENT);
    };

    let has_coordinates = raw.pickup_latitude.is_some()
        && raw.pickup_longitude.is_some()
        && raw.dropoff_latitude.is_some()
        && raw.dropoff_longitude.is_some();
    let has_location_ids = raw.pickup_location_id.is_some() && raw.dropoff_location_id.is_some();
    if !has_coordinates && !has_location_ids {
        return Err(REQUIRED_FIELDS_PRESENT);
    }

    let (
        Some(trip_distance_km),
        Some(fare_amount),
        Some(tip_amount),
        Some(total_amount),
        Some(passenger_count),
    ) = (
        raw.trip_distance_km,
        raw.fare_amount,
        raw.tip_amount,
        raw.total_amount,
        raw.passenger_count,
    )
    else {
        return Err(REQUIRED_FIELDS_PRESENT);
    };

    // 2. temporal-order. Only strict inversion is rejected here; equal
    // timestamps fall through to the feature stage's duration check.
    if dropoff < pickup {
        return Err(TEMPORAL_ORDER);
    }

    // 3. non-negative-numeric-fields
    if trip_distance_km < 0.0
        || fare_amount < 0.0
        || tip_amount < 0.0
        || total_amount < 0.0
        || passenger_count < 0
    {
        return Err(NON_NEGATIVE_NUMERIC_FIELDS);
    }

    // 4. plausible-bounds
    if trip_distance_km > config.max_trip_distance_km
        || fare_amount > config.max_fare_amount
        || passenger_count > config.max_passenger_count
    {
        return Err(PLAUSIBLE_BOUNDS);
    }
    if let (Some(plat), Some(plon), Some(dlat), Some(dlon)) = (
        raw.pickup_latitude,
        raw.pickup_longitude,
        raw.dropoff_latitude,
        raw.dropoff_longitude,
    ) {
        if !config.service_area.contains(plat, plon) || !config.service_area.contains(dlat, dlon) {
            return Err(PLAUSIBLE_BOUNDS);
        }
    }

    Ok(ValidatedTripRecord {
        pickup_datetime: pickup,
        dropoff_datetime: dropoff,
        pickup_latitude: raw.pickup_latitude,
        pickup_longitude: raw.pickup_longitude,
        dropoff_latitude: raw.dropoff_latitude,
        dropoff_longitude: raw.dropoff_longitude,
        pickup_location_id: raw.pickup_location_id,
        dropoff_location_id: raw.dropoff_location_id,
        trip_distance_km,
        fare_amount,
        tip_amount,
        total_amount,
        passenger_count,
        payment_type: raw.payment_type,
    })
}
