//! Raw input loading.
//!
//! Structural problems with a source file (missing file, absent required
//! column) are fatal and abort the run. Per-record problems (unparsable
//! timestamp, blank numeric) are not: values are parsed leniently into
//! `Option`s so every record-shape issue funnels through the cleaner's
//! exclusion path with a recorded reason.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use anyhow::{bail, Context, Result};
use csv::StringRecord;
use serde_json::Value;
use tracing::info;

use crate::records::{EnrichedTripRecord, RawTripRecord, ZoneRecord};

/// Columns every trips source must provide. Location information is checked
/// separately since it may come as coordinates or as zone ids.
const REQUIRED_TRIP_COLUMNS: [&str; 8] = [
    "pickup_datetime",
    "dropoff_datetime",
    "trip_distance_km",
    "fare_amount",
    "tip_amount",
    "total_amount",
    "passenger_count",
    "payment_type",
];

const COORDINATE_COLUMNS: [&str; 4] = [
    "pickup_latitude",
    "pickup_longitude",
    "dropoff_latitude",
    "dropoff_longitude",
];

const LOCATION_ID_COLUMNS: [&str; 2] = ["pickup_location_id", "dropoff_location_id"];

/// Header index map for the trips source, built once per file.
struct TripColumns {
    required: [usize; 8],
    coordinates: Option<[usize; 4]>,
    location_ids: Option<[usize; 2]>,
}

impl TripColumns {
    fn from_headers(headers: &StringRecord, path: &Path) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);

        let mut required = [0usize; 8];
        for (slot, name) in required.iter_mut().zip(REQUIRED_TRIP_COLUMNS) {
            match find(name) {
                Some(idx) => *slot = idx,
                None => bail!("{}: required column '{}' is missing", path.display(), name),
            }
        }

        let coordinates = COORDINATE_COLUMNS
            .map(|name| find(name))
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .map(|v| [v[0], v[1], v[2], v[3]]);
        let location_ids = LOCATION_ID_COLUMNS
            .map(|name| find(name))
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .map(|v| [v[0], v[1]]);

        if coordinates.is_none() && location_ids.is_none() {
            bail!(
                "{}: trips source must provide either coordinate columns or location id columns",
                path.display()
            );
        }

        Ok(TripColumns {
            required,
            coordinates,
            location_ids,
        })
    }
}

fn field<'a>(record: &'a StringRecord, idx: usize) -> Option<&'a str> {
    record.get(idx).map(str::trim).filter(|v| !v.is_empty())
}

fn parse_f64(record: &StringRecord, idx: usize) -> Option<f64> {
    field(record, idx)?.parse().ok()
}

/// Integer columns sometimes arrive as floats ("1.0"); accept both.
fn parse_i64(record: &StringRecord, idx: usize) -> Option<i64> {
    let raw = field(record, idx)?;
    raw.parse::<i64>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().map(|v| v as i64))
}

/// Loads the trips source. Fails fast on a missing file or missing required
/// columns; individual field values are never a load error.
pub fn load_trips(path: &Path) -> Result<Vec<RawTripRecord>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open trips source {}", path.display()))?;
    let mut reader = csv::Reader::from_reader(file);

    let headers = reader
        .headers()
        .with_context(|| format!("failed to read trips header from {}", path.display()))?
        .clone();
    let columns = TripColumns::from_headers(&headers, path)?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.with_context(|| format!("failed to read row from {}", path.display()))?;
        records.push(raw_record_from_row(&row, &columns));
    }

    info!(path = %path.display(), records = records.len(), "Trips source loaded");
    Ok(records)
}

fn raw_record_from_row(row: &StringRecord, columns: &TripColumns) -> RawTripRecord {
    let [pickup, dropoff, distance, fare, tip, total, passengers, payment] = columns.required;

    let mut record = RawTripRecord {
        pickup_datetime: field(row, pickup).unwrap_or_default().to_string(),
        dropoff_datetime: field(row, dropoff).unwrap_or_default().to_string(),
        trip_distance_km: parse_f64(row, distance),
        fare_amount: parse_f64(row, fare),
        tip_amount: parse_f64(row, tip),
        total_amount: parse_f64(row, total),
        passenger_count: parse_i64(row, passengers),
        payment_type: parse_i64(row, payment),
        ..Default::default()
    };

    if let Some([plat, plon, dlat, dlon]) = columns.coordinates {
        record.pickup_latitude = parse_f64(row, plat);
        record.pickup_longitude = parse_f64(row, plon);
        record.dropoff_latitude = parse_f64(row, dlat);
        record.dropoff_longitude = parse_f64(row, dlon);
    }
    if let Some([pu, doid]) = columns.location_ids {
        record.pickup_location_id = parse_i64(row, pu);
        record.dropoff_location_id = parse_i64(row, doid);
    }

    record
}

/// Loads the zone lookup table. Schema problems here are fatal: the zone
/// table is reference data, not observations.
pub fn load_zones(path: &Path) -> Result<Vec<ZoneRecord>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open zone lookup {}", path.display()))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut zones = Vec::new();
    for result in reader.deserialize() {
        let zone: ZoneRecord =
            result.with_context(|| format!("unreadable zone lookup schema in {}", path.display()))?;
        zones.push(zone);
    }

    info!(path = %path.display(), zones = zones.len(), "Zone lookup loaded");
    Ok(zones)
}

/// Loads zone geometry from a GeoJSON FeatureCollection, keyed by location
/// id. Geometry is pass-through: the pipeline never looks inside it.
pub fn load_zone_geometry(path: &Path) -> Result<BTreeMap<i64, Value>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open zone geometry {}", path.display()))?;
    let collection: Value = serde_json::from_reader(file)
        .with_context(|| format!("invalid GeoJSON in {}", path.display()))?;

    let Some(features) = collection.get("features").and_then(Value::as_array) else {
        bail!("{}: expected a GeoJSON FeatureCollection", path.display());
    };

    let mut geometry = BTreeMap::new();
    for feature in features {
        let properties = feature.get("properties").unwrap_or(&Value::Null);
        let location_id = ["location_id", "locationid", "LocationID"]
            .iter()
            .find_map(|key| property_as_i64(properties, key));
        let (Some(location_id), Some(geom)) = (location_id, feature.get("geometry")) else {
            continue;
        };
        geometry.insert(location_id, geom.clone());
    }

    info!(path = %path.display(), zones = geometry.len(), "Zone geometry loaded");
    Ok(geometry)
}

fn property_as_i64(properties: &Value, key: &str) -> Option<i64> {
    let value = properties.get(key)?;
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

/// Reloads a previously written cleaned-trips artifact so downstream stages
/// can resume without recomputing it.
pub fn load_enriched_trips(path: &Path) -> Result<Vec<EnrichedTripRecord>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open cleaned trips {}", path.display()))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut records = Vec::new();
    for result in reader.deserialize() {
        let record: EnrichedTripRecord =
            result.with_context(|| format!("unreadable cleaned trips in {}", path.display()))?;
        records.push(record);
    }

    info!(path = %path.display(), records = records.len(), "Cleaned trips artifact loaded");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;
    use std::path::PathBuf;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = env::temp_dir().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    const TRIPS_HEADER: &str = "pickup_datetime,dropoff_datetime,pickup_location_id,\
dropoff_location_id,trip_distance_km,fare_amount,tip_amount,total_amount,\
passenger_count,payment_type\n";

    #[test]
    fn test_load_trips_parses_rows() {
        let path = temp_file(
            "taxi_pipeline_loader_rows.csv",
            &format!(
                "{TRIPS_HEADER}2019-01-01 08:00:00,2019-01-01 08:15:00,161,237,5.0,12.0,2.0,14.0,1,1\n"
            ),
        );

        let records = load_trips(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].pickup_datetime, "2019-01-01 08:00:00");
        assert_eq!(records[0].pickup_location_id, Some(161));
        assert_eq!(records[0].trip_distance_km, Some(5.0));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_trips_blank_and_garbage_fields_become_none() {
        let path = temp_file(
            "taxi_pipeline_loader_lenient.csv",
            &format!("{TRIPS_HEADER}bad-date,2019-01-01 08:15:00,161,237,,abc,2.0,14.0,1.0,1\n"),
        );

        let records = load_trips(&path).unwrap();
        assert_eq!(records[0].pickup_datetime, "bad-date");
        assert_eq!(records[0].trip_distance_km, None);
        assert_eq!(records[0].fare_amount, None);
        assert_eq!(records[0].passenger_count, Some(1)); // "1.0" accepted

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_trips_missing_required_column_is_fatal() {
        let path = temp_file(
            "taxi_pipeline_loader_missing_col.csv",
            "pickup_datetime,dropoff_datetime,pickup_location_id,dropoff_location_id\n\
a,b,1,2\n",
        );

        let err = load_trips(&path).unwrap_err().to_string();
        assert!(err.contains("trip_distance_km"), "got: {err}");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_trips_requires_some_location_columns() {
        let path = temp_file(
            "taxi_pipeline_loader_no_location.csv",
            "pickup_datetime,dropoff_datetime,trip_distance_km,fare_amount,tip_amount,\
total_amount,passenger_count,payment_type\na,b,1,1,1,1,1,1\n",
        );

        let err = load_trips(&path).unwrap_err().to_string();
        assert!(err.contains("coordinate columns or location id"), "got: {err}");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_trips_missing_file_is_fatal() {
        assert!(load_trips(Path::new("/nonexistent/trips.csv")).is_err());
    }

    #[test]
    fn test_load_zones_with_aliased_header() {
        let path = temp_file(
            "taxi_pipeline_loader_zones.csv",
            "locationid,borough,zone,service_zone\n161,Manhattan,Midtown Center,Yellow Zone\n",
        );

        let zones = load_zones(&path).unwrap();
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].location_id, 161);
        assert_eq!(zones[0].borough, "Manhattan");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_zone_geometry() {
        let path = temp_file(
            "taxi_pipeline_loader_geo.geojson",
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature",
                 "properties":{"locationid":161,"borough":"Manhattan"},
                 "geometry":{"type":"Point","coordinates":[-73.98,40.75]}}
            ]}"#,
        );

        let geometry = load_zone_geometry(&path).unwrap();
        assert_eq!(geometry.len(), 1);
        assert_eq!(geometry[&161]["type"], "Point");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_zone_geometry_rejects_non_collection() {
        let path = temp_file("taxi_pipeline_loader_bad_geo.geojson", r#"{"type":"Point"}"#);
        assert!(load_zone_geometry(&path).is_err());
        fs::remove_file(&path).unwrap();
    }
}
