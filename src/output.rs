//! Artifact writers.
//!
//! One function per output file. Writers always produce the whole artifact
//! in one pass and flush before returning; nothing appends.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::records::{EnrichedTripRecord, ExclusionRecord, ZoneRecord};

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    debug!(path = %path.display(), rows = rows.len(), "Writing CSV artifact");

    let mut writer = csv::WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;

    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

/// Writes the cleaned trips table, one row per enriched record.
pub fn write_trips_csv(path: &Path, records: &[EnrichedTripRecord]) -> Result<()> {
    write_csv(path, records)
}

/// Writes the cleaned zones table, geometry omitted.
pub fn write_zones_csv(path: &Path, zones: &[ZoneRecord]) -> Result<()> {
    write_csv(path, zones)
}

/// Writes the exclusion log.
pub fn write_exclusions_csv(path: &Path, exclusions: &[ExclusionRecord]) -> Result<()> {
    write_csv(path, exclusions)
}

/// Writes zones with their geometry as a GeoJSON FeatureCollection. Geometry
/// blobs pass through untouched; zones without geometry get `null`.
pub fn write_zones_geojson(
    path: &Path,
    zones: &[ZoneRecord],
    geometry: &BTreeMap<i64, Value>,
) -> Result<()> {
    let features: Vec<Value> = zones
        .iter()
        .map(|zone| {
            json!({
                "type": "Feature",
                "properties": {
                    "location_id": zone.location_id,
                    "borough": zone.borough,
                    "zone": zone.zone,
                    "service_zone": zone.service_zone,
                },
                "geometry": geometry.get(&zone.location_id).cloned().unwrap_or(Value::Null),
            })
        })
        .collect();

    let collection = json!({
        "type": "FeatureCollection",
        "features": features,
    });

    debug!(path = %path.display(), features = zones.len(), "Writing GeoJSON artifact");
    fs::write(path, serde_json::to_string(&collection)?)
        .with_context(|| format!("failed to write {}", path.display()))?;

    Ok(())
}
