//! Pipeline orchestration.
//!
//! Runs load -> clean -> enrich -> ledger -> write in order. Each stage's
//! output path is declared in the [`ArtifactPaths`] manifest; an artifact
//! that exists and is non-empty counts as complete and is loaded instead of
//! recomputed, so re-running after a partial failure only fills in what is
//! missing. Running two orchestrators against the same output directory
//! concurrently is not supported.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::cleaner::clean_trips;
use crate::config::PipelineConfig;
use crate::exclusions::merge_exclusions;
use crate::features::enrich_trips;
use crate::loader::{load_enriched_trips, load_trips, load_zone_geometry, load_zones};
use crate::output::{
    write_exclusions_csv, write_trips_csv, write_zones_csv, write_zones_geojson,
};

/// Source file locations. Zone geometry is optional; without it the
/// zones-with-geometry artifact is not produced.
#[derive(Debug, Clone)]
pub struct InputPaths {
    pub trips: PathBuf,
    pub zones: PathBuf,
    pub zone_geometry: Option<PathBuf>,
}

/// Declared output path for every stage. The manifest is the single source
/// of truth for what a completed run looks like on disk.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub dir: PathBuf,
    pub cleaned_trips: PathBuf,
    pub zones: PathBuf,
    pub zones_geo: PathBuf,
    pub exclusions: PathBuf,
}

impl ArtifactPaths {
    pub fn new(dir: &Path) -> Self {
        ArtifactPaths {
            dir: dir.to_path_buf(),
            cleaned_trips: dir.join("cleaned_trips.csv"),
            zones: dir.join("zones_cleaned.csv"),
            zones_geo: dir.join("zones_geo_cleaned.geojson"),
            exclusions: dir.join("excluded_records.csv"),
        }
    }
}

/// An artifact counts as complete only when it exists and has content; a
/// zero-byte file from an interrupted run is recomputed.
pub fn is_complete(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
}

/// Counters reported after a run, for logging and tests.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub trips_kept: usize,
    pub trips_excluded: usize,
    pub zones: usize,
    pub cleaned_trips_written: bool,
    pub exclusions_written: bool,
    pub zones_csv_written: bool,
    pub zones_geojson_written: bool,
}

/// Runs the full pipeline. Fatal errors (missing inputs, broken schemas)
/// abort; per-record problems end up in the exclusion log instead.
#[tracing::instrument(skip(inputs, artifacts, config), fields(output_dir = %artifacts.dir.display()))]
pub fn run(
    inputs: &InputPaths,
    artifacts: &ArtifactPaths,
    config: &PipelineConfig,
) -> Result<RunSummary> {
    fs::create_dir_all(&artifacts.dir)
        .with_context(|| format!("failed to create output directory {}", artifacts.dir.display()))?;

    let mut summary = RunSummary::default();

    run_zone_stage(inputs, artifacts, &mut summary)?;
    run_trip_stages(inputs, artifacts, config, &mut summary)?;

    info!(
        trips_kept = summary.trips_kept,
        trips_excluded = summary.trips_excluded,
        zones = summary.zones,
        "Pipeline finished"
    );

    Ok(summary)
}

fn run_zone_stage(
    inputs: &InputPaths,
    artifacts: &ArtifactPaths,
    summary: &mut RunSummary,
) -> Result<()> {
    let want_zones_csv = !is_complete(&artifacts.zones);
    let want_geojson = inputs.zone_geometry.is_some() && !is_complete(&artifacts.zones_geo);

    if !want_zones_csv && !want_geojson {
        info!("Zone artifacts already present, skipping");
        return Ok(());
    }

    let zones = load_zones(&inputs.zones)?;
    summary.zones = zones.len();

    if want_zones_csv {
        write_zones_csv(&artifacts.zones, &zones)?;
        summary.zones_csv_written = true;
        info!(path = %artifacts.zones.display(), "Cleaned zones written");
    }

    if want_geojson {
        // Checked above: want_geojson implies the input is present.
        let geometry_path = inputs.zone_geometry.as_ref().unwrap();
        let geometry = load_zone_geometry(geometry_path)?;
        write_zones_geojson(&artifacts.zones_geo, &zones, &geometry)?;
        summary.zones_geojson_written = true;
        info!(path = %artifacts.zones_geo.display(), "Zone geometry written");
    }

    Ok(())
}

fn run_trip_stages(
    inputs: &InputPaths,
    artifacts: &ArtifactPaths,
    config: &PipelineConfig,
    summary: &mut RunSummary,
) -> Result<()> {
    let want_trips = !is_complete(&artifacts.cleaned_trips);
    let want_exclusions = !is_complete(&artifacts.exclusions);

    if !want_trips && !want_exclusions {
        info!("Trip artifacts already present, skipping clean and enrich");
        summary.trips_kept = load_enriched_trips(&artifacts.cleaned_trips)?.len();
        return Ok(());
    }

    // Either artifact missing means one clean+enrich pass over the raw
    // source; only the missing artifact(s) are rewritten, so a present
    // cleaned-trips file survives an exclusion-log rebuild untouched.
    let raw = load_trips(&inputs.trips)?;
    let (validated, excluded_cleaning) = clean_trips(raw, config);
    let (enriched, excluded_features) = enrich_trips(validated, config);
    let ledger = merge_exclusions(excluded_cleaning, excluded_features);

    summary.trips_kept = enriched.len();
    summary.trips_excluded = ledger.len();

    if want_trips {
        write_trips_csv(&artifacts.cleaned_trips, &enriched)?;
        summary.cleaned_trips_written = true;
        info!(path = %artifacts.cleaned_trips.display(), rows = enriched.len(), "Cleaned trips written");
    }

    if want_exclusions {
        write_exclusions_csv(&artifacts.exclusions, &ledger)?;
        summary.exclusions_written = true;
        info!(path = %artifacts.exclusions.display(), rows = ledger.len(), "Exclusion log written");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_manifest_layout() {
        let artifacts = ArtifactPaths::new(Path::new("out"));
        assert_eq!(artifacts.cleaned_trips, Path::new("out/cleaned_trips.csv"));
        assert_eq!(artifacts.zones, Path::new("out/zones_cleaned.csv"));
        assert_eq!(artifacts.zones_geo, Path::new("out/zones_geo_cleaned.geojson"));
        assert_eq!(artifacts.exclusions, Path::new("out/excluded_records.csv"));
    }

    #[test]
    fn test_is_complete_requires_content() {
        let path = env::temp_dir().join("taxi_pipeline_manifest_probe");
        let _ = fs::remove_file(&path);

        assert!(!is_complete(&path));

        fs::write(&path, "").unwrap();
        assert!(!is_complete(&path)); // empty file is not complete

        fs::write(&path, "x").unwrap();
        assert!(is_complete(&path));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_trips_source_is_fatal() {
        let out = env::temp_dir().join("taxi_pipeline_fatal_test_out");
        let _ = fs::remove_dir_all(&out);

        let inputs = InputPaths {
            trips: PathBuf::from("/nonexistent/trips.csv"),
            zones: PathBuf::from("/nonexistent/zones.csv"),
            zone_geometry: None,
        };
        let artifacts = ArtifactPaths::new(&out);

        assert!(run(&inputs, &artifacts, &PipelineConfig::default()).is_err());

        let _ = fs::remove_dir_all(&out);
    }
}
