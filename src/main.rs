//! CLI entry point for the taxi trip pipeline.
//!
//! Provides subcommands for running the cleaning/enrichment pipeline over a
//! raw trips source and for summarizing an existing cleaned artifact.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use taxi_pipeline::config::PipelineConfig;
use taxi_pipeline::loader::load_enriched_trips;
use taxi_pipeline::pipeline::{run, ArtifactPaths, InputPaths};
use taxi_pipeline::stats::{print_summary, TripSummary};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "taxi_pipeline")]
#[command(about = "Cleans and enriches raw taxi trip data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: load, clean, enrich, write artifacts
    Run {
        /// Raw trips CSV
        #[arg(long, default_value = "data/trips.csv")]
        trips: PathBuf,

        /// Zone lookup CSV
        #[arg(long, default_value = "data/taxi_zone_lookup.csv")]
        zones: PathBuf,

        /// Optional zone geometry GeoJSON
        #[arg(long)]
        zone_geometry: Option<PathBuf>,

        /// Directory to write cleaned artifacts to
        #[arg(short, long, default_value = "cleaned_data")]
        output_dir: PathBuf,

        /// Reject trips longer than this many kilometres
        #[arg(long, default_value_t = 120.0)]
        max_distance_km: f64,

        /// Reject trips with a fare above this amount
        #[arg(long, default_value_t = 500.0)]
        max_fare: f64,

        /// Reject trips with more passengers than this
        #[arg(long, default_value_t = 8)]
        max_passengers: i64,
    },
    /// Summarize a cleaned trips artifact
    Summary {
        /// Cleaned trips CSV produced by `run`
        #[arg(long, default_value = "cleaned_data/cleaned_trips.csv")]
        cleaned_trips: PathBuf,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/taxi_pipeline.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("taxi_pipeline.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            trips,
            zones,
            zone_geometry,
            output_dir,
            max_distance_km,
            max_fare,
            max_passengers,
        } => {
            let inputs = InputPaths {
                trips,
                zones,
                zone_geometry,
            };
            let artifacts = ArtifactPaths::new(&output_dir);
            let config = PipelineConfig {
                max_trip_distance_km: max_distance_km,
                max_fare_amount: max_fare,
                max_passenger_count: max_passengers,
                ..PipelineConfig::default()
            };

            let summary = run(&inputs, &artifacts, &config)?;
            info!(
                kept = summary.trips_kept,
                excluded = summary.trips_excluded,
                "Run complete"
            );
        }
        Commands::Summary { cleaned_trips } => {
            let records = load_enriched_trips(&cleaned_trips)?;
            let summary = TripSummary::from_records(&records);
            print_summary(&summary)?;
        }
    }

    Ok(())
}
