//! Pipeline configuration.
//!
//! The bound thresholds, peak-hour set, and service-area box were hardcoded
//! constants in the reference dataset documentation; they are carried here as
//! one explicit structure handed to the cleaner and the feature engineer so
//! every run states its thresholds up front.

/// Latitude/longitude box bounding the service area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }
}

/// NYC service area, the dataset's home turf.
pub const NYC_BOUNDS: BoundingBox = BoundingBox {
    min_lat: 40.4774,
    max_lat: 40.9176,
    min_lon: -74.2591,
    max_lon: -73.7004,
};

/// Hours of day flagged as peak demand: 7-10 AM and 4-8 PM.
pub const DEFAULT_PEAK_HOURS: [u32; 7] = [7, 8, 9, 16, 17, 18, 19];

/// Thresholds and conventions applied uniformly across one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Trips longer than this are rejected as implausible.
    pub max_trip_distance_km: f64,
    /// Fares above this are rejected as implausible.
    pub max_fare_amount: f64,
    /// Passenger counts above this are rejected as implausible.
    pub max_passenger_count: i64,
    /// Coordinates outside this box are rejected.
    pub service_area: BoundingBox,
    /// Pickup hours flagged as peak.
    pub peak_hours: Vec<u32>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            max_trip_distance_km: 120.0,
            max_fare_amount: 500.0,
            max_passenger_count: 8,
            service_area: NYC_BOUNDS,
            peak_hours: DEFAULT_PEAK_HOURS.to_vec(),
        }
    }
}

impl PipelineConfig {
    pub fn is_peak_hour(&self, hour: u32) -> bool {
        self.peak_hours.contains(&hour)
    }
}
