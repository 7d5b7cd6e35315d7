use geo::MultiPolygon;
use serde::Deserialize;

/// One row of the input table. Names must match the geographic source
/// byte for byte, accents included.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegionRecord {
    pub name: String,
    pub population: u64,
    pub area_km2: f64,
}

/// A region record after density and class assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityRow {
    pub name: String,
    pub population: u64,
    pub area_km2: f64,
    /// Inhabitants per km².
    pub density: f64,
    pub bin_index: usize,
    pub bin_range: (f64, f64),
}

/// A named shape from the geographic source.
#[derive(Debug, Clone)]
pub struct RegionShape {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}
