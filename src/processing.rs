use crate::error::MapError;
use crate::types::{DensityRow, RegionRecord};
use tracing::{debug, info};

/// Ordered class boundaries `[b0, b1, ..., bk]` defining `k` intervals
/// `[b0, b1), [b1, b2), ..., [b(k-1), bk)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Bins {
    boundaries: Vec<f64>,
}

impl Bins {
    /// Boundaries must be finite, strictly increasing and at least two long.
    pub fn new(boundaries: Vec<f64>) -> Result<Self, MapError> {
        if boundaries.len() < 2 {
            return Err(MapError::InvalidBins(format!(
                "need at least two boundaries, got {}",
                boundaries.len()
            )));
        }
        if let Some(bad) = boundaries.iter().find(|b| !b.is_finite()) {
            return Err(MapError::InvalidBins(format!("non-finite boundary {}", bad)));
        }
        if let Some(pair) = boundaries.windows(2).find(|w| w[0] >= w[1]) {
            return Err(MapError::InvalidBins(format!(
                "boundaries must be strictly increasing, found {} then {}",
                pair[0], pair[1]
            )));
        }
        Ok(Self { boundaries })
    }

    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.boundaries.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index of the class holding `value`: the position of the first interior
    /// boundary strictly greater than `value`. Anything below `b0` lands in
    /// class 0, anything at or above `b(k-1)` in the last class.
    pub fn classify(&self, value: f64) -> usize {
        let interior = &self.boundaries[1..self.boundaries.len() - 1];
        interior.partition_point(|&b| b <= value)
    }

    pub fn range(&self, index: usize) -> (f64, f64) {
        (self.boundaries[index], self.boundaries[index + 1])
    }

    /// Legend text for a class, e.g. `(50 - 90)`.
    pub fn label(&self, index: usize) -> String {
        let (lower, upper) = self.range(index);
        format!("({} - {})", lower, upper)
    }

    pub fn labels(&self) -> Vec<String> {
        (0..self.len()).map(|i| self.label(i)).collect()
    }
}

/// Inhabitants per km². Rejects areas that are zero, negative or not finite.
pub fn compute_density(record: &RegionRecord) -> Result<f64, MapError> {
    if !(record.area_km2 > 0.0 && record.area_km2.is_finite()) {
        return Err(MapError::DivisionByZeroArea {
            name: record.name.clone(),
            area: record.area_km2,
        });
    }
    Ok(record.population as f64 / record.area_km2)
}

/// Derives density and class for every record, keeping table order.
pub fn process_data(records: &[RegionRecord], bins: &Bins) -> Result<Vec<DensityRow>, MapError> {
    let rows = records
        .iter()
        .map(|record| {
            let density = compute_density(record)?;
            let bin_index = bins.classify(density);
            debug!(region = %record.name, density, bin_index, "Classified region");
            Ok(DensityRow {
                name: record.name.clone(),
                population: record.population,
                area_km2: record.area_km2,
                density,
                bin_index,
                bin_range: bins.range(bin_index),
            })
        })
        .collect::<Result<Vec<_>, MapError>>()?;

    info!(regions = rows.len(), classes = bins.len(), "Classified densities");
    Ok(rows)
}
