use crate::config::AppConfig;
use crate::data;
use crate::palette::{derive_palette, Gradient};
use crate::processing::{process_data, Bins};
use crate::render::{render_map, RenderReport};
use crate::types::DensityRow;
use anyhow::Result;
use tracing::info;

/// Loads the table and classifies every region.
pub fn classify_table(config: &AppConfig) -> Result<(Bins, Vec<DensityRow>)> {
    let bins = Bins::new(config.classification.boundaries.clone())?;
    let regions = data::load_regions(config)?;
    let rows = process_data(&regions, &bins)?;
    Ok((bins, rows))
}

/// Full run: shapes, table, classes, palette, image.
pub fn run(config: &AppConfig) -> Result<RenderReport> {
    // Shapes first: without them nothing may be written.
    let shapes = data::load_shapes(config)?;
    let (bins, rows) = classify_table(config)?;

    let palette = derive_palette(&Gradient::ylorrd(), bins.len());
    info!(classes = palette.len(), "Derived palette");

    render_map(config, &rows, &shapes, &bins, &palette)
}

/// Plain-text listing of the classified table.
pub fn format_table(rows: &[DensityRow], bins: &Bins) -> String {
    let header = format!(
        "{:<18} {:>10} {:>10} {:>9} {:>5}  {}\n",
        "Department", "Population", "Area", "Density", "Class", "Range"
    );
    rows.iter().fold(header, |mut out, row| {
        out.push_str(&format!(
            "{:<18} {:>10} {:>10.2} {:>9.2} {:>5}  {}\n",
            row.name,
            row.population,
            row.area_km2,
            row.density,
            row.bin_index,
            bins.label(row.bin_index)
        ));
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_classifies() {
        let (bins, rows) = classify_table(&AppConfig::default()).unwrap();
        assert_eq!(bins.len(), 7);
        assert_eq!(rows.len(), 17);
    }

    #[test]
    fn bad_boundaries_fail_before_loading() {
        let mut config = AppConfig::default();
        config.classification.boundaries = vec![10.0, 5.0];
        assert!(classify_table(&config).is_err());
    }

    #[test]
    fn table_lists_every_row() {
        let (bins, rows) = classify_table(&AppConfig::default()).unwrap();
        let text = format_table(&rows, &bins);
        assert_eq!(text.lines().count(), 18);
        let managua = text.lines().find(|l| l.starts_with("Managua")).unwrap();
        assert!(managua.contains("427.19"));
        assert!(managua.contains("(400 - 600)"));
        assert!(text.ends_with('\n'));
        assert!(text.starts_with("Department"));
    }
}
