use crate::config::AppConfig;
use crate::error::MapError;
use crate::types::{RegionRecord, RegionShape};
use anyhow::{Context, Result, anyhow};
use csv::ReaderBuilder;
use geo::MultiPolygon;
use shapefile::Reader;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

/// Departments of Nicaragua: name, inhabitants, surface in km².
///
/// Sources: ProNicaragua population figures and the INIDE compendium.
/// Names keep their accents because the GADM shapes spell them that way.
pub const NIC_DATA: &[(&str, u64, f64)] = &[
    ("Managua", 1_480_270, 3465.10),
    ("Matagalpa", 547_500, 6803.86),
    ("Atlántico Norte", 476_298, 32819.68),
    ("Jinotega", 438_412, 9222.40),
    ("Chinandega", 419_753, 4822.42),
    ("León", 399_879, 5138.03),
    ("Atlántico Sur", 380_121, 27546.32),
    ("Masaya", 361_914, 610.78),
    ("Nueva Segovia", 249_376, 3491.28),
    ("Estelí", 223_356, 2229.69),
    ("Granada", 201_993, 1039.68),
    ("Chontales", 191_127, 6481.27),
    ("Carazo", 186_438, 1081.40),
    ("Rivas", 172_289, 2161.82),
    ("Boaco", 160_711, 4176.68),
    ("Madriz", 158_705, 1708.23),
    ("Río San Juan", 119_095, 7540.90),
];

pub fn builtin_regions() -> Vec<RegionRecord> {
    NIC_DATA
        .iter()
        .map(|&(name, population, area_km2)| RegionRecord {
            name: name.to_string(),
            population,
            area_km2,
        })
        .collect()
}

/// The region table for this run: the CSV override when configured,
/// otherwise the built-in departments.
pub fn load_regions(config: &AppConfig) -> Result<Vec<RegionRecord>> {
    let regions = match &config.input.data_csv {
        Some(path) => load_csv_regions(path)?,
        None => builtin_regions(),
    };
    info!(count = regions.len(), "Loaded region table");
    Ok(regions)
}

/// Reads `name,population,area_km2` rows. Areas are checked here so a bad
/// row is reported with its name before any division happens.
pub fn load_csv_regions(path: &Path) -> Result<Vec<RegionRecord>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open CSV file: {:?}", path))?;
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

    let mut regions = Vec::new();
    for result in rdr.deserialize() {
        let record: RegionRecord = result
            .with_context(|| format!("Malformed row in {:?}", path))?;
        if !(record.area_km2 > 0.0 && record.area_km2.is_finite()) {
            return Err(MapError::DivisionByZeroArea {
                name: record.name,
                area: record.area_km2,
            }
            .into());
        }
        regions.push(record);
    }

    Ok(regions)
}

/// Loads the administrative boundaries. Any failure to find or open the
/// source is fatal.
pub fn load_shapes(config: &AppConfig) -> Result<Vec<RegionShape>> {
    let path = &config.input.geometry;
    if !path.is_file() {
        return Err(MapError::MissingGeographicSource { path: path.clone() }.into());
    }

    let extension = path.extension()
        .and_then(|e| e.to_str())
        .map(|s: &str| s.to_lowercase())
        .ok_or_else(|| MapError::UnsupportedFormat(format!("{:?} has no extension", path)))?;

    let shapes = match extension.as_str() {
        "shp" => load_shapefile(path, &config.input.name_field)?,
        "json" | "geojson" => load_geojson(path, &config.input.name_field)?,
        other => return Err(MapError::UnsupportedFormat(other.to_string()).into()),
    };

    info!(count = shapes.len(), source = ?path, "Loaded region shapes");
    Ok(shapes)
}

fn load_shapefile(path: &Path, name_field: &str) -> Result<Vec<RegionShape>> {
    let mut reader = Reader::from_path(path)
        .with_context(|| MapError::MissingGeographicSource { path: path.to_path_buf() })?;

    let mut shapes = Vec::new();

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result
            .with_context(|| format!("Failed to read shape from {:?}", path))?;

        let name_value = record.get(name_field)
            .ok_or_else(|| MapError::MissingNameField { field: name_field.to_string() })?;

        let name = match name_value {
            shapefile::dbase::FieldValue::Character(Some(s)) => s.clone(),
            shapefile::dbase::FieldValue::Character(None) => {
                debug!("Skipping shape with empty name");
                continue;
            }
            _ => return Err(anyhow!("Shapefile name field '{}' must be a string", name_field)),
        };

        let geometry: MultiPolygon<f64> = match shape {
            shapefile::Shape::Polygon(polygon) => polygon.try_into()
                .map_err(|e| anyhow!("Failed to convert polygon '{}': {:?}", name, e))?,
            shapefile::Shape::PolygonM(polygon) => polygon.try_into()
                .map_err(|e| anyhow!("Failed to convert polygonM '{}': {:?}", name, e))?,
            shapefile::Shape::PolygonZ(polygon) => polygon.try_into()
                .map_err(|e| anyhow!("Failed to convert polygonZ '{}': {:?}", name, e))?,
            other => {
                debug!(name = %name, shape = ?other.shapetype(), "Skipping non-polygon shape");
                continue;
            }
        };

        shapes.push(RegionShape { name, geometry });
    }

    Ok(shapes)
}

fn load_geojson(path: &Path, name_field: &str) -> Result<Vec<RegionShape>> {
    use geojson::GeoJson;
    use std::io::BufReader;

    let file = File::open(path)
        .with_context(|| MapError::MissingGeographicSource { path: path.to_path_buf() })?;
    let reader = BufReader::new(file);

    let geojson = GeoJson::from_reader(reader).context("Failed to parse GeoJSON")?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("GeoJSON must be a FeatureCollection")),
    };

    let mut shapes = Vec::new();

    for feature in collection.features {
        let name = match feature.properties.as_ref().and_then(|props| props.get(name_field)) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(_) => return Err(anyhow!("GeoJSON name property '{}' must be a string", name_field)),
            None => {
                debug!("Skipping feature without '{}'", name_field);
                continue;
            }
        };

        let geometry = match feature.geometry {
            Some(geom) => {
                let geo_geom: geo::Geometry<f64> = geom.value.try_into()
                    .map_err(|e| anyhow!("Failed to convert geometry of '{}': {:?}", name, e))?;

                match geo_geom {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => {
                        debug!(name = %name, "Skipping non-polygon feature");
                        continue;
                    }
                }
            }
            None => continue,
        };

        shapes.push(RegionShape { name, geometry });
    }

    Ok(shapes)
}
