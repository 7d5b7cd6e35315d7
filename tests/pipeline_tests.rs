//! End-to-end runs of the density map pipeline on small GeoJSON fixtures.

use density_map::palette::{derive_palette, Gradient};
use density_map::render::map_viewport;
use density_map::{pipeline, AppConfig, MapError};
use std::path::Path;
use tempfile::TempDir;

/// Managua and Masaya as boxes, plus a shape the table does not know.
const FIXTURE: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature", "properties": {"NAME_1": "Managua"},
     "geometry": {"type": "Polygon", "coordinates":
       [[[-86.0,12.0],[-84.0,12.0],[-84.0,14.0],[-86.0,14.0],[-86.0,12.0]]]}},
    {"type": "Feature", "properties": {"NAME_1": "Masaya"},
     "geometry": {"type": "MultiPolygon", "coordinates": [
       [[[-87.5,11.0],[-86.5,11.0],[-86.5,11.8],[-87.5,11.8],[-87.5,11.0]]],
       [[[-82.9,14.5],[-82.4,14.5],[-82.4,15.0],[-82.9,15.0],[-82.9,14.5]]]]}},
    {"type": "Feature", "properties": {"NAME_1": "Zelaya Central"},
     "geometry": {"type": "Polygon", "coordinates":
       [[[-83.5,11.0],[-82.5,11.0],[-82.5,12.0],[-83.5,12.0],[-83.5,11.0]]]}}
  ]
}"#;

fn config_in(dir: &Path, output: &str) -> AppConfig {
    let geometry = dir.join("NIC_adm1.geojson");
    if !geometry.exists() {
        std::fs::write(&geometry, FIXTURE).unwrap();
    }
    let mut config = AppConfig::default();
    config.input.geometry = geometry;
    config.output.path = dir.join(output);
    config
}

#[test]
fn renders_and_reports_unmatched_names() {
    let dir = TempDir::new().unwrap();
    let config = config_in(dir.path(), "map.png");

    let report = pipeline::run(&config).unwrap();

    assert!(config.output.path.is_file());
    assert_eq!(report.polygons, 3);
    assert_eq!(report.matched, 2);
    assert_eq!(report.unmatched, vec!["Zelaya Central".to_string()]);
    assert_eq!(report.regions_without_shape.len(), 15);
    assert!(!report.regions_without_shape.contains(&"Managua".to_string()));

    let img = image::open(&config.output.path).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (report.width, report.height));
    assert!(report.height < 900, "whitespace should be trimmed");
}

#[test]
fn polygons_take_class_and_fallback_colors() {
    let dir = TempDir::new().unwrap();
    let mut config = config_in(dir.path(), "untrimmed.png");
    config.output.trim = false;

    pipeline::run(&config).unwrap();
    let img = image::open(&config.output.path).unwrap().to_rgba8();
    let (fig_w, fig_h) = config.output.pixel_size();
    // the canvas only ever grows to the right, to fit legend labels
    assert_eq!(img.height(), fig_h);
    assert!(img.width() >= fig_w);

    let palette = derive_palette(&Gradient::ylorrd(), 7);
    let vp = map_viewport(&config);
    let pixel_at = |lon: f64, lat: f64| {
        let (x, y) = vp.to_pixel(lon, lat);
        *img.get_pixel(x as u32, y as u32)
    };

    // Managua ≈ 427/km² -> class 6
    assert_eq!(pixel_at(-85.0, 13.0), palette[6]);
    // both parts of Masaya ≈ 593/km² -> class 6
    assert_eq!(pixel_at(-87.0, 11.4), palette[6]);
    assert_eq!(pixel_at(-82.65, 14.75), palette[6]);
    // unknown name falls back to the first class color
    assert_eq!(pixel_at(-83.0, 11.5), palette[0]);
    // open map area stays white
    assert_eq!(pixel_at(-82.3, 13.0), image::Rgba([255, 255, 255, 255]));
}

#[test]
fn configured_fallback_color_is_used() {
    let dir = TempDir::new().unwrap();
    let mut config = config_in(dir.path(), "fallback.png");
    config.output.trim = false;
    config.map.fallback_color = Some("#00ff00".to_string());

    pipeline::run(&config).unwrap();
    let img = image::open(&config.output.path).unwrap().to_rgba8();
    let (x, y) = map_viewport(&config).to_pixel(-83.0, 11.5);
    assert_eq!(*img.get_pixel(x as u32, y as u32), image::Rgba([0, 255, 0, 255]));
}

#[test]
fn identical_runs_write_identical_bytes() {
    let dir = TempDir::new().unwrap();
    let first = config_in(dir.path(), "first.png");
    let second = config_in(dir.path(), "second.png");

    pipeline::run(&first).unwrap();
    pipeline::run(&second).unwrap();

    let a = std::fs::read(&first.output.path).unwrap();
    let b = std::fs::read(&second.output.path).unwrap();
    assert!(!a.is_empty());
    assert_eq!(a, b);
}

#[test]
fn missing_geometry_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let mut config = AppConfig::default();
    config.input.geometry = dir.path().join("absent.shp");
    config.output.path = dir.path().join("never.png");

    let err = pipeline::run(&config).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<MapError>(),
        Some(MapError::MissingGeographicSource { .. })
    ));
    assert!(!config.output.path.exists());
}

#[test]
fn csv_table_override_drives_classes() {
    let dir = TempDir::new().unwrap();
    let mut config = config_in(dir.path(), "csv.png");
    config.output.trim = false;
    let csv = dir.path().join("regions.csv");
    std::fs::write(&csv, "name,population,area_km2\nManagua,1000,100\nZelaya Central,50000,100\n").unwrap();
    config.input.data_csv = Some(csv);

    let report = pipeline::run(&config).unwrap();
    assert_eq!(report.matched, 2);
    assert_eq!(report.unmatched, vec!["Masaya".to_string()]);

    let img = image::open(&config.output.path).unwrap().to_rgba8();
    let palette = derive_palette(&Gradient::ylorrd(), 7);
    let vp = map_viewport(&config);
    let (x, y) = vp.to_pixel(-85.0, 13.0);
    // 10/km² -> class 0
    assert_eq!(*img.get_pixel(x as u32, y as u32), palette[0]);
    let (x, y) = vp.to_pixel(-83.0, 11.5);
    // 500/km² -> class 6
    assert_eq!(*img.get_pixel(x as u32, y as u32), palette[6]);
}
