use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{Context, Result};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub classification: ClassificationConfig,
    pub map: MapConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    /// `.shp` (with its `.dbf` alongside) or `.geojson`/`.json`
    pub geometry: PathBuf,
    /// Attribute holding the department name
    pub name_field: String,
    /// Replaces the built-in table when set
    pub data_csv: Option<PathBuf>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            geometry: PathBuf::from("NIC_adm1.shp"),
            name_field: "NAME_1".to_string(),
            data_csv: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClassificationConfig {
    pub boundaries: Vec<f64>,
    /// Appended to every legend label
    pub unit: String,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            boundaries: vec![1.0, 20.0, 50.0, 90.0, 150.0, 200.0, 400.0, 600.0],
            unit: "/km²".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
    pub title: String,
    /// Hex code for polygons with no table row; first palette color if unset
    pub fallback_color: Option<String>,
    pub scale_bar: ScaleBarConfig,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            min_lon: -88.00,
            min_lat: 10.50,
            max_lon: -81.89,
            max_lat: 15.33,
            title: "Nicaragua\nPopulation Density".to_string(),
            fallback_color: None,
            scale_bar: ScaleBarConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScaleBarConfig {
    pub enabled: bool,
    /// Centre of the bar
    pub lon: f64,
    pub lat: f64,
    pub length_km: f64,
}

impl Default for ScaleBarConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lon: -87.423,
            lat: 10.93,
            length_km: 100.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
    pub dpi: u32,
    pub width_inches: f32,
    pub height_inches: f32,
    /// Crop surrounding whitespace, keeping `pad_inches` around the content
    pub trim: bool,
    pub pad_inches: f32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("NIC_Population_Density.png"),
            dpi: 150,
            width_inches: 8.0,
            height_inches: 6.0,
            trim: true,
            pad_inches: 0.1,
        }
    }
}

impl OutputConfig {
    pub fn pixel_size(&self) -> (u32, u32) {
        let dpi = self.dpi as f32;
        (
            (self.width_inches * dpi).round().max(1.0) as u32,
            (self.height_inches * dpi).round().max(1.0) as u32,
        )
    }

    /// Converts a typographic size in points to pixels at the output DPI.
    pub fn points_to_pixels(&self, points: f32) -> f32 {
        points * self.dpi as f32 / 72.0
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }

    /// Loads `path` when given, otherwise the built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_file(p),
            None => Ok(Self::default()),
        }
    }
}
