use crate::config::MapConfig;

/// Equatorial radius used for the scale bar, in km.
const EARTH_RADIUS_KM: f64 = 6378.137;

/// Spherical Mercator in radians: (lon, lat) degrees -> (x, y).
pub fn mercator(lon: f64, lat: f64) -> (f64, f64) {
    let lat_rad = lat.to_radians();
    let x = lon.to_radians();
    let y = (lat_rad.tan() + (1.0 / lat_rad.cos())).ln();
    (x, y)
}

/// Longitude span covering `km` along the parallel at `lat`.
pub fn km_to_degrees_lon(km: f64, lat: f64) -> f64 {
    (km / (EARTH_RADIUS_KM * lat.to_radians().cos())).to_degrees()
}

/// Pixel rectangle, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PixelRect {
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Builds a rect from figure fractions `[left, bottom, width, height]`
    /// measured from the bottom-left corner of a `fig_w` x `fig_h` figure.
    pub fn from_figure_fraction(frac: [f32; 4], fig_w: u32, fig_h: u32) -> Self {
        let [left, bottom, width, height] = frac;
        let (fw, fh) = (fig_w as f32, fig_h as f32);
        Self {
            x: left * fw,
            y: (1.0 - bottom - height) * fh,
            width: width * fw,
            height: height * fh,
        }
    }
}

/// Maps lon/lat into a pixel frame, keeping the projected aspect ratio.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    min: (f64, f64),
    max: (f64, f64),
    frame: PixelRect,
}

impl Viewport {
    /// Fits the configured extent into `area`, centred, shrinking one axis
    /// so that a projected unit is square.
    pub fn fit(map: &MapConfig, area: PixelRect) -> Self {
        let min = mercator(map.min_lon, map.min_lat);
        let max = mercator(map.max_lon, map.max_lat);
        let extent_aspect = (max.0 - min.0) / (max.1 - min.1);
        let area_aspect = area.width as f64 / area.height as f64;

        let frame = if extent_aspect > area_aspect {
            let height = (area.width as f64 / extent_aspect) as f32;
            PixelRect {
                x: area.x,
                y: area.y + (area.height - height) / 2.0,
                width: area.width,
                height,
            }
        } else {
            let width = (area.height as f64 * extent_aspect) as f32;
            PixelRect {
                x: area.x + (area.width - width) / 2.0,
                y: area.y,
                width,
                height: area.height,
            }
        };

        Self { min, max, frame }
    }

    pub fn frame(&self) -> PixelRect {
        self.frame
    }

    pub fn to_pixel(&self, lon: f64, lat: f64) -> (f32, f32) {
        let (x, y) = mercator(lon, lat);
        let fx = (x - self.min.0) / (self.max.0 - self.min.0);
        let fy = (self.max.1 - y) / (self.max.1 - self.min.1);
        (
            self.frame.x + (fx * self.frame.width as f64) as f32,
            self.frame.y + (fy * self.frame.height as f64) as f32,
        )
    }
}
