//! Sequential color ramps and their reduction to one color per class.

use crate::error::MapError;
use image::Rgba;

/// ColorBrewer YlOrRd, light to dark.
const YLORRD_ANCHORS: [[u8; 3]; 9] = [
    [0xff, 0xff, 0xcc],
    [0xff, 0xed, 0xa0],
    [0xfe, 0xd9, 0x76],
    [0xfe, 0xb2, 0x4c],
    [0xfd, 0x8d, 0x3c],
    [0xfc, 0x4e, 0x2a],
    [0xe3, 0x1a, 0x1c],
    [0xbd, 0x00, 0x26],
    [0x80, 0x00, 0x26],
];

/// Number of samples in a continuous ramp.
pub const GRADIENT_SAMPLES: usize = 256;

/// A continuous ramp stored as evenly spaced samples.
#[derive(Debug, Clone)]
pub struct Gradient {
    samples: Vec<Rgba<u8>>,
}

impl Gradient {
    /// Linearly interpolates `anchors` (evenly spaced on [0, 1]) into `n`
    /// samples.
    pub fn from_anchors(anchors: &[[u8; 3]], n: usize) -> Self {
        if anchors.is_empty() || n == 0 {
            return Self { samples: Vec::new() };
        }
        if anchors.len() == 1 {
            let [r, g, b] = anchors[0];
            return Self { samples: vec![Rgba([r, g, b, 255]); n] };
        }

        let segments = anchors.len() - 1;
        let samples = (0..n)
            .map(|i| {
                let x = if n == 1 { 0.0 } else { i as f64 / (n - 1) as f64 };
                let pos = x * segments as f64;
                let lo = (pos.floor() as usize).min(segments - 1);
                let t = pos - lo as f64;
                let (a, b) = (anchors[lo], anchors[lo + 1]);
                let lerp = |c: usize| (a[c] as f64 + (b[c] as f64 - a[c] as f64) * t).round() as u8;
                Rgba([lerp(0), lerp(1), lerp(2), 255])
            })
            .collect();

        Self { samples }
    }

    pub fn ylorrd() -> Self {
        Self::from_anchors(&YLORRD_ANCHORS, GRADIENT_SAMPLES)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample(&self, index: usize) -> Rgba<u8> {
        self.samples[index]
    }
}

/// Gradient indices used for `classes` colors: every `ceil(n / classes)`-th
/// sample from 0, truncated to `classes`, padded with the last sample.
pub fn sample_indices(n: usize, classes: usize) -> Vec<usize> {
    if n == 0 || classes == 0 {
        return Vec::new();
    }
    let stride = n.div_ceil(classes);
    let mut indices: Vec<usize> = (0..n).step_by(stride).take(classes).collect();
    indices.resize(classes, n - 1);
    indices
}

/// One color per class, light for low classes and dark for high ones.
pub fn derive_palette(gradient: &Gradient, classes: usize) -> Vec<Rgba<u8>> {
    sample_indices(gradient.len(), classes)
        .into_iter()
        .map(|i| gradient.sample(i))
        .collect()
}

pub fn hex_to_rgba(hex: &str) -> Result<Rgba<u8>, MapError> {
    let digits = hex.trim_start_matches('#');
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(MapError::InvalidColor(hex.to_string()));
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&digits[range], 16).map_err(|_| MapError::InvalidColor(hex.to_string()))
    };
    Ok(Rgba([channel(0..2)?, channel(2..4)?, channel(4..6)?, 255]))
}

/// A gray of the given lightness, 0.0 black to 1.0 white.
pub fn gray(level: f32) -> Rgba<u8> {
    let v = (level.clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgba([v, v, v, 255])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn luminance(c: Rgba<u8>) -> f64 {
        0.2126 * c[0] as f64 + 0.7152 * c[1] as f64 + 0.0722 * c[2] as f64
    }

    #[test]
    fn ylorrd_endpoints_match_anchors() {
        let g = Gradient::ylorrd();
        assert_eq!(g.len(), 256);
        assert_eq!(g.sample(0), Rgba([0xff, 0xff, 0xcc, 255]));
        assert_eq!(g.sample(255), Rgba([0x80, 0x00, 0x26, 255]));
    }

    #[test]
    fn seven_classes_take_every_37th_sample() {
        assert_eq!(sample_indices(256, 7), vec![0, 37, 74, 111, 148, 185, 222]);
    }

    #[test]
    fn short_stride_is_padded() {
        // stride 2 over ten samples only reaches five candidates
        assert_eq!(sample_indices(10, 6), vec![0, 2, 4, 6, 8, 9]);
        assert_eq!(sample_indices(256, 6), vec![0, 43, 86, 129, 172, 215]);
    }

    #[test]
    fn more_classes_than_samples_pads_with_last() {
        assert_eq!(sample_indices(3, 5), vec![0, 1, 2, 2, 2]);
    }

    #[test]
    fn palette_darkens_with_class() {
        let palette = derive_palette(&Gradient::ylorrd(), 7);
        assert_eq!(palette.len(), 7);
        for pair in palette.windows(2) {
            assert!(luminance(pair[0]) > luminance(pair[1]));
        }
    }

    #[test]
    fn hex_parsing() {
        assert_eq!(hex_to_rgba("#4d4d4d").unwrap(), Rgba([0x4d, 0x4d, 0x4d, 255]));
        assert_eq!(hex_to_rgba("FFFFFF").unwrap(), Rgba([255, 255, 255, 255]));
        assert!(hex_to_rgba("#12345").is_err());
        assert!(hex_to_rgba("#zzzzzz").is_err());
    }

    #[test]
    fn gray_levels() {
        assert_eq!(gray(0.3), Rgba([77, 77, 77, 255]));
        assert_eq!(gray(1.0), Rgba([255, 255, 255, 255]));
    }

    proptest! {
        #[test]
        fn palette_length_and_order(n in 1usize..512, classes in 1usize..40) {
            let indices = sample_indices(n, classes);
            prop_assert_eq!(indices.len(), classes);
            prop_assert!(indices.iter().all(|&i| i < n));
            prop_assert!(indices.windows(2).all(|w| w[0] <= w[1]));
            prop_assert_eq!(indices[0], 0);
        }
    }
}
