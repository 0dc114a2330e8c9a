//! Intensity → colour mapping.
//!
//! The table is a 256-entry "jet" ramp built once and shared read-only:
//!
//! ```text
//!   0 ────── 64 ────── 128 ────── 192 ────── 255
//!  blue    cyan      green     yellow       red
//! ```
//!
//! Each quarter moves exactly one channel by 4 per step, so adjacent entries
//! never differ by more than 4 in any channel.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// One 8-bit RGBA pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    /// Opaque black, the default waterfall background.
    pub const BLACK: Rgba = Rgba::opaque(0, 0, 0);

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::BLACK
    }
}

/// Precomputed intensity bucket → colour table.
#[derive(Debug, Clone)]
pub struct ColorMapTable {
    entries: [Rgba; 256],
}

impl ColorMapTable {
    /// Build the blue→cyan→green→yellow→red ramp.
    pub fn jet() -> Self {
        let mut entries = [Rgba::BLACK; 256];
        for (i, entry) in entries.iter_mut().enumerate() {
            // i < 256, so every product below stays within u8 range.
            let i = i as u32;
            let (r, g, b) = if i < 64 {
                (0, i * 4, 255)
            } else if i < 128 {
                (0, 255, 255 - (i - 64) * 4)
            } else if i < 192 {
                ((i - 128) * 4, 255, 0)
            } else {
                (255, 255 - (i - 192) * 4, 0)
            };
            *entry = Rgba::opaque(r as u8, g as u8, b as u8);
        }
        Self { entries }
    }

    /// Colour for an already-clamped intensity bucket.
    pub fn color_for(&self, intensity: u8) -> Rgba {
        self.entries[intensity as usize]
    }

    /// Map a row of normalized magnitudes straight to colours.
    pub fn colorize(&self, values: &[f64]) -> Vec<Rgba> {
        values
            .iter()
            .map(|&v| self.color_for(intensity_index(v)))
            .collect()
    }

    pub fn entries(&self) -> &[Rgba; 256] {
        &self.entries
    }
}

/// Process-wide shared jet table.
pub fn jet() -> &'static ColorMapTable {
    static TABLE: OnceLock<ColorMapTable> = OnceLock::new();
    TABLE.get_or_init(ColorMapTable::jet)
}

/// Convert a magnitude to a table index: `floor(v * 255)` clamped to 0..=255.
///
/// Negative values and NaN land on 0; anything at or above 1.0 lands on 255.
pub fn intensity_index(value: f64) -> u8 {
    let scaled = (value * 255.0).floor();
    if scaled.is_nan() || scaled <= 0.0 {
        0
    } else if scaled >= 255.0 {
        255
    } else {
        scaled as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_opaque_blue() {
        assert_eq!(jet().color_for(0), Rgba::opaque(0, 0, 255));
    }

    #[test]
    fn top_is_opaque_red() {
        let c = jet().color_for(255);
        assert_eq!(c.r, 255);
        assert_eq!(c.b, 0);
        assert_eq!(c.a, 255);
        assert!(c.g <= 4, "expected red-family, got {c:?}");
    }

    #[test]
    fn segment_boundaries() {
        let t = ColorMapTable::jet();
        assert_eq!(t.color_for(64), Rgba::opaque(0, 255, 255));
        assert_eq!(t.color_for(128), Rgba::opaque(0, 255, 0));
        assert_eq!(t.color_for(192), Rgba::opaque(255, 255, 0));
    }

    #[test]
    fn every_entry_is_opaque() {
        for c in jet().entries() {
            assert_eq!(c.a, 255);
        }
    }

    #[test]
    fn adjacent_entries_have_no_gaps() {
        for w in jet().entries().windows(2) {
            let d = |a: u8, b: u8| (a as i16 - b as i16).abs();
            assert!(d(w[0].r, w[1].r) <= 4);
            assert!(d(w[0].g, w[1].g) <= 4);
            assert!(d(w[0].b, w[1].b) <= 4);
        }
    }

    #[test]
    fn hue_moves_from_blue_to_red() {
        // Red never decreases and blue never increases along the ramp.
        for w in jet().entries().windows(2) {
            assert!(w[1].r >= w[0].r);
            assert!(w[1].b <= w[0].b);
        }
    }

    #[test]
    fn table_is_deterministic() {
        assert_eq!(ColorMapTable::jet().entries(), jet().entries());
    }

    #[test]
    fn intensity_index_clamps() {
        assert_eq!(intensity_index(0.0), 0);
        assert_eq!(intensity_index(-3.0), 0);
        assert_eq!(intensity_index(f64::NAN), 0);
        assert_eq!(intensity_index(1.0), 255);
        assert_eq!(intensity_index(42.0), 255);
        assert_eq!(intensity_index(f64::INFINITY), 255);
        assert_eq!(intensity_index(0.5), 127);
    }

    #[test]
    fn colorize_maps_each_value() {
        let row = jet().colorize(&[0.0, 1.0]);
        assert_eq!(row, vec![jet().color_for(0), jet().color_for(255)]);
    }
}
