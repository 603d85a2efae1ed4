use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};

use crate::data::model::CellValue;

/// Accent for single-series charts.
pub const ACCENT: Color32 = Color32::from_rgb(0x00, 0xF5, 0xA0);

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            to_color32(rgb)
        })
        .collect()
}

/// Rounds to the nearest 8-bit channel, so linear round trips of white stay white.
fn to_color32(rgb: Srgb) -> Color32 {
    let rgb: Srgb<u8> = rgb.into_format();
    Color32::from_rgb(rgb.red, rgb.green, rgb.blue)
}

/// Diverging blue → white → red scale for correlations in [-1, 1].
/// Values outside the range are clamped; `None` renders grey.
pub fn diverging(value: Option<f64>) -> Color32 {
    let Some(v) = value else {
        return Color32::DARK_GRAY;
    };
    let v = v.clamp(-1.0, 1.0) as f32;
    let white = LinSrgb::new(1.0, 1.0, 1.0);
    let end: LinSrgb = if v < 0.0 {
        Srgb::new(0.13, 0.40, 0.67).into_linear()
    } else {
        Srgb::new(0.70, 0.09, 0.17).into_linear()
    };
    let mixed = white.mix(end, v.abs());
    to_color32(Srgb::from_linear(mixed))
}

// ---------------------------------------------------------------------------
// Color mapping: categorical value → Color32
// ---------------------------------------------------------------------------

/// Maps unique values of a chosen categorical column to distinct colours.
#[derive(Debug, Clone)]
pub struct ColorMap {
    pub column: String,
    mapping: BTreeMap<CellValue, Color32>,
    default_color: Color32,
}

impl ColorMap {
    /// Build a colour map for the given column from its unique values.
    pub fn new(column: &str, unique_values: &BTreeSet<CellValue>) -> Self {
        let palette = generate_palette(unique_values.len());
        let mapping: BTreeMap<CellValue, Color32> = unique_values
            .iter()
            .cloned()
            .zip(palette)
            .collect();

        ColorMap {
            column: column.to_string(),
            mapping,
            default_color: Color32::GRAY,
        }
    }

    /// Look up the colour for a given value.
    pub fn color_for(&self, value: &CellValue) -> Color32 {
        self.mapping
            .get(value)
            .copied()
            .unwrap_or(self.default_color)
    }

    /// Convenience for text labels such as cluster ids.
    pub fn color_for_label(&self, label: &str) -> Color32 {
        self.color_for(&CellValue::Text(label.to_string()))
    }

    /// Return the legend entries (value label → colour) for the UI.
    pub fn legend_entries(&self) -> Vec<(String, Color32)> {
        self.mapping
            .iter()
            .map(|(v, c)| (v.to_string(), *c))
            .collect()
    }
}
