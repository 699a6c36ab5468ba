use eframe::egui::Color32;
use palette::named;
use palette::Srgb;

use crate::data::model::{Condition, LegendEntry, PaletteColor};

// ---------------------------------------------------------------------------
// PaletteColor → Color32
// ---------------------------------------------------------------------------

fn srgb(color: PaletteColor) -> Srgb<u8> {
    match color {
        PaletteColor::Blue => named::BLUE,
        PaletteColor::Red => named::RED,
        PaletteColor::Green => named::GREEN,
        PaletteColor::Yellow => named::YELLOW,
        PaletteColor::Cyan => named::CYAN,
        PaletteColor::Magenta => named::MAGENTA,
    }
}

/// Convert a palette colour to an egui colour with the given opacity.
pub fn to_color32(color: PaletteColor, alpha: f32) -> Color32 {
    let rgb = srgb(color);
    let a = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
    Color32::from_rgba_unmultiplied(rgb.red, rgb.green, rgb.blue, a)
}

/// Opaque colour for condition labels in the legend.
pub fn condition_color(condition: Condition) -> Color32 {
    to_color32(condition.color(), 1.0)
}

/// Translucent colour of a legend entry, as drawn on the plots.
pub fn legend_color(entry: &LegendEntry) -> Color32 {
    to_color32(entry.color, entry.alpha)
}

/// Line colour for the `index`-th sampled participant.
pub fn participant_color(index: usize) -> Color32 {
    let palette = PaletteColor::PARTICIPANTS;
    to_color32(palette[index % palette.len()], 1.0)
}
