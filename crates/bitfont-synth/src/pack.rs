//! Grid packing of glyph bitmaps.

/// Where each glyph bitmap goes in the atlas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasLayout {
    /// Atlas width, a power of two.
    pub width: u32,
    /// Atlas height, a power of two.
    pub height: u32,
    /// Top-left corner of each bitmap, padding already applied, in input
    /// order.
    pub positions: Vec<(u32, u32)>,
}

/// Lay out bitmaps of the given sizes on a near-square grid of equal cells.
///
/// Each cell is the largest bitmap plus `padding` on every side; cells are
/// `spacing` pixels apart.
pub fn pack(sizes: &[(u32, u32)], padding: u32, spacing: u32) -> AtlasLayout {
    let max_w = sizes.iter().map(|&(w, _)| w).max().unwrap_or(0);
    let max_h = sizes.iter().map(|&(_, h)| h).max().unwrap_or(0);
    let pitch_x = (max_w + 2 * padding).max(1) + spacing;
    let pitch_y = (max_h + 2 * padding).max(1) + spacing;

    let count = sizes.len().max(1) as u32;
    let cols = (count as f64).sqrt().ceil() as u32;
    let rows = count.div_ceil(cols);

    let positions = (0..sizes.len() as u32)
        .map(|i| ((i % cols) * pitch_x + padding, (i / cols) * pitch_y + padding))
        .collect();

    AtlasLayout {
        width: (cols * pitch_x).next_power_of_two(),
        height: (rows * pitch_y).next_power_of_two(),
        positions,
    }
}
