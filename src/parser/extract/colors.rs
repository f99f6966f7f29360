use crate::store::Color;

/// Comma-separated color list → known colors in first-seen order, no repeats.
/// Unknown tokens are dropped.
pub fn parse(raw: &str) -> Vec<Color> {
    let mut colors = Vec::new();
    for color in raw.split(',').filter_map(Color::parse) {
        if !colors.contains(&color) {
            colors.push(color);
        }
    }
    colors
}
