/// Fixed chart palette; index 0 is the default series color
pub const PALETTE: [&str; 8] = [
    "#3B82F6", // Blue
    "#EF4444", // Red
    "#10B981", // Green
    "#F59E0B", // Yellow
    "#8B5CF6", // Purple
    "#06B6D4", // Cyan
    "#F97316", // Orange
    "#EC4899", // Pink
];

/// Palette slot for a series key (djb2 over the key bytes).
///
/// Pure function of the key: the same key maps to the same slot on every
/// render and in every session.
pub fn palette_index(key: &str) -> usize {
    let hash = key
        .bytes()
        .fold(5381u32, |hash, byte| hash.wrapping_mul(33) ^ byte as u32);
    hash as usize % PALETTE.len()
}

/// Display color for a series key
pub fn color_for_key(key: &str) -> &'static str {
    PALETTE[palette_index(key)]
}
