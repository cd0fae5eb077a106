/// Fallback tint used whenever a colour string cannot be parsed.
pub const OPAQUE_WHITE: [f32; 3] = [1.0, 1.0, 1.0];

/// Converts `#rgb`, `#rrggbb`, `rgb`, or `rrggbb` into normalized channels.
///
/// Each channel is the parsed byte divided by 255. Anything else yields
/// [`OPAQUE_WHITE`] so a typo in configuration never blanks the effect.
pub fn hex_to_rgb(hex: &str) -> [f32; 3] {
    let digits = hex.trim();
    let digits = digits.strip_prefix('#').unwrap_or(digits);
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return OPAQUE_WHITE;
    }

    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_string(),
        _ => return OPAQUE_WHITE,
    };

    let Ok(value) = u32::from_str_radix(&expanded, 16) else {
        return OPAQUE_WHITE;
    };
    [
        ((value >> 16) & 0xff) as f32 / 255.0,
        ((value >> 8) & 0xff) as f32 / 255.0,
        (value & 0xff) as f32 / 255.0,
    ]
}
