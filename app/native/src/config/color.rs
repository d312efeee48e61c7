//! Color values used by the effect configuration.
//!
//! Colors are written as `#RGB`, `#RRGGBB`, `#RRGGBBAA` or `rgba(r, g, b, a)`
//! (channels 0-255, alpha 0-1).

use serde::{Deserialize, Serialize};

/// A color with `f64` channels in the `0.0..=1.0` range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Rgba {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self { r: 0.0, g: 0.0, b: 0.0, a: 0.0 };

    /// Creates a color, clamping every channel into `0.0..=1.0`.
    #[must_use]
    pub fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self {
            r: r.clamp(0.0, 1.0),
            g: g.clamp(0.0, 1.0),
            b: b.clamp(0.0, 1.0),
            a: a.clamp(0.0, 1.0),
        }
    }

    /// Returns whether the color is fully transparent.
    #[must_use]
    pub fn is_transparent(&self) -> bool { self.a <= f64::EPSILON }
}

impl Default for Rgba {
    fn default() -> Self { Self::TRANSPARENT }
}

/// Parses any supported color notation.
///
/// # Errors
///
/// Returns a description of the problem when the string is not a valid color.
pub fn parse_color(value: &str) -> Result<Rgba, String> {
    let trimmed = value.trim();

    if trimmed.eq_ignore_ascii_case("clear") || trimmed.eq_ignore_ascii_case("transparent") {
        return Ok(Rgba::TRANSPARENT);
    }

    if trimmed.starts_with('#') {
        parse_hex_color(trimmed)
    } else if trimmed.to_ascii_lowercase().starts_with("rgba(") {
        parse_rgba_color(trimmed)
    } else {
        Err(format!("Unsupported color format: {value}"))
    }
}

/// Parses `#RGB`, `#RRGGBB` or `#RRGGBBAA`.
///
/// # Errors
///
/// Returns an error when the string has the wrong length or non-hex digits.
pub fn parse_hex_color(value: &str) -> Result<Rgba, String> {
    let hex = value.trim().trim_start_matches('#');

    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 | 8 => hex.to_string(),
        _ => return Err(format!("Invalid hex color length: {value}")),
    };

    let channel = |index: usize| -> Result<f64, String> {
        let digits = expanded
            .get(index..index + 2)
            .ok_or_else(|| format!("Invalid hex color: {value}"))?;
        u8::from_str_radix(digits, 16)
            .map(|byte| f64::from(byte) / 255.0)
            .map_err(|_| format!("Invalid hex color: {value}"))
    };

    let alpha = if expanded.len() == 8 { channel(6)? } else { 1.0 };

    Ok(Rgba::new(channel(0)?, channel(2)?, channel(4)?, alpha))
}

/// Parses `rgba(r, g, b, a)` with 0-255 color channels and a 0-1 alpha.
///
/// # Errors
///
/// Returns an error when the syntax is wrong or a channel is out of range.
pub fn parse_rgba_color(value: &str) -> Result<Rgba, String> {
    let inner = value
        .trim()
        .get(5..)
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| format!("Invalid rgba color: {value}"))?;

    let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(format!("rgba() needs four components: {value}"));
    }

    let mut rgb = [0.0_f64; 3];
    for (slot, part) in rgb.iter_mut().zip(&parts) {
        let byte: u8 = part.parse().map_err(|_| format!("Invalid color channel '{part}' in {value}"))?;
        *slot = f64::from(byte) / 255.0;
    }

    let alpha: f64 = parts[3].parse().map_err(|_| format!("Invalid alpha '{}' in {value}", parts[3]))?;
    if !(0.0..=1.0).contains(&alpha) {
        return Err(format!("Alpha must be between 0 and 1: {value}"));
    }

    Ok(Rgba::new(rgb[0], rgb[1], rgb[2], alpha))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool { (a - b).abs() < 1e-9 }

    #[test]
    fn test_parse_hex_six_digits() {
        let color = parse_hex_color("#ff8000").unwrap();
        assert!(approx(color.r, 1.0));
        assert!(approx(color.g, 128.0 / 255.0));
        assert!(approx(color.b, 0.0));
        assert!(approx(color.a, 1.0));
    }

    #[test]
    fn test_parse_hex_short_form() {
        let color = parse_hex_color("#fff").unwrap();
        assert_eq!(color, Rgba::new(1.0, 1.0, 1.0, 1.0));
    }

    #[test]
    fn test_parse_hex_with_alpha() {
        let color = parse_hex_color("#00000080").unwrap();
        assert!(approx(color.a, 128.0 / 255.0));
    }

    #[test]
    fn test_parse_hex_rejects_bad_input() {
        assert!(parse_hex_color("#12345").is_err());
        assert!(parse_hex_color("#gggggg").is_err());
    }

    #[test]
    fn test_parse_rgba() {
        let color = parse_rgba_color("rgba(255, 0, 0, 0.5)").unwrap();
        assert_eq!(color, Rgba::new(1.0, 0.0, 0.0, 0.5));
    }

    #[test]
    fn test_parse_rgba_rejects_out_of_range_alpha() {
        assert!(parse_rgba_color("rgba(0, 0, 0, 1.5)").is_err());
        assert!(parse_rgba_color("rgba(0, 0, 0)").is_err());
        assert!(parse_rgba_color("rgba(300, 0, 0, 1)").is_err());
    }

    #[test]
    fn test_parse_color_dispatches_by_notation() {
        assert_eq!(parse_color("clear").unwrap(), Rgba::TRANSPARENT);
        assert_eq!(parse_color("#000").unwrap(), Rgba::new(0.0, 0.0, 0.0, 1.0));
        assert!(parse_color("RGBA(0, 0, 0, 0.25)").is_ok());
        assert!(parse_color("blue").is_err());
    }

    #[test]
    fn test_transparent_is_default() {
        assert!(Rgba::default().is_transparent());
    }
}
