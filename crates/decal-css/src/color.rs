//! Color canonicalization.
//!
//! Every supported syntax collapses to [`Rgba`], and `Rgba` has exactly one
//! string form: legacy `rgb(r, g, b)` / `rgba(r, g, b, a)`. Two inputs that
//! denote the same visual color therefore canonicalize to the same string,
//! which is what the extractor sends over the wire and what the reconstructor
//! compares against.

use std::fmt;
use std::str::FromStr;

use csscolorparser::Color as CssColor;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::values::split_top_level;

/// Alpha below this is treated as fully transparent: no paint is emitted.
pub const ALPHA_TRANSPARENT_THRESHOLD: f32 = 0.01;

/// Canonical 4-channel color, all channels in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba { r: 0.0, g: 0.0, b: 0.0, a: 1.0 };
    pub const WHITE: Rgba = Rgba { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };

    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Construct from 8-bit sRGB channels with full alpha.
    pub fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: f32::from(r) / 255.0,
            g: f32::from(g) / 255.0,
            b: f32::from(b) / 255.0,
            a: 1.0,
        }
    }

    /// Whether this color is below the paint threshold.
    pub fn is_transparent(&self) -> bool {
        self.a < ALPHA_TRANSPARENT_THRESHOLD
    }

    /// The canonical legacy-form string for this color.
    pub fn css_string(&self) -> String {
        let r = (self.r * 255.0).round().clamp(0.0, 255.0) as u8;
        let g = (self.g * 255.0).round().clamp(0.0, 255.0) as u8;
        let b = (self.b * 255.0).round().clamp(0.0, 255.0) as u8;
        if (self.a - 1.0).abs() < f32::EPSILON {
            format!("rgb({}, {}, {})", r, g, b)
        } else {
            format!("rgba({}, {}, {}, {})", r, g, b, format_alpha(self.a))
        }
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.css_string())
    }
}

/// Alpha prints with up to three decimals, trailing zeros trimmed, so the
/// canonical form is stable across parse/format round-trips.
fn format_alpha(a: f32) -> String {
    let mut s = format!("{:.3}", a.clamp(0.0, 1.0));
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    s
}

impl Serialize for Rgba {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.css_string())
    }
}

impl<'de> Deserialize<'de> for Rgba {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RgbaVisitor;

        impl Visitor<'_> for RgbaVisitor {
            type Value = Rgba;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a CSS color string")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Rgba, E> {
                parse_color(value)
                    .ok_or_else(|| E::custom(format!("unrecognized color '{value}'")))
            }
        }

        deserializer.deserialize_str(RgbaVisitor)
    }
}

/// Normalize any color syntax to the canonical legacy form.
///
/// Unparseable input comes back unchanged: the judgment call is deferred to
/// whoever consumes the string next, matching the raster-round-trip contract
/// of the original environment.
pub fn normalize(input: &str) -> String {
    match parse_color(input) {
        Some(color) => color.css_string(),
        None => input.to_string(),
    }
}

/// Parse a CSS color into its canonical channels.
///
/// Recognizes the legacy comma form, the modern space form (with optional
/// `/ alpha`), the device-color-space form `color(srgb r g b / a)`, and
/// 3/6/8-digit hex, with keywords resolved through `csscolorparser`. Anything
/// else is "no color": absent paint, not an error.
pub fn parse_color(input: &str) -> Option<Rgba> {
    let v = input.trim();
    if v.is_empty() {
        return None;
    }
    // Tokens that mean "no explicit color here".
    if v.eq_ignore_ascii_case("none")
        || v.eq_ignore_ascii_case("inherit")
        || v.eq_ignore_ascii_case("initial")
        || v.eq_ignore_ascii_case("currentcolor")
    {
        return None;
    }
    if let Some(hex) = v.strip_prefix('#') {
        // Hex is handled exhaustively here; unsupported digit counts do not
        // fall through to the keyword parser.
        return parse_hex(hex);
    }
    let lower = v.to_ascii_lowercase();
    if lower.starts_with("rgb(") || lower.starts_with("rgba(") {
        return parse_rgb_function(v);
    }
    if lower.starts_with("color(") {
        return parse_color_function(v);
    }
    // Keywords and any remaining syntaxes.
    let c = CssColor::from_str(v).ok()?;
    Some(Rgba::new(c.r as f32, c.g as f32, c.b as f32, c.a as f32))
}

/// Border colors are often queried through the side-aggregate property, which
/// answers with a 4-value string when the sides differ. The effective color
/// is then the first non-transparent individual side, falling back to the
/// aggregate itself.
pub fn resolve_side_aggregate(aggregate: &str, sides: [&str; 4]) -> Option<Rgba> {
    if let Some(color) = parse_color(aggregate) {
        return Some(color);
    }
    for side in sides {
        if let Some(color) = parse_color(side) {
            if !color.is_transparent() {
                return Some(color);
            }
        }
    }
    None
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    let hex = hex.trim();
    let byte = |s: &str| u8::from_str_radix(s, 16).ok();
    let nibble = |s: &str| {
        u8::from_str_radix(s, 16)
            .ok()
            .map(|n| n << 4 | n)
    };
    match hex.len() {
        3 => {
            let r = nibble(&hex[0..1])?;
            let g = nibble(&hex[1..2])?;
            let b = nibble(&hex[2..3])?;
            Some(Rgba::from_u8(r, g, b))
        }
        6 => {
            let r = byte(&hex[0..2])?;
            let g = byte(&hex[2..4])?;
            let b = byte(&hex[4..6])?;
            Some(Rgba::from_u8(r, g, b))
        }
        8 => {
            let r = byte(&hex[0..2])?;
            let g = byte(&hex[2..4])?;
            let b = byte(&hex[4..6])?;
            let a = byte(&hex[6..8])?;
            let mut color = Rgba::from_u8(r, g, b);
            color.a = f32::from(a) / 255.0;
            Some(color)
        }
        _ => None,
    }
}

/// `rgb()`/`rgba()` in either the legacy comma form or the modern space form.
fn parse_rgb_function(input: &str) -> Option<Rgba> {
    let inner = function_body(input)?;
    let (channels, alpha) = match inner.split_once('/') {
        Some((left, right)) => (left.trim(), Some(right.trim())),
        None => (inner, None),
    };
    let tokens: Vec<&str> = if channels.contains(',') {
        split_top_level(channels, ',')
    } else {
        split_top_level(channels, ' ')
    };
    match (tokens.as_slice(), alpha) {
        ([r, g, b], _) => Some(Rgba {
            r: channel_255(r)?,
            g: channel_255(g)?,
            b: channel_255(b)?,
            a: alpha.map_or(Some(1.0), alpha_value)?,
        }),
        // Legacy rgba(): alpha rides as a fourth comma token.
        ([r, g, b, a], None) => Some(Rgba {
            r: channel_255(r)?,
            g: channel_255(g)?,
            b: channel_255(b)?,
            a: alpha_value(a)?,
        }),
        _ => None,
    }
}

/// `color(srgb r g b / a)` with channels already in `0..1`.
fn parse_color_function(input: &str) -> Option<Rgba> {
    let inner = function_body(input)?;
    let (body, alpha) = match inner.split_once('/') {
        Some((left, right)) => (left.trim(), Some(right.trim())),
        None => (inner, None),
    };
    let tokens: Vec<&str> = split_top_level(body, ' ');
    let [space, r, g, b] = tokens.as_slice() else {
        return None;
    };
    if !space.eq_ignore_ascii_case("srgb") {
        return None;
    }
    let unit = |tok: &str| -> Option<f32> {
        let v: f32 = tok.parse().ok()?;
        Some(v.clamp(0.0, 1.0))
    };
    Some(Rgba {
        r: unit(r)?,
        g: unit(g)?,
        b: unit(b)?,
        a: alpha.map_or(Some(1.0), alpha_value)?,
    })
}

fn function_body(input: &str) -> Option<&str> {
    let open = input.find('(')?;
    let close = input.rfind(')')?;
    if close <= open {
        return None;
    }
    Some(input[open + 1..close].trim())
}

/// A color channel given on the 0 to 255 scale, or as a percentage.
fn channel_255(token: &str) -> Option<f32> {
    let t = token.trim();
    if let Some(pct) = t.strip_suffix('%') {
        let v: f32 = pct.trim().parse().ok()?;
        return Some((v / 100.0).clamp(0.0, 1.0));
    }
    let v: f32 = t.parse().ok()?;
    Some((v / 255.0).clamp(0.0, 1.0))
}

fn alpha_value(token: &str) -> Option<f32> {
    let t = token.trim();
    if let Some(pct) = t.strip_suffix('%') {
        let v: f32 = pct.trim().parse().ok()?;
        return Some((v / 100.0).clamp(0.0, 1.0));
    }
    let v: f32 = t.parse().ok()?;
    Some(v.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalization_round_trip() {
        // Syntactically different spellings of the same color agree.
        assert_eq!(normalize("rgb(255 0 0)"), "rgb(255, 0, 0)");
        assert_eq!(normalize("#ff0000"), "rgb(255, 0, 0)");
        assert_eq!(normalize("rgb(255, 0, 0)"), "rgb(255, 0, 0)");
        assert_eq!(normalize("red"), "rgb(255, 0, 0)");
        assert_eq!(normalize("#f00"), "rgb(255, 0, 0)");
        assert_eq!(normalize("color(srgb 1 0 0)"), "rgb(255, 0, 0)");
    }

    #[test]
    fn alpha_forms() {
        assert_eq!(normalize("rgba(0, 0, 0, 0.5)"), "rgba(0, 0, 0, 0.5)");
        assert_eq!(normalize("rgb(0 0 0 / 0.5)"), "rgba(0, 0, 0, 0.5)");
        assert_eq!(normalize("rgb(0 0 0 / 50%)"), "rgba(0, 0, 0, 0.5)");
        assert_eq!(normalize("#00000080"), "rgba(0, 0, 0, 0.502)");
        assert_eq!(normalize("color(srgb 0 0 0 / 0.25)"), "rgba(0, 0, 0, 0.25)");
    }

    #[test]
    fn unparseable_input_returned_unchanged() {
        assert_eq!(normalize("definitely-not-a-color"), "definitely-not-a-color");
        assert_eq!(normalize("var(--brand)"), "var(--brand)");
        assert_eq!(parse_color("#ff00"), None);
        assert_eq!(parse_color("color(display-p3 1 0 0)"), None);
    }

    #[test]
    fn absent_color_tokens() {
        assert_eq!(parse_color(""), None);
        assert_eq!(parse_color("none"), None);
        assert_eq!(parse_color("currentColor"), None);
        assert_eq!(parse_color("inherit"), None);
    }

    #[test]
    fn transparency_threshold() {
        assert!(parse_color("transparent").unwrap().is_transparent());
        assert!(parse_color("rgba(10, 10, 10, 0.009)").unwrap().is_transparent());
        assert!(!parse_color("rgba(10, 10, 10, 0.011)").unwrap().is_transparent());
    }

    #[test]
    fn side_aggregate_resolution() {
        // Unambiguous aggregate wins outright.
        let c = resolve_side_aggregate("rgb(1, 2, 3)", ["", "", "", ""]).unwrap();
        assert_eq!(c.css_string(), "rgb(1, 2, 3)");
        // Ambiguous aggregate: first non-transparent side.
        let c = resolve_side_aggregate(
            "rgb(0, 0, 0) rgb(1, 1, 1) rgb(2, 2, 2) rgb(3, 3, 3)",
            ["rgba(0, 0, 0, 0)", "rgb(9, 9, 9)", "rgb(2, 2, 2)", "rgb(3, 3, 3)"],
        )
        .unwrap();
        assert_eq!(c.css_string(), "rgb(9, 9, 9)");
        assert_eq!(resolve_side_aggregate("junk", ["", "", "", ""]), None);
    }

    #[test]
    fn serde_uses_canonical_string() {
        let color = parse_color("#336699").unwrap();
        let json = serde_json::to_string(&color).unwrap();
        assert_eq!(json, "\"rgb(51, 102, 153)\"");
        let back: Rgba = serde_json::from_str(&json).unwrap();
        assert_eq!(back, color);
    }
}
