//! `box-shadow` parsing.

use serde::{Deserialize, Serialize};

use crate::color::{Rgba, parse_color};
use crate::values::{parse_px, split_top_level};

/// One resolved drop shadow.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BoxShadow {
    pub offset_x: f32,
    pub offset_y: f32,
    pub blur: f32,
    pub spread: f32,
    pub color: Rgba,
    pub inset: bool,
}

impl Default for BoxShadow {
    fn default() -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            blur: 0.0,
            spread: 0.0,
            color: Rgba::BLACK,
            inset: false,
        }
    }
}

/// Parses the first shadow of a computed `box-shadow` value. Later shadows
/// in the list are ignored.
///
/// Engines report the color either leading (`rgba(0, 0, 0, 0.25) 0px 4px 8px`)
/// or trailing (`0px 4px 8px rgba(0, 0, 0, 0.25)`); both orders are accepted.
pub fn parse_box_shadow(value: &str) -> Option<BoxShadow> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        return None;
    }
    let first = split_top_level(value, ',').into_iter().next()?;

    let mut lengths: Vec<f32> = Vec::new();
    let mut color = None;
    let mut inset = false;
    for token in split_top_level(first, ' ') {
        if token.eq_ignore_ascii_case("inset") {
            inset = true;
        } else if let Some(px) = parse_px(token) {
            lengths.push(px);
        } else if color.is_none() {
            color = parse_color(token);
        }
    }
    if lengths.len() < 2 {
        return None;
    }

    Some(BoxShadow {
        offset_x: lengths[0],
        offset_y: lengths[1],
        blur: lengths.get(2).copied().unwrap_or(0.0),
        spread: lengths.get(3).copied().unwrap_or(0.0),
        color: color.unwrap_or(Rgba::BLACK),
        inset,
    })
}
