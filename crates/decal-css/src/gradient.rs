//! Linear-gradient parsing.
//!
//! A gradient reduces to an affine transform that lays the unit square's
//! horizontal axis along the gradient axis, plus ordered color stops. The
//! angle convention is the CSS one: `0deg` points up (bottom→top fill),
//! `90deg` points right, and the default when no angle is written is `180deg`
//! (top→bottom).

use serde::{Deserialize, Serialize};

use crate::color::{Rgba, parse_color};
use crate::values::split_top_level;

/// 2×3 row-major affine transform mapping the unit square onto the gradient
/// axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientTransform(pub [[f32; 3]; 2]);

impl GradientTransform {
    /// Build the transform for an angle in CSS degrees.
    ///
    /// With `s = sin θ` and `c = cos θ`, the 0%-stop sits at
    /// `(0.5 − 0.5s, 0.5 + 0.5c)` and the 100%-stop at
    /// `(0.5 + 0.5s, 0.5 − 0.5c)`.
    pub fn from_angle_deg(degrees: f32) -> Self {
        let theta = degrees.to_radians();
        let (s, c) = theta.sin_cos();
        GradientTransform([
            [s, c, 0.5 - 0.5 * s],
            [-c, s, 0.5 + 0.5 * c],
        ])
    }

    /// Unit-square coordinates of the 0%-stop.
    pub fn start(&self) -> (f32, f32) {
        (self.0[0][2], self.0[1][2])
    }

    /// Unit-square coordinates of the 100%-stop.
    pub fn end(&self) -> (f32, f32) {
        (
            self.0[0][0] + self.0[0][2],
            self.0[1][0] + self.0[1][2],
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    /// Normalized offset along the axis, `0.0..=1.0`.
    pub position: f32,
    pub color: Rgba,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearGradient {
    pub transform: GradientTransform,
    pub stops: Vec<GradientStop>,
}

/// Parse a `linear-gradient(...)` value.
///
/// Returns `None` when fewer than two stops resolve, which callers must treat
/// as "fall back to a solid fill".
pub fn parse_linear_gradient(input: &str) -> Option<LinearGradient> {
    let v = input.trim();
    if !v.to_ascii_lowercase().starts_with("linear-gradient(") || !v.ends_with(')') {
        return None;
    }
    let inner = &v[v.find('(')? + 1..v.rfind(')')?];
    let mut parts = split_top_level(inner, ',');
    if parts.is_empty() {
        return None;
    }

    let mut angle = 180.0f32;
    if let Some(parsed) = parse_angle(parts[0]) {
        angle = parsed;
        parts.remove(0);
    }

    // First pass: colors plus any explicit percentage positions.
    let mut raw: Vec<(Option<f32>, Rgba)> = Vec::new();
    for part in &parts {
        if let Some(stop) = parse_stop(part) {
            raw.push(stop);
        }
    }
    if raw.len() < 2 {
        return None;
    }

    // Second pass: stops without an explicit position spread evenly.
    let count = raw.len();
    let stops = raw
        .into_iter()
        .enumerate()
        .map(|(index, (position, color))| GradientStop {
            position: position.unwrap_or(index as f32 / (count - 1) as f32),
            color,
        })
        .collect();

    Some(LinearGradient {
        transform: GradientTransform::from_angle_deg(angle),
        stops,
    })
}

fn parse_angle(part: &str) -> Option<f32> {
    let t = part.trim();
    if let Some(num) = t.strip_suffix("deg") {
        return num.trim().parse().ok();
    }
    let lower = t.to_ascii_lowercase();
    let dir = lower.strip_prefix("to ")?.trim();
    match dir {
        "top" => Some(0.0),
        "right" => Some(90.0),
        "bottom" => Some(180.0),
        "left" => Some(270.0),
        "top right" | "right top" => Some(45.0),
        "bottom right" | "right bottom" => Some(135.0),
        "bottom left" | "left bottom" => Some(225.0),
        "top left" | "left top" => Some(315.0),
        _ => None,
    }
}

fn parse_stop(part: &str) -> Option<(Option<f32>, Rgba)> {
    let tokens = split_top_level(part, ' ');
    match tokens.as_slice() {
        [] => None,
        [color] => Some((None, parse_color(color)?)),
        [head @ .., last] if last.ends_with('%') => {
            let pct: f32 = last.trim_end_matches('%').trim().parse().ok()?;
            let color = parse_color(&head.join(" "))?;
            Some((Some((pct / 100.0).clamp(0.0, 1.0)), color))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: (f32, f32), expected: (f32, f32)) {
        assert!(
            (actual.0 - expected.0).abs() < 1e-5 && (actual.1 - expected.1).abs() < 1e-5,
            "got {actual:?}, expected {expected:?}"
        );
    }

    #[test]
    fn axis_at_canonical_angles() {
        // 0deg: bottom → top.
        let t = GradientTransform::from_angle_deg(0.0);
        assert_close(t.start(), (0.5, 1.0));
        assert_close(t.end(), (0.5, 0.0));
        // 90deg: left → right.
        let t = GradientTransform::from_angle_deg(90.0);
        assert_close(t.start(), (0.0, 0.5));
        assert_close(t.end(), (1.0, 0.5));
        // 180deg: top → bottom.
        let t = GradientTransform::from_angle_deg(180.0);
        assert_close(t.start(), (0.5, 0.0));
        assert_close(t.end(), (0.5, 1.0));
        // 270deg: right → left.
        let t = GradientTransform::from_angle_deg(270.0);
        assert_close(t.start(), (1.0, 0.5));
        assert_close(t.end(), (0.0, 0.5));
    }

    #[test]
    fn stop_positions_inferred_evenly() {
        let g = parse_linear_gradient("linear-gradient(0deg, red, blue)").unwrap();
        assert_eq!(g.stops.len(), 2);
        assert_eq!(g.stops[0].position, 0.0);
        assert_eq!(g.stops[1].position, 1.0);

        let g = parse_linear_gradient("linear-gradient(red, lime, blue)").unwrap();
        assert_eq!(g.stops[1].position, 0.5);
    }

    #[test]
    fn explicit_percentages_respected() {
        let g =
            parse_linear_gradient("linear-gradient(90deg, rgb(0, 0, 0) 10%, rgb(255, 255, 255) 90%)")
                .unwrap();
        assert_eq!(g.stops[0].position, 0.1);
        assert_eq!(g.stops[1].position, 0.9);
    }

    #[test]
    fn default_angle_is_top_to_bottom() {
        let g = parse_linear_gradient("linear-gradient(red, blue)").unwrap();
        assert_close(g.transform.start(), (0.5, 0.0));
        assert_close(g.transform.end(), (0.5, 1.0));
    }

    #[test]
    fn direction_keywords() {
        let g = parse_linear_gradient("linear-gradient(to right, red, blue)").unwrap();
        assert_close(g.transform.start(), (0.0, 0.5));
        assert_close(g.transform.end(), (1.0, 0.5));
        let g = parse_linear_gradient("linear-gradient(to top left, red, blue)").unwrap();
        let (sx, sy) = g.transform.start();
        let (ex, ey) = g.transform.end();
        assert!(sx > ex && sy < ey);
    }

    #[test]
    fn nested_commas_inside_color_functions() {
        let g = parse_linear_gradient(
            "linear-gradient(90deg, rgba(255, 0, 0, 0.5), rgba(0, 0, 255, 0.5))",
        )
        .unwrap();
        assert_eq!(g.stops.len(), 2);
    }

    #[test]
    fn too_few_stops_is_no_gradient() {
        assert_eq!(parse_linear_gradient("linear-gradient(0deg, red)"), None);
        assert_eq!(parse_linear_gradient("linear-gradient(0deg, bogus, alsobogus)"), None);
        assert_eq!(parse_linear_gradient("radial-gradient(red, blue)"), None);
    }
}
