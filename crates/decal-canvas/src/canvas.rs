//! The collaborator interface a canvas backend exposes to the builder, plus
//! the paint and text vocabulary that crosses it.

use decal_css::{BoxShadow, LinearGradient, Rgba, parse_linear_gradient};
use decal_ir::{CornerRadii, Edges, IrRect, TextDecoration};
use decal_text::{FontCatalog, FontId, HorizontalAnchor, WidthMode};
use serde::Serialize;

/// Handle to one canvas object, minted by the backend that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanvasId(pub(crate) usize);

/// A fill: solid color or linear gradient.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Paint {
    Solid { color: Rgba },
    Linear { gradient: LinearGradient },
}

/// A solid paint, unless the color is effectively transparent.
pub fn to_solid_paint(color: Rgba) -> Option<Paint> {
    (!color.is_transparent()).then_some(Paint::Solid { color })
}

/// A gradient paint when the descriptor parses as a linear gradient.
pub fn to_gradient_paint(descriptor: &str) -> Option<Paint> {
    parse_linear_gradient(descriptor).map(|gradient| Paint::Linear { gradient })
}

/// Inside-aligned border stroke. Weights may differ per side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    pub weights: Edges,
    pub color: Rgba,
}

/// Typography applied to a whole text node.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyleSpec {
    pub font: FontId,
    pub size: f32,
    pub color: Rgba,
    pub line_height: Option<f32>,
    pub letter_spacing: f32,
    pub decoration: Option<TextDecoration>,
    pub align: HorizontalAnchor,
    /// Center the text block vertically inside its box.
    pub vertical_center: bool,
}

/// Per-range override inside a text node. Indices are character positions
/// into the node's content, end exclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSpan {
    pub start: usize,
    pub end: usize,
    pub font: FontId,
    pub color: Option<Rgba>,
}

/// What the builder needs from a canvas backend.
///
/// Creation returns a handle; everything after that is a setter against the
/// handle. Child geometry is parent-relative, matching the IR. Backends also
/// act as the font catalog ([`FontCatalog`] supertrait), so font resolution
/// retries loads against the same host that will render the text.
///
/// Setters are only invoked for non-default values: a node that never
/// receives `set_fill` has no fill, a node that never receives
/// `set_clips_content` does not clip.
pub trait Canvas: FontCatalog {
    /// Center of the current viewport, in canvas coordinates.
    fn viewport_center(&self) -> (f32, f32);

    fn create_frame(&mut self, name: &str, rect: IrRect) -> CanvasId;
    fn create_rectangle(&mut self, name: &str, rect: IrRect) -> CanvasId;
    fn create_text(&mut self, name: &str, rect: IrRect, content: &str) -> CanvasId;
    fn create_vector(&mut self, name: &str, rect: IrRect, markup: &str) -> CanvasId;

    fn set_fill(&mut self, node: CanvasId, paint: Paint);
    fn set_stroke(&mut self, node: CanvasId, stroke: Stroke);
    fn set_corner_radii(&mut self, node: CanvasId, radii: CornerRadii);
    fn set_shadow(&mut self, node: CanvasId, shadow: BoxShadow);
    fn set_opacity(&mut self, node: CanvasId, opacity: f32);
    fn set_clips_content(&mut self, node: CanvasId, clips: bool);
    fn set_visible(&mut self, node: CanvasId, visible: bool);
    fn set_position(&mut self, node: CanvasId, x: f32, y: f32);

    fn set_text_style(&mut self, node: CanvasId, style: &TextStyleSpec);
    fn set_text_width(&mut self, node: CanvasId, width: WidthMode);
    fn set_segment_style(&mut self, node: CanvasId, span: &SegmentSpan);

    /// Measured extent of a text node under its current style.
    fn text_bounds(&self, node: CanvasId) -> (f32, f32);

    fn append_child(&mut self, parent: CanvasId, child: CanvasId);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn near_transparent_colors_yield_no_paint() {
        assert_eq!(to_solid_paint(Rgba::new(1.0, 0.0, 0.0, 0.009)), None);
        assert_eq!(to_solid_paint(Rgba::new(0.0, 0.0, 0.0, 0.0)), None);

        let barely = to_solid_paint(Rgba::new(1.0, 0.0, 0.0, 0.011));
        assert!(matches!(barely, Some(Paint::Solid { .. })));
    }

    #[test]
    fn gradient_paint_requires_a_parseable_descriptor() {
        let paint = to_gradient_paint("linear-gradient(90deg, #000, #fff)");
        match paint {
            Some(Paint::Linear { gradient }) => {
                assert_eq!(gradient.stops.len(), 2);
                assert_eq!(gradient.stops[0].position, 0.0);
                assert_eq!(gradient.stops[1].position, 1.0);
            }
            other => panic!("expected a linear paint, got {other:?}"),
        }

        assert_eq!(to_gradient_paint("url(texture.png)"), None);
        assert_eq!(to_gradient_paint("radial-gradient(red, blue)"), None);
    }
}
