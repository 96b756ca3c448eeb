//! Per-node rebuild: the state machine that turns IR nodes back into canvas
//! objects.
//!
//! Dispatch order per node: vector leaf, image leaf, text leaf, container.
//! Failures below the root are caught at the child loop, so one bad subtree
//! costs itself and nothing else.

use decal_css::Rgba;
use decal_ir::{IrNode, IrRect, IrStyle, TextSegment, weight_number};
use decal_text::{
    DEFAULT_FAMILY, FontId, HorizontalAnchor, TextPlan, WidthMode, plan, resolve_font,
};
use tracing::{debug, warn};

use crate::Result;
use crate::canvas::{
    Canvas, CanvasId, Paint, SegmentSpan, Stroke, TextStyleSpec, to_gradient_paint, to_solid_paint,
};

/// Light neutral fill for image and unparseable-vector placeholders.
const PLACEHOLDER_FILL: Rgba = Rgba { r: 0.85, g: 0.85, b: 0.85, a: 1.0 };
/// Conventional gray for text sourced from a form control's placeholder.
const PLACEHOLDER_TEXT_COLOR: Rgba = Rgba { r: 0.63, g: 0.63, b: 0.63, a: 1.0 };
const FALLBACK_FONT_SIZE: f32 = 16.0;
/// Longest layer name taken from text content.
const NAME_LIMIT: usize = 24;

/// Counts of emitted primitives, reported back over the wire. Each IR node
/// increments exactly one counter, so `frames + texts` equals the number of
/// nodes built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Containers, vectors, and placeholder shapes.
    pub frames: usize,
    /// Text nodes. A boxed text's host frame counts toward the text.
    pub texts: usize,
}

/// Outcome of a completed rebuild.
#[derive(Debug, Clone, Copy)]
pub struct BuildReport {
    pub root: CanvasId,
    pub stats: BuildStats,
}

/// Knobs for a rebuild.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Fill for image and failed-vector placeholder shapes.
    pub placeholder_fill: Rgba,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { placeholder_fill: PLACEHOLDER_FILL }
    }
}

/// Rebuilds `root` on `canvas`, centered in the viewport.
pub fn reconstruct(canvas: &mut impl Canvas, root: &IrNode) -> Result<BuildReport> {
    TreeBuilder::new(canvas).build(root)
}

/// Walks an IR tree top-down and drives a [`Canvas`] to recreate it.
pub struct TreeBuilder<'a, C: Canvas> {
    canvas: &'a mut C,
    options: BuildOptions,
    stats: BuildStats,
}

impl<'a, C: Canvas> TreeBuilder<'a, C> {
    pub fn new(canvas: &'a mut C) -> Self {
        Self::with_options(canvas, BuildOptions::default())
    }

    pub fn with_options(canvas: &'a mut C, options: BuildOptions) -> Self {
        Self { canvas, options, stats: BuildStats::default() }
    }

    /// Builds the whole tree. The root lands centered in the viewport; an
    /// error at the root aborts the import, errors below it only cost the
    /// failing subtree.
    pub fn build(mut self, root: &IrNode) -> Result<BuildReport> {
        let (center_x, center_y) = self.canvas.viewport_center();
        let rect = IrRect::new(
            (center_x - root.rect.w / 2.0).round(),
            (center_y - root.rect.h / 2.0).round(),
            root.rect.w,
            root.rect.h,
        );
        debug!(w = root.rect.w, h = root.rect.h, nodes = root.count(), "rebuilding IR tree");
        let id = self.build_node(root, rect)?;
        Ok(BuildReport { root: id, stats: self.stats })
    }

    fn build_node(&mut self, node: &IrNode, rect: IrRect) -> Result<CanvasId> {
        if node.is_svg() {
            return Ok(self.vector(node, rect));
        }
        if node.is_img() {
            return Ok(self.image_placeholder(node, rect));
        }
        if node.is_text_leaf() {
            return self.text(node, rect);
        }
        Ok(self.container(node, rect))
    }

    fn container(&mut self, node: &IrNode, rect: IrRect) -> CanvasId {
        let rect = expand_to_children(rect, &node.children);
        let id = self.canvas.create_frame(&layer_name(node), rect);
        self.style_surface(id, &node.style);
        if node.style.overflow.clips() {
            self.canvas.set_clips_content(id, true);
        }
        if !node.visible {
            self.canvas.set_visible(id, false);
        }
        self.stats.frames += 1;
        for child in &node.children {
            match self.build_node(child, child.rect) {
                Ok(child_id) => self.canvas.append_child(id, child_id),
                Err(error) => {
                    warn!(%error, kind = %child.kind, "skipping subtree that failed to build");
                }
            }
        }
        id
    }

    fn text(&mut self, node: &IrNode, rect: IrRect) -> Result<CanvasId> {
        let style = &node.style;
        let plan = plan(node);

        let family = style.font_family.as_deref().unwrap_or(DEFAULT_FAMILY);
        let weight = weight_number(style.font_weight.as_deref());
        let font = resolve_font(self.canvas, family, weight, plan.italic)?;

        let (host, text_rect) = if plan.boxed {
            let frame = self.canvas.create_frame(&layer_name(node), rect);
            self.style_surface(frame, style);
            (Some(frame), padding_box(rect, style))
        } else {
            (None, rect)
        };

        let text_id = self.canvas.create_text(&layer_name(node), text_rect, &node.text);
        let spec = TextStyleSpec {
            font: font.clone(),
            size: style.font_size.unwrap_or(FALLBACK_FONT_SIZE),
            color: text_color(style),
            line_height: style.line_height,
            letter_spacing: style.letter_spacing.unwrap_or(0.0),
            decoration: style.text_decoration,
            align: plan.anchor,
            vertical_center: plan.vertically_centered,
        };
        self.canvas.set_text_style(text_id, &spec);
        self.canvas.set_text_width(text_id, plan.width);
        if node.text_segments.len() >= 2 {
            for span in self.segment_spans(&node.text_segments, &font, family, weight, plan.italic)
            {
                self.canvas.set_segment_style(text_id, &span);
            }
        }
        self.reposition(text_id, text_rect, &plan);

        let id = match host {
            Some(frame) => {
                self.canvas.append_child(frame, text_id);
                frame
            }
            None => text_id,
        };
        if !node.visible {
            self.canvas.set_visible(id, false);
        }
        self.stats.texts += 1;
        Ok(id)
    }

    /// Vector leaves pass through a validity parse first: markup the canvas
    /// cannot rebuild becomes a placeholder instead of an error.
    fn vector(&mut self, node: &IrNode, rect: IrRect) -> CanvasId {
        let markup = node.svg_markup.as_deref().unwrap_or("");
        let id = match usvg::Tree::from_str(markup, &usvg::Options::default()) {
            Ok(_) => self.canvas.create_vector(&layer_name(node), rect, markup),
            Err(error) => {
                warn!(%error, "vector markup did not parse, substituting a placeholder");
                let id = self.canvas.create_rectangle(&layer_name(node), rect);
                self.canvas.set_fill(id, Paint::Solid { color: self.options.placeholder_fill });
                id
            }
        };
        if !node.visible {
            self.canvas.set_visible(id, false);
        }
        self.stats.frames += 1;
        id
    }

    /// Raster fetch is out of scope; images become placeholder shapes with
    /// their geometry and rounding preserved.
    fn image_placeholder(&mut self, node: &IrNode, rect: IrRect) -> CanvasId {
        let id = self.canvas.create_rectangle(&layer_name(node), rect);
        self.style_surface(id, &node.style);
        self.canvas.set_fill(id, Paint::Solid { color: self.options.placeholder_fill });
        if !node.visible {
            self.canvas.set_visible(id, false);
        }
        self.stats.frames += 1;
        id
    }

    /// Box paint shared by frames and placeholder shapes: fill, stroke,
    /// radii, shadow, opacity.
    fn style_surface(&mut self, id: CanvasId, style: &IrStyle) {
        if let Some(paint) = background_paint(style) {
            self.canvas.set_fill(id, paint);
        }
        if style.has_visible_border() {
            if let Some(color) = style.border_color {
                self.canvas.set_stroke(id, Stroke { weights: style.border_widths, color });
            }
        }
        if !style.corner_radii.is_zero() {
            self.canvas.set_corner_radii(id, style.corner_radii);
        }
        if let Some(shadow) = &style.shadow {
            self.canvas.set_shadow(id, shadow.clone());
        }
        if let Some(opacity) = style.opacity {
            self.canvas.set_opacity(id, opacity);
        }
    }

    /// Bold or recolored runs become ranged overrides. A segment whose bold
    /// face fails to load keeps the base font; losing weight beats losing
    /// the node.
    fn segment_spans(
        &mut self,
        segments: &[TextSegment],
        base: &FontId,
        family: &str,
        weight: u16,
        italic: bool,
    ) -> Vec<SegmentSpan> {
        let mut spans = Vec::new();
        let mut cursor = 0;
        for segment in segments {
            let end = cursor + segment.text.chars().count();
            if end > cursor && (segment.bold || segment.color.is_some()) {
                let font = if segment.bold && weight < 700 {
                    match resolve_font(self.canvas, family, 700, italic) {
                        Ok(bold) => bold,
                        Err(error) => {
                            warn!(%error, "no bold face for segment, keeping the base font");
                            base.clone()
                        }
                    }
                } else {
                    base.clone()
                };
                spans.push(SegmentSpan { start: cursor, end, font, color: segment.color });
            }
            cursor = end;
        }
        spans
    }

    /// Hug-width text loses the box it was aligned inside, so the alignment
    /// offset is recreated from measured bounds. Vertical centering moves
    /// the line block into the middle of the original box.
    fn reposition(&mut self, text_id: CanvasId, rect: IrRect, plan: &TextPlan) {
        let (measured_w, measured_h) = self.canvas.text_bounds(text_id);
        let mut x = rect.x;
        let mut y = rect.y;
        if plan.width == WidthMode::Auto {
            match plan.anchor {
                HorizontalAnchor::Center => x += ((rect.w - measured_w) / 2.0).max(0.0).round(),
                HorizontalAnchor::Right => x += (rect.w - measured_w).max(0.0).round(),
                HorizontalAnchor::Left => {}
            }
        }
        if plan.vertically_centered && measured_h < rect.h {
            y += ((rect.h - measured_h) / 2.0).round();
        }
        if x != rect.x || y != rect.y {
            self.canvas.set_position(text_id, x, y);
        }
    }
}

/// Gradient when the descriptor parses, else solid, else no paint.
fn background_paint(style: &IrStyle) -> Option<Paint> {
    if let Some(descriptor) = &style.background_image {
        let paint = to_gradient_paint(descriptor);
        if paint.is_some() {
            return paint;
        }
    }
    style.background_color.and_then(to_solid_paint)
}

fn text_color(style: &IrStyle) -> Rgba {
    match style.color {
        Some(color) => color,
        None if style.placeholder => PLACEHOLDER_TEXT_COLOR,
        None => Rgba::BLACK,
    }
}

/// Grows a frame so child geometry cannot spill past its right or bottom
/// edge. The origin stays put, so children keep their offsets.
fn expand_to_children(rect: IrRect, children: &[IrNode]) -> IrRect {
    let mut out = rect;
    for child in children {
        out.w = out.w.max(child.rect.right());
        out.h = out.h.max(child.rect.bottom());
    }
    out
}

/// Content area of a boxed text host, relative to the host frame.
fn padding_box(rect: IrRect, style: &IrStyle) -> IrRect {
    let borders = &style.border_widths;
    let padding = &style.padding;
    IrRect::new(
        borders.left + padding.left,
        borders.top + padding.top,
        (rect.w - borders.left - borders.right - padding.left - padding.right).max(1.0),
        (rect.h - borders.top - borders.bottom - padding.top - padding.bottom).max(1.0),
    )
}

/// Layers are named the way a designer would name them: element nodes keep
/// their tag, text layers take their truncated content.
fn layer_name(node: &IrNode) -> String {
    if node.is_text_leaf() {
        let trimmed = node.text.trim();
        if !trimmed.is_empty() {
            let mut name: String = trimmed.chars().take(NAME_LIMIT).collect();
            if trimmed.chars().count() > NAME_LIMIT {
                name.push('…');
            }
            return name;
        }
    }
    node.kind.clone()
}
