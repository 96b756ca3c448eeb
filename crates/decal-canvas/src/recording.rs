//! In-memory canvas backend with deterministic text measurement and a
//! serializable scene dump.
//!
//! Tests and the CLI run the builder against this backend instead of a live
//! canvas bridge. Measurement uses a fixed per-character advance so layout
//! decisions are reproducible, and the recorded tree serializes to JSON for
//! golden-style assertions.

use decal_css::{BoxShadow, Rgba};
use decal_ir::{CornerRadii, IrRect, TextDecoration};
use decal_text::{
    CJK_FALLBACK_FAMILY, DEFAULT_FAMILY, FontCatalog, FontId, HorizontalAnchor, StaticCatalog,
    WidthMode,
};
use serde::Serialize;

use crate::canvas::{Canvas, CanvasId, Paint, SegmentSpan, Stroke, TextStyleSpec};

/// Fixed advance per character, as a fraction of font size.
const ADVANCE_FACTOR: f32 = 0.6;
/// Default line box height as a fraction of font size.
const LINE_HEIGHT_FACTOR: f32 = 1.2;
const FALLBACK_SIZE: f32 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneKind {
    Frame,
    Rectangle,
    Text,
    Vector,
}

/// Everything recorded about one canvas object.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub name: String,
    pub kind: SceneKind,
    pub rect: IrRect,
    pub fill: Option<Paint>,
    pub stroke: Option<Stroke>,
    pub corner_radii: CornerRadii,
    pub shadow: Option<BoxShadow>,
    pub opacity: f32,
    pub clips_content: bool,
    pub visible: bool,
    pub text: Option<RecordedText>,
    pub svg: Option<String>,
    pub children: Vec<CanvasId>,
    pub parent: Option<CanvasId>,
}

#[derive(Debug, Clone)]
pub struct RecordedText {
    pub content: String,
    /// Unset until the builder applies a style.
    pub style: Option<TextStyleSpec>,
    pub width: WidthMode,
    pub spans: Vec<SegmentSpan>,
}

/// The catalog [`RecordingCanvas::new`] starts from: the universal family in
/// its common styles plus the CJK fallback.
pub fn default_catalog() -> StaticCatalog {
    let mut catalog = StaticCatalog::new();
    for style in ["Regular", "Medium", "SemiBold", "Bold", "Italic", "Bold Italic"] {
        catalog.add(DEFAULT_FAMILY, style);
    }
    catalog.add(CJK_FALLBACK_FAMILY, "Regular");
    catalog.add(CJK_FALLBACK_FAMILY, "Bold");
    catalog
}

pub struct RecordingCanvas {
    nodes: Vec<Recorded>,
    viewport: (f32, f32),
    catalog: Box<dyn FontCatalog>,
}

impl RecordingCanvas {
    pub fn new(viewport_w: f32, viewport_h: f32) -> Self {
        Self::with_catalog(viewport_w, viewport_h, default_catalog())
    }

    /// Backend with an explicit catalog: a trimmed one for exercising
    /// font-failure paths, or a system catalog for real lookups.
    pub fn with_catalog(
        viewport_w: f32,
        viewport_h: f32,
        catalog: impl FontCatalog + 'static,
    ) -> Self {
        Self { nodes: Vec::new(), viewport: (viewport_w, viewport_h), catalog: Box::new(catalog) }
    }

    pub fn node(&self, id: CanvasId) -> &Recorded {
        &self.nodes[id.0]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Serializable dump of the subtree under `root`.
    pub fn scene(&self, root: CanvasId) -> SceneNode {
        let recorded = &self.nodes[root.0];
        SceneNode {
            name: recorded.name.clone(),
            kind: recorded.kind,
            rect: recorded.rect,
            fill: recorded.fill.clone(),
            stroke: recorded.stroke,
            corner_radii: recorded.corner_radii,
            shadow: recorded.shadow.clone(),
            opacity: recorded.opacity,
            clips_content: recorded.clips_content,
            visible: recorded.visible,
            text: recorded.text.as_ref().map(scene_text),
            svg: recorded.svg.clone(),
            children: recorded.children.iter().map(|&child| self.scene(child)).collect(),
        }
    }

    pub fn scene_json(&self, root: CanvasId) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.scene(root))
    }

    fn push(&mut self, name: &str, kind: SceneKind, rect: IrRect) -> CanvasId {
        let id = CanvasId(self.nodes.len());
        self.nodes.push(Recorded {
            name: name.to_owned(),
            kind,
            rect,
            fill: None,
            stroke: None,
            corner_radii: CornerRadii::default(),
            shadow: None,
            opacity: 1.0,
            clips_content: false,
            visible: true,
            text: None,
            svg: None,
            children: Vec::new(),
            parent: None,
        });
        id
    }

    fn measure(text: &RecordedText) -> (f32, f32) {
        let (size, letter_spacing, line_height) = match &text.style {
            Some(style) => (style.size, style.letter_spacing, style.line_height),
            None => (FALLBACK_SIZE, 0.0, None),
        };
        let chars = text.content.chars().count() as f32;
        let w = chars * (size * ADVANCE_FACTOR + letter_spacing);
        let h = line_height.unwrap_or(size * LINE_HEIGHT_FACTOR);
        (w, h)
    }
}

impl FontCatalog for RecordingCanvas {
    fn try_load(&mut self, id: &FontId) -> bool {
        self.catalog.try_load(id)
    }
}

impl Canvas for RecordingCanvas {
    fn viewport_center(&self) -> (f32, f32) {
        (self.viewport.0 / 2.0, self.viewport.1 / 2.0)
    }

    fn create_frame(&mut self, name: &str, rect: IrRect) -> CanvasId {
        self.push(name, SceneKind::Frame, rect)
    }

    fn create_rectangle(&mut self, name: &str, rect: IrRect) -> CanvasId {
        self.push(name, SceneKind::Rectangle, rect)
    }

    fn create_text(&mut self, name: &str, rect: IrRect, content: &str) -> CanvasId {
        let id = self.push(name, SceneKind::Text, rect);
        self.nodes[id.0].text = Some(RecordedText {
            content: content.to_owned(),
            style: None,
            width: WidthMode::Auto,
            spans: Vec::new(),
        });
        id
    }

    fn create_vector(&mut self, name: &str, rect: IrRect, markup: &str) -> CanvasId {
        let id = self.push(name, SceneKind::Vector, rect);
        self.nodes[id.0].svg = Some(markup.to_owned());
        id
    }

    fn set_fill(&mut self, node: CanvasId, paint: Paint) {
        self.nodes[node.0].fill = Some(paint);
    }

    fn set_stroke(&mut self, node: CanvasId, stroke: Stroke) {
        self.nodes[node.0].stroke = Some(stroke);
    }

    fn set_corner_radii(&mut self, node: CanvasId, radii: CornerRadii) {
        self.nodes[node.0].corner_radii = radii;
    }

    fn set_shadow(&mut self, node: CanvasId, shadow: BoxShadow) {
        self.nodes[node.0].shadow = Some(shadow);
    }

    fn set_opacity(&mut self, node: CanvasId, opacity: f32) {
        self.nodes[node.0].opacity = opacity;
    }

    fn set_clips_content(&mut self, node: CanvasId, clips: bool) {
        self.nodes[node.0].clips_content = clips;
    }

    fn set_visible(&mut self, node: CanvasId, visible: bool) {
        self.nodes[node.0].visible = visible;
    }

    fn set_position(&mut self, node: CanvasId, x: f32, y: f32) {
        let rect = &mut self.nodes[node.0].rect;
        rect.x = x;
        rect.y = y;
    }

    fn set_text_style(&mut self, node: CanvasId, style: &TextStyleSpec) {
        if let Some(text) = self.nodes[node.0].text.as_mut() {
            text.style = Some(style.clone());
        }
    }

    fn set_text_width(&mut self, node: CanvasId, width: WidthMode) {
        if let Some(text) = self.nodes[node.0].text.as_mut() {
            text.width = width;
        }
    }

    fn set_segment_style(&mut self, node: CanvasId, span: &SegmentSpan) {
        if let Some(text) = self.nodes[node.0].text.as_mut() {
            text.spans.push(span.clone());
        }
    }

    fn text_bounds(&self, node: CanvasId) -> (f32, f32) {
        let recorded = &self.nodes[node.0];
        match &recorded.text {
            Some(text) => Self::measure(text),
            None => (recorded.rect.w, recorded.rect.h),
        }
    }

    fn append_child(&mut self, parent: CanvasId, child: CanvasId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }
}

/// One node of the serializable scene dump. Default-valued properties are
/// omitted so dumps stay diffable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneNode {
    pub name: String,
    pub kind: SceneKind,
    pub rect: IrRect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<Paint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke: Option<Stroke>,
    #[serde(skip_serializing_if = "CornerRadii::is_zero")]
    pub corner_radii: CornerRadii,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shadow: Option<BoxShadow>,
    #[serde(skip_serializing_if = "is_opaque")]
    pub opacity: f32,
    #[serde(skip_serializing_if = "is_false")]
    pub clips_content: bool,
    #[serde(skip_serializing_if = "is_true")]
    pub visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<SceneText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub svg: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SceneNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneText {
    pub content: String,
    /// "Family Style" display form.
    pub font: String,
    pub size: f32,
    pub color: Rgba,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f32>,
    #[serde(skip_serializing_if = "is_zero")]
    pub letter_spacing: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decoration: Option<TextDecoration>,
    pub align: String,
    #[serde(skip_serializing_if = "is_false")]
    pub vertical_center: bool,
    pub auto_width: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub spans: Vec<SceneSpan>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneSpan {
    pub start: usize,
    pub end: usize,
    pub font: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgba>,
}

fn scene_text(text: &RecordedText) -> SceneText {
    let style = text.style.as_ref();
    SceneText {
        content: text.content.clone(),
        font: style.map(|s| s.font.to_string()).unwrap_or_default(),
        size: style.map_or(FALLBACK_SIZE, |s| s.size),
        color: style.map_or(Rgba::BLACK, |s| s.color),
        line_height: style.and_then(|s| s.line_height),
        letter_spacing: style.map_or(0.0, |s| s.letter_spacing),
        decoration: style.and_then(|s| s.decoration),
        align: anchor_name(style.map_or(HorizontalAnchor::Left, |s| s.align)).to_owned(),
        vertical_center: style.is_some_and(|s| s.vertical_center),
        auto_width: text.width == WidthMode::Auto,
        spans: text
            .spans
            .iter()
            .map(|span| SceneSpan {
                start: span.start,
                end: span.end,
                font: span.font.to_string(),
                color: span.color,
            })
            .collect(),
    }
}

fn anchor_name(anchor: HorizontalAnchor) -> &'static str {
    match anchor {
        HorizontalAnchor::Left => "left",
        HorizontalAnchor::Center => "center",
        HorizontalAnchor::Right => "right",
    }
}

fn is_opaque(opacity: &f32) -> bool {
    *opacity >= 1.0
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_true(value: &bool) -> bool {
    *value
}

fn is_zero(value: &f32) -> bool {
    *value == 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use decal_text::resolve_font;

    fn text_style(size: f32) -> TextStyleSpec {
        TextStyleSpec {
            font: FontId::new(DEFAULT_FAMILY, "Regular"),
            size,
            color: Rgba::BLACK,
            line_height: None,
            letter_spacing: 0.0,
            decoration: None,
            align: HorizontalAnchor::Left,
            vertical_center: false,
        }
    }

    #[test]
    fn measurement_is_char_count_times_advance() {
        let mut canvas = RecordingCanvas::new(800.0, 600.0);
        let id = canvas.create_text("t", IrRect::new(0.0, 0.0, 100.0, 20.0), "Hello");
        canvas.set_text_style(id, &text_style(10.0));

        let (w, h) = canvas.text_bounds(id);
        assert_eq!(w, 5.0 * 6.0);
        assert_eq!(h, 12.0);
    }

    #[test]
    fn letter_spacing_widens_every_advance() {
        let mut canvas = RecordingCanvas::new(800.0, 600.0);
        let id = canvas.create_text("t", IrRect::new(0.0, 0.0, 100.0, 20.0), "abcd");
        let mut style = text_style(10.0);
        style.letter_spacing = 2.0;
        canvas.set_text_style(id, &style);

        assert_eq!(canvas.text_bounds(id).0, 4.0 * 8.0);
    }

    #[test]
    fn default_catalog_satisfies_the_universal_ladder() {
        let mut canvas = RecordingCanvas::new(800.0, 600.0);
        let font = resolve_font(&mut canvas, "Some Unknown Family", 400, false)
            .unwrap_or_else(|error| panic!("ladder should end at the default family: {error}"));
        assert_eq!(font, FontId::new(DEFAULT_FAMILY, "Regular"));
    }

    #[test]
    fn empty_catalog_fails_every_load() {
        let mut canvas = RecordingCanvas::with_catalog(800.0, 600.0, StaticCatalog::new());
        assert!(resolve_font(&mut canvas, "Arial", 400, false).is_err());
    }

    #[test]
    fn scene_dump_omits_default_properties() {
        let mut canvas = RecordingCanvas::new(800.0, 600.0);
        let id = canvas.create_frame("div", IrRect::new(0.0, 0.0, 50.0, 50.0));

        let json = canvas.scene_json(id).unwrap();
        assert!(json.contains("\"name\": \"div\""));
        assert!(json.contains("\"kind\": \"frame\""));
        assert!(!json.contains("fill"));
        assert!(!json.contains("opacity"));
        assert!(!json.contains("visible"));
        assert!(!json.contains("children"));
    }

    #[test]
    fn scene_dump_nests_children_in_append_order() {
        let mut canvas = RecordingCanvas::new(800.0, 600.0);
        let root = canvas.create_frame("body", IrRect::new(0.0, 0.0, 200.0, 100.0));
        let first = canvas.create_frame("div", IrRect::new(0.0, 0.0, 50.0, 50.0));
        let second = canvas.create_text("p", IrRect::new(0.0, 50.0, 50.0, 20.0), "hi");
        canvas.append_child(root, first);
        canvas.append_child(root, second);

        let scene = canvas.scene(root);
        assert_eq!(scene.children.len(), 2);
        assert_eq!(scene.children[0].kind, SceneKind::Frame);
        assert_eq!(scene.children[1].kind, SceneKind::Text);
        assert_eq!(scene.children[1].text.as_ref().map(|t| t.content.as_str()), Some("hi"));
        assert!(canvas.node(first).parent == Some(root));
    }
}
