//! The rendered-page interface consumed by extraction.
//!
//! Extraction never touches a rendering engine directly. It talks to a
//! [`RenderedPage`]: something that has already parsed, styled, and laid out
//! a document and can answer geometry and computed-style questions about it.
//! Production backends wrap a real engine; [`crate::StaticPage`] implements
//! the same contract with a deterministic in-process layout for tests.

use std::collections::HashMap;

use decal_css::{Rgba, parse_color, parse_px};

use crate::error::Result;

/// Opaque handle to one element node of a page. Handles stay valid for the
/// lifetime of the page, across style mutations and [`RenderedPage::settle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DomId(pub(crate) usize);

/// Axis-aligned box in viewport coordinates, y growing downward.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PageRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl PageRect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }
}

/// The two synthesizable pseudo-elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudoKind {
    Before,
    After,
}

impl PseudoKind {
    pub fn selector(self) -> &'static str {
        match self {
            Self::Before => "::before",
            Self::After => "::after",
        }
    }
}

/// One measured run of character data directly under an element.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub rect: PageRect,
}

/// Snapshot of an element's resolved style, keyed by CSS property name.
///
/// Values are computed-value strings the way engines report them: lengths in
/// `px`, colors in any syntax the page authored. The typed accessors resolve
/// the common cases once so callers do not re-parse.
#[derive(Debug, Clone, Default)]
pub struct ComputedStyle {
    properties: HashMap<String, String>,
}

impl ComputedStyle {
    pub fn from_properties(properties: HashMap<String, String>) -> Self {
        Self { properties }
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.properties.get(property).map(String::as_str)
    }

    /// Property value as pixels, when it is a `px` length or bare number.
    pub fn px(&self, property: &str) -> Option<f32> {
        self.get(property).and_then(parse_px)
    }

    /// Property value as a color, when it parses and is not fully transparent.
    pub fn color(&self, property: &str) -> Option<Rgba> {
        let parsed = self.get(property).and_then(parse_color)?;
        (!parsed.is_transparent()).then_some(parsed)
    }

    pub fn is(&self, property: &str, value: &str) -> bool {
        self.get(property) == Some(value)
    }
}

/// A document that has been parsed, styled, and laid out by some engine.
pub trait RenderedPage {
    /// Viewport size in CSS pixels.
    fn viewport(&self) -> (f32, f32);

    /// The body element: the root of every extraction walk.
    fn root(&self) -> DomId;

    /// The html element, needed for document-background resolution.
    fn document_element(&self) -> DomId;

    /// Lowercase tag name.
    fn tag_name(&self, node: DomId) -> Result<String>;

    fn attribute(&self, node: DomId, name: &str) -> Result<Option<String>>;

    /// Element children in document order. Character data is not included;
    /// use [`Self::text_runs`] for it.
    fn children(&self, node: DomId) -> Result<Vec<DomId>>;

    fn computed_style(&self, node: DomId) -> Result<ComputedStyle>;

    /// Computed style of a `::before`/`::after` pseudo-element, or `None`
    /// when the page defines none for this element.
    fn pseudo_style(&self, node: DomId, pseudo: PseudoKind) -> Result<Option<ComputedStyle>>;

    /// Border-box rect in viewport coordinates, as of the last settle.
    fn bounding_rect(&self, node: DomId) -> Result<PageRect>;

    /// Measured rects for the text runs directly under this element, in
    /// document order.
    fn text_runs(&self, node: DomId) -> Result<Vec<TextRun>>;

    /// Serialized markup of the element and its subtree.
    fn outer_markup(&self, node: DomId) -> Result<String>;

    /// Serialized markup of the element carrying the given `id` attribute,
    /// anywhere in the document.
    fn markup_by_id(&self, id: &str) -> Result<Option<String>>;

    /// Current value of the element's `style` attribute.
    fn inline_style(&self, node: DomId) -> Result<Option<String>>;

    /// Replaces (or with `None`, removes) the element's `style` attribute.
    /// Geometry is stale until the next [`Self::settle`].
    fn set_inline_style(&mut self, node: DomId, style: Option<&str>) -> Result<()>;

    /// Blocks until layout reflects all mutations made so far.
    fn settle(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computed_style_typed_accessors() {
        let mut properties = HashMap::new();
        properties.insert("font-size".to_owned(), "24px".to_owned());
        properties.insert("color".to_owned(), "rgb(255, 0, 0)".to_owned());
        properties.insert("background-color".to_owned(), "rgba(0, 0, 0, 0)".to_owned());
        properties.insert("display".to_owned(), "flex".to_owned());
        let style = ComputedStyle::from_properties(properties);

        assert_eq!(style.px("font-size"), Some(24.0));
        assert_eq!(style.color("color").map(|c| c.css_string()), Some("rgb(255, 0, 0)".into()));
        assert_eq!(style.color("background-color"), None);
        assert!(style.is("display", "flex"));
        assert_eq!(style.px("missing"), None);
    }

    #[test]
    fn pseudo_selectors_spell_correctly() {
        assert_eq!(PseudoKind::Before.selector(), "::before");
        assert_eq!(PseudoKind::After.selector(), "::after");
    }
}
