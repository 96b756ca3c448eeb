//! The serialized node tree.

use decal_css::Rgba;
use serde::{Deserialize, Serialize};

use crate::style::IrStyle;

/// Kind assigned to synthetic nodes holding an element's own text once it
/// also has element children.
pub const TEXT_KIND: &str = "#text";
/// Kinds assigned to synthesized pseudo-element nodes.
pub const BEFORE_KIND: &str = "::before";
pub const AFTER_KIND: &str = "::after";

/// Axis-aligned box, positioned relative to the parent node's origin.
/// Extraction rounds every component to whole pixels before the tree is
/// serialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IrRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl IrRect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn rounded(self) -> Self {
        Self {
            x: self.x.round(),
            y: self.y.round(),
            w: self.w.round(),
            h: self.h.round(),
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    /// Smallest rect covering both, in the same coordinate space.
    pub fn union(&self, other: &IrRect) -> IrRect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        IrRect {
            x,
            y,
            w: self.right().max(other.right()) - x,
            h: self.bottom().max(other.bottom()) - y,
        }
    }
}

/// One run of a merged mixed-content text node. Segments concatenate, in
/// order, to the owning node's `text`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextSegment {
    pub text: String,
    #[serde(skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgba>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn default_true() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

/// One extracted element (or synthetic text/pseudo node) with its resolved
/// geometry, style, content, and children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IrNode {
    /// Lowercase tag name, or one of the synthetic kinds.
    pub kind: String,
    pub rect: IrRect,
    #[serde(skip_serializing_if = "IrStyle::is_empty")]
    pub style: IrStyle,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub text_segments: Vec<TextSegment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub svg_markup: Option<String>,
    /// False for elements hidden via `visibility`; such nodes still occupy
    /// layout space and keep their subtree.
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub visible: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<IrNode>,
}

impl Default for IrNode {
    fn default() -> Self {
        Self {
            kind: String::new(),
            rect: IrRect::default(),
            style: IrStyle::default(),
            text: String::new(),
            text_segments: Vec::new(),
            image_url: None,
            svg_markup: None,
            visible: true,
            children: Vec::new(),
        }
    }
}

impl IrNode {
    pub fn new(kind: impl Into<String>, rect: IrRect) -> Self {
        Self {
            kind: kind.into(),
            rect,
            ..Self::default()
        }
    }

    /// A node that renders as text: it carries content and nothing below it.
    pub fn is_text_leaf(&self) -> bool {
        !self.text.is_empty() && self.children.is_empty()
    }

    pub fn is_svg(&self) -> bool {
        self.kind == "svg"
    }

    pub fn is_img(&self) -> bool {
        self.kind == "img"
    }

    /// Total node count of this subtree, including the node itself.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(IrNode::count).sum::<usize>()
    }

    /// Depth-first walk over the subtree, self first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a IrNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}
