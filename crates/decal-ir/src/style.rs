//! Typed style record carried by every IR node.
//!
//! Extraction resolves raw computed CSS into these types once; the
//! reconstruction side never re-parses property strings. Every field is
//! optional or defaulted so an empty record serializes to `{}`.

use decal_css::{BoxShadow, Rgba};
use serde::{Deserialize, Serialize};

/// Per-side pixel values, used for border widths and padding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Edges {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Edges {
    pub fn uniform(value: f32) -> Self {
        Self { top: value, right: value, bottom: value, left: value }
    }

    pub fn is_zero(&self) -> bool {
        self.top == 0.0 && self.right == 0.0 && self.bottom == 0.0 && self.left == 0.0
    }

    /// Uniform value shared by all four sides, if there is one.
    pub fn as_uniform(&self) -> Option<f32> {
        (self.right == self.top && self.bottom == self.top && self.left == self.top)
            .then_some(self.top)
    }

    pub fn max(&self) -> f32 {
        self.top.max(self.right).max(self.bottom).max(self.left)
    }
}

/// Corner radii in CSS order: top-left, top-right, bottom-right, bottom-left.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CornerRadii {
    pub tl: f32,
    pub tr: f32,
    pub br: f32,
    pub bl: f32,
}

impl CornerRadii {
    pub fn uniform(value: f32) -> Self {
        Self { tl: value, tr: value, br: value, bl: value }
    }

    pub fn is_zero(&self) -> bool {
        self.tl == 0.0 && self.tr == 0.0 && self.br == 0.0 && self.bl == 0.0
    }

    pub fn as_uniform(&self) -> Option<f32> {
        (self.tr == self.tl && self.br == self.tl && self.bl == self.tl).then_some(self.tl)
    }

    pub fn max(&self) -> f32 {
        self.tl.max(self.tr).max(self.br).max(self.bl)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Display {
    #[default]
    Block,
    Inline,
    InlineBlock,
    Flex,
    InlineFlex,
    Grid,
    None,
}

impl Display {
    /// Maps a computed `display` value; unrecognized values (table, contents,
    /// list-item) behave as block containers here.
    pub fn from_css(value: &str) -> Self {
        match value.trim() {
            "none" => Self::None,
            "inline" => Self::Inline,
            "inline-block" => Self::InlineBlock,
            "flex" => Self::Flex,
            "inline-flex" => Self::InlineFlex,
            "grid" | "inline-grid" => Self::Grid,
            _ => Self::Block,
        }
    }

    pub fn is_none(self) -> bool {
        self == Self::None
    }

    pub fn is_flex(self) -> bool {
        matches!(self, Self::Flex | Self::InlineFlex)
    }

    pub fn is_inline_level(self) -> bool {
        matches!(self, Self::Inline | Self::InlineBlock | Self::InlineFlex)
    }

    pub fn is_block_level(self) -> bool {
        !self.is_inline_level() && !self.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    #[default]
    Static,
    Relative,
    Absolute,
    Fixed,
    Sticky,
}

impl Position {
    pub fn from_css(value: &str) -> Self {
        match value.trim() {
            "relative" => Self::Relative,
            "absolute" => Self::Absolute,
            "fixed" => Self::Fixed,
            "sticky" => Self::Sticky,
            _ => Self::Static,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Overflow {
    #[default]
    Visible,
    Hidden,
    Clip,
    Scroll,
    Auto,
}

impl Overflow {
    pub fn from_css(value: &str) -> Self {
        // Shorthand may carry two axes; the first token decides.
        match value.split_whitespace().next().unwrap_or("") {
            "hidden" => Self::Hidden,
            "clip" => Self::Clip,
            "scroll" => Self::Scroll,
            "auto" => Self::Auto,
            _ => Self::Visible,
        }
    }

    pub fn is_visible(&self) -> bool {
        *self == Self::Visible
    }

    /// Scroll and auto keep content reachable, so only hidden and clip
    /// translate to a clipping frame.
    pub fn clips(self) -> bool {
        matches!(self, Self::Hidden | Self::Clip)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl TextAlign {
    pub fn from_css(value: &str) -> Self {
        match value.trim() {
            "center" => Self::Center,
            "right" | "end" => Self::Right,
            "justify" => Self::Justify,
            _ => Self::Left,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TextDecoration {
    Underline,
    LineThrough,
    Overline,
}

impl TextDecoration {
    /// Picks the decoration line out of a computed `text-decoration` value,
    /// which may also carry style and color tokens.
    pub fn from_css(value: &str) -> Option<Self> {
        for token in value.split_whitespace() {
            match token {
                "underline" => return Some(Self::Underline),
                "line-through" => return Some(Self::LineThrough),
                "overline" => return Some(Self::Overline),
                "none" => return None,
                _ => {}
            }
        }
        None
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutDirection {
    #[default]
    Row,
    Column,
}

impl LayoutDirection {
    pub fn from_css(value: &str) -> Self {
        match value.trim() {
            "column" | "column-reverse" => Self::Column,
            _ => Self::Row,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutAlign {
    #[default]
    Stretch,
    Start,
    Center,
    End,
    Baseline,
}

impl LayoutAlign {
    pub fn from_css(value: &str) -> Self {
        match value.trim() {
            "center" => Self::Center,
            "flex-start" | "start" | "self-start" => Self::Start,
            "flex-end" | "end" | "self-end" => Self::End,
            "baseline" => Self::Baseline,
            _ => Self::Stretch,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutJustify {
    #[default]
    Start,
    Center,
    End,
    SpaceBetween,
    SpaceAround,
    SpaceEvenly,
}

impl LayoutJustify {
    pub fn from_css(value: &str) -> Self {
        match value.trim() {
            "center" => Self::Center,
            "flex-end" | "end" => Self::End,
            "space-between" => Self::SpaceBetween,
            "space-around" => Self::SpaceAround,
            "space-evenly" => Self::SpaceEvenly,
            _ => Self::Start,
        }
    }
}

/// Flex container facts the reconstruction side uses for centering decisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlexHints {
    pub direction: LayoutDirection,
    pub align: LayoutAlign,
    pub justify: LayoutJustify,
    #[serde(skip_serializing_if = "is_zero")]
    pub row_gap: f32,
    #[serde(skip_serializing_if = "is_zero")]
    pub column_gap: f32,
}

impl FlexHints {
    /// Whether children sit centered on the cross-of-text axis: align on a
    /// row container, justify on a column container.
    pub fn centers_vertically(&self) -> bool {
        match self.direction {
            LayoutDirection::Row => self.align == LayoutAlign::Center,
            LayoutDirection::Column => self.justify == LayoutJustify::Center,
        }
    }
}

fn is_zero(value: &f32) -> bool {
    *value == 0.0
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Resolved visual style for one node. Extraction fills only what the
/// element actually carries; absent fields stay off the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IrStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgba>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Rgba>,
    /// Raw `background-image` value; gradients are parsed on the far side.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    /// Computed weight as reported, either numeric ("600") or a keyword.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub letter_spacing: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_align: Option<TextAlign>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_decoration: Option<TextDecoration>,
    #[serde(skip_serializing_if = "Edges::is_zero")]
    pub border_widths: Edges,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<Rgba>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_style: Option<String>,
    #[serde(skip_serializing_if = "CornerRadii::is_zero")]
    pub corner_radii: CornerRadii,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shadow: Option<BoxShadow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
    #[serde(skip_serializing_if = "Overflow::is_visible")]
    pub overflow: Overflow,
    #[serde(skip_serializing_if = "is_default_display")]
    pub display: Display,
    #[serde(skip_serializing_if = "is_default_position")]
    pub position: Position,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flex: Option<FlexHints>,
    #[serde(skip_serializing_if = "Edges::is_zero")]
    pub padding: Edges,
    /// Set when the text came from a form control's placeholder rather than
    /// its value.
    #[serde(skip_serializing_if = "is_false")]
    pub placeholder: bool,
}

fn is_default_display(value: &Display) -> bool {
    *value == Display::Block
}

fn is_default_position(value: &Position) -> bool {
    *value == Position::Static
}

impl IrStyle {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// A stroke is worth drawing only with positive width, a color, and a
    /// line style that paints.
    pub fn has_visible_border(&self) -> bool {
        self.border_widths.max() > 0.0
            && self.border_color.is_some()
            && !matches!(self.border_style.as_deref(), Some("none") | Some("hidden"))
    }

    pub fn is_bold(&self) -> bool {
        weight_number(self.font_weight.as_deref()) >= 700
    }
}

/// Numeric value of a computed font weight; keywords map onto the scale.
pub fn weight_number(weight: Option<&str>) -> u16 {
    match weight.map(str::trim) {
        Some("bold") | Some("bolder") => 700,
        Some("normal") | None => 400,
        Some("lighter") => 300,
        Some(value) => value.parse::<f32>().map(|n| n as u16).unwrap_or(400),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_style_serializes_to_empty_object() {
        let style = IrStyle::default();
        assert_eq!(serde_json::to_string(&style).unwrap(), "{}");
    }

    #[test]
    fn populated_fields_use_camel_case() {
        let style = IrStyle {
            background_color: Some(Rgba::from_u8(255, 0, 0)),
            font_size: Some(16.0),
            ..IrStyle::default()
        };
        let json = serde_json::to_value(&style).unwrap();
        assert_eq!(json["backgroundColor"], "rgb(255, 0, 0)");
        assert_eq!(json["fontSize"], 16.0);
    }

    #[test]
    fn display_mapping_covers_flex_variants() {
        assert_eq!(Display::from_css("inline-flex"), Display::InlineFlex);
        assert!(Display::from_css("inline-flex").is_flex());
        assert!(Display::from_css("inline-flex").is_inline_level());
        assert_eq!(Display::from_css("table"), Display::Block);
        assert!(Display::from_css("none").is_none());
    }

    #[test]
    fn overflow_clipping_excludes_scrollable_values() {
        assert!(Overflow::from_css("hidden").clips());
        assert!(Overflow::from_css("clip").clips());
        assert!(!Overflow::from_css("scroll").clips());
        assert!(!Overflow::from_css("auto").clips());
        assert_eq!(Overflow::from_css("hidden auto"), Overflow::Hidden);
    }

    #[test]
    fn decoration_parses_out_of_longhand_noise() {
        assert_eq!(
            TextDecoration::from_css("underline solid rgb(0, 0, 0)"),
            Some(TextDecoration::Underline)
        );
        assert_eq!(
            TextDecoration::from_css("rgb(10, 20, 30) line-through"),
            Some(TextDecoration::LineThrough)
        );
        assert_eq!(TextDecoration::from_css("none solid currentcolor"), None);
    }

    #[test]
    fn flex_centering_depends_on_direction() {
        let row = FlexHints {
            direction: LayoutDirection::Row,
            align: LayoutAlign::Center,
            ..FlexHints::default()
        };
        assert!(row.centers_vertically());

        let column = FlexHints {
            direction: LayoutDirection::Column,
            align: LayoutAlign::Center,
            ..FlexHints::default()
        };
        assert!(!column.centers_vertically());

        let column_justified = FlexHints {
            direction: LayoutDirection::Column,
            justify: LayoutJustify::Center,
            ..FlexHints::default()
        };
        assert!(column_justified.centers_vertically());
    }

    #[test]
    fn uniform_edges_collapse() {
        assert_eq!(Edges::uniform(2.0).as_uniform(), Some(2.0));
        let mixed = Edges { top: 1.0, right: 2.0, bottom: 1.0, left: 1.0 };
        assert_eq!(mixed.as_uniform(), None);
        assert_eq!(mixed.max(), 2.0);
    }

    #[test]
    fn weight_numbers_accept_keywords_and_numerics() {
        assert_eq!(weight_number(Some("bold")), 700);
        assert_eq!(weight_number(Some("350")), 350);
        assert_eq!(weight_number(Some("garbage")), 400);
        assert_eq!(weight_number(None), 400);
    }

    #[test]
    fn border_visibility_requires_all_three_parts() {
        let mut style = IrStyle {
            border_widths: Edges::uniform(1.0),
            border_color: Some(Rgba::BLACK),
            border_style: Some("solid".to_owned()),
            ..IrStyle::default()
        };
        assert!(style.has_visible_border());

        style.border_style = Some("none".to_owned());
        assert!(!style.has_visible_border());

        style.border_style = Some("solid".to_owned());
        style.border_color = None;
        assert!(!style.has_visible_border());
    }
}
