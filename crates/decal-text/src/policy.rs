//! Text layout policy applied at reconstruction time.
//!
//! The rendering engine and the canvas disagree on line breaking, so
//! geometry cannot be copied over mechanically. These heuristics decide when
//! to trust the measured box and when to let the canvas size the text
//! itself. The two numeric factors are preserved from observed behavior;
//! they are tunable, not exact.

use decal_ir::{IrNode, TextAlign};

/// A text box shorter than this many font-sizes is treated as single-line.
/// The comparison is strict: exactly the threshold is multi-line.
pub const SINGLE_LINE_HEIGHT_FACTOR: f32 = 3.5;

/// A multi-line box keeps its measured width only when the container is
/// comfortably wider than the rough minimum estimate, so a fixed width can
/// never force a wrap the source rendering did not have.
pub const FIXED_WIDTH_PROMOTION_FACTOR: f32 = 1.5;

const DEFAULT_FONT_SIZE: f32 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WidthMode {
    /// The canvas sizes the text; no wrapping can be introduced.
    Auto,
    /// The measured container width is applied, letting the canvas wrap.
    Fixed(f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalAnchor {
    Left,
    Center,
    Right,
}

/// Layout decisions for one text leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct TextPlan {
    pub width: WidthMode,
    pub anchor: HorizontalAnchor,
    pub single_line: bool,
    /// Center the text block vertically within its measured box.
    pub vertically_centered: bool,
    /// Wrap the text in a frame so border/background styling has a host.
    pub boxed: bool,
    pub bold: bool,
    pub italic: bool,
}

pub fn plan(node: &IrNode) -> TextPlan {
    let style = &node.style;
    let font_size = style.font_size.unwrap_or(DEFAULT_FONT_SIZE);
    let single_line = node.rect.h < SINGLE_LINE_HEIGHT_FACTOR * font_size;

    let width = if single_line || !style.display.is_block_level() {
        WidthMode::Auto
    } else {
        let minimum_estimate = font_size * node.text.chars().count() as f32;
        if node.rect.w > FIXED_WIDTH_PROMOTION_FACTOR * minimum_estimate {
            WidthMode::Fixed(node.rect.w)
        } else {
            WidthMode::Auto
        }
    };

    let anchor = match style.text_align {
        Some(TextAlign::Center) => HorizontalAnchor::Center,
        Some(TextAlign::Right) => HorizontalAnchor::Right,
        _ => HorizontalAnchor::Left,
    };

    let vertically_centered = style
        .flex
        .as_ref()
        .is_some_and(|flex| flex.centers_vertically())
        || is_button_like(&node.kind);

    let boxed = style.background_color.is_some()
        || style.background_image.is_some()
        || style.has_visible_border();

    TextPlan {
        width,
        anchor,
        single_line,
        vertically_centered,
        boxed,
        bold: style.is_bold(),
        italic: is_italic(style.font_style.as_deref()),
    }
}

pub fn is_italic(font_style: Option<&str>) -> bool {
    matches!(font_style, Some(s) if s.starts_with("italic") || s.starts_with("oblique"))
}

fn is_button_like(kind: &str) -> bool {
    matches!(kind, "button" | "a")
}

#[cfg(test)]
mod tests {
    use super::*;
    use decal_ir::{Display, FlexHints, IrRect, LayoutAlign, LayoutDirection};

    fn text_node(w: f32, h: f32, font_size: f32, text: &str) -> IrNode {
        let mut node = IrNode::new("p", IrRect::new(0.0, 0.0, w, h));
        node.text = text.to_owned();
        node.style.font_size = Some(font_size);
        node
    }

    #[test]
    fn single_line_boundary_is_strict() {
        // 3.5 × 16 = 56: exactly at the threshold is multi-line.
        let at_threshold = text_node(400.0, 56.0, 16.0, "hi");
        assert!(!plan(&at_threshold).single_line);

        let below_threshold = text_node(400.0, 55.0, 16.0, "hi");
        assert!(plan(&below_threshold).single_line);
    }

    #[test]
    fn single_line_boxes_are_always_auto_width() {
        let node = text_node(400.0, 20.0, 16.0, "short");
        assert_eq!(plan(&node).width, WidthMode::Auto);
    }

    #[test]
    fn fixed_width_promotion_needs_a_comfortably_wide_container() {
        // Estimate for 10 chars at 16px is 160; the cutoff is 240.
        let text = "abcdefghij";
        let mut narrow = text_node(240.0, 80.0, 16.0, text);
        narrow.style.display = Display::Block;
        assert_eq!(plan(&narrow).width, WidthMode::Auto);

        let mut wide = text_node(241.0, 80.0, 16.0, text);
        wide.style.display = Display::Block;
        assert_eq!(plan(&wide).width, WidthMode::Fixed(241.0));
    }

    #[test]
    fn inline_multi_line_text_stays_auto_width() {
        let mut node = text_node(500.0, 80.0, 16.0, "ab");
        node.style.display = Display::Inline;
        assert_eq!(plan(&node).width, WidthMode::Auto);
    }

    #[test]
    fn alignment_maps_to_anchor() {
        let mut node = text_node(100.0, 20.0, 16.0, "x");
        node.style.text_align = Some(TextAlign::Center);
        assert_eq!(plan(&node).anchor, HorizontalAnchor::Center);
        node.style.text_align = Some(TextAlign::Right);
        assert_eq!(plan(&node).anchor, HorizontalAnchor::Right);
        node.style.text_align = None;
        assert_eq!(plan(&node).anchor, HorizontalAnchor::Left);
    }

    #[test]
    fn flex_centering_and_buttons_center_vertically() {
        let mut flexed = text_node(100.0, 20.0, 16.0, "x");
        flexed.style.flex = Some(FlexHints {
            direction: LayoutDirection::Row,
            align: LayoutAlign::Center,
            ..FlexHints::default()
        });
        assert!(plan(&flexed).vertically_centered);

        let mut button = text_node(100.0, 20.0, 16.0, "Go");
        button.kind = "button".to_owned();
        assert!(plan(&button).vertically_centered);

        let plain = text_node(100.0, 20.0, 16.0, "x");
        assert!(!plan(&plain).vertically_centered);
    }

    #[test]
    fn backgrounds_and_borders_make_text_boxed() {
        let mut node = text_node(100.0, 20.0, 16.0, "x");
        assert!(!plan(&node).boxed);
        node.style.background_color = Some(decal_css::Rgba::new(1.0, 0.0, 0.0, 1.0));
        assert!(plan(&node).boxed);
    }
}
