//! Computed-style to IR-style mapping.
//!
//! Two builders, one concern each: [`surface_style`] carries everything that
//! paints a box, [`apply_text_style`] adds typography on top for nodes that
//! carry text. Keeping them separate means container nodes never ship
//! font fields and positional text runs never ship borders.

use decal_css::{Rgba, parse_box_shadow, resolve_side_aggregate};
use decal_engine::ComputedStyle;
use decal_ir::{
    CornerRadii, Display, Edges, FlexHints, IrStyle, LayoutAlign, LayoutDirection, LayoutJustify,
    Overflow, Position, TextAlign, TextDecoration,
};

/// Box-painting properties of one element, typed for the wire.
pub fn surface_style(style: &ComputedStyle) -> IrStyle {
    let display = Display::from_css(style.get("display").unwrap_or_default());
    let mut out = IrStyle {
        background_color: style.color("background-color"),
        background_image: non_none(style.get("background-image")),
        border_widths: side_widths(style),
        border_color: border_color(style),
        border_style: non_none(style.get("border-top-style").or_else(|| style.get("border-style"))),
        corner_radii: corner_radii(style),
        padding: Edges {
            top: style.px("padding-top").unwrap_or(0.0),
            right: style.px("padding-right").unwrap_or(0.0),
            bottom: style.px("padding-bottom").unwrap_or(0.0),
            left: style.px("padding-left").unwrap_or(0.0),
        },
        shadow: style.get("box-shadow").and_then(parse_box_shadow),
        opacity: style.px("opacity").filter(|value| *value < 1.0),
        overflow: Overflow::from_css(style.get("overflow").unwrap_or_default()),
        display,
        position: Position::from_css(style.get("position").unwrap_or_default()),
        ..IrStyle::default()
    };
    if display.is_flex() {
        out.flex = Some(flex_hints(style));
    }
    out
}

/// Adds typography onto an already-built style record. Values matching the
/// rendering defaults stay off the wire.
pub fn apply_text_style(target: &mut IrStyle, style: &ComputedStyle) {
    target.color = style.color("color").filter(|color| *color != Rgba::BLACK);
    target.font_family = style.get("font-family").map(str::to_owned);
    target.font_size = style.px("font-size");
    target.font_weight = style
        .get("font-weight")
        .filter(|weight| !matches!(*weight, "400" | "normal"))
        .map(str::to_owned);
    target.font_style = style
        .get("font-style")
        .filter(|value| *value != "normal")
        .map(str::to_owned);
    target.line_height = style.px("line-height");
    target.letter_spacing = style.px("letter-spacing").filter(|value| *value != 0.0);
    target.text_align = style
        .get("text-align")
        .map(TextAlign::from_css)
        .filter(|align| *align != TextAlign::Left);
    target.text_decoration = style
        .get("text-decoration-line")
        .or_else(|| style.get("text-decoration"))
        .and_then(TextDecoration::from_css);
}

fn non_none(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty() && *value != "none")
        .map(str::to_owned)
}

fn side_widths(style: &ComputedStyle) -> Edges {
    Edges {
        top: style.px("border-top-width").unwrap_or(0.0),
        right: style.px("border-right-width").unwrap_or(0.0),
        bottom: style.px("border-bottom-width").unwrap_or(0.0),
        left: style.px("border-left-width").unwrap_or(0.0),
    }
}

/// Engines may report `border-color` as a four-value aggregate; the first
/// non-transparent side wins in that case.
fn border_color(style: &ComputedStyle) -> Option<Rgba> {
    resolve_side_aggregate(
        style.get("border-color").unwrap_or_default(),
        [
            style.get("border-top-color").unwrap_or_default(),
            style.get("border-right-color").unwrap_or_default(),
            style.get("border-bottom-color").unwrap_or_default(),
            style.get("border-left-color").unwrap_or_default(),
        ],
    )
    .filter(|color| !color.is_transparent())
}

fn corner_radii(style: &ComputedStyle) -> CornerRadii {
    let shorthand = style.px("border-radius");
    CornerRadii {
        tl: style
            .px("border-top-left-radius")
            .or(shorthand)
            .unwrap_or(0.0),
        tr: style
            .px("border-top-right-radius")
            .or(shorthand)
            .unwrap_or(0.0),
        br: style
            .px("border-bottom-right-radius")
            .or(shorthand)
            .unwrap_or(0.0),
        bl: style
            .px("border-bottom-left-radius")
            .or(shorthand)
            .unwrap_or(0.0),
    }
}

fn flex_hints(style: &ComputedStyle) -> FlexHints {
    FlexHints {
        direction: LayoutDirection::from_css(style.get("flex-direction").unwrap_or_default()),
        align: LayoutAlign::from_css(style.get("align-items").unwrap_or_default()),
        justify: LayoutJustify::from_css(style.get("justify-content").unwrap_or_default()),
        row_gap: style.px("row-gap").unwrap_or(0.0),
        column_gap: style.px("column-gap").unwrap_or(0.0),
    }
}
