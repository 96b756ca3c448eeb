//! Self-contained markup for vector leaves.
//!
//! An `<svg>` lifted out of a page loses everything it borrowed from the
//! surrounding document: sprite symbols referenced by id, the inherited text
//! color behind `currentColor`, and the layout that gave relative dimensions
//! meaning. [`serialize`] rewrites the markup so none of those references
//! survive: `<use>` elements are replaced with the referenced content wrapped
//! in a scaled group, `currentColor` becomes the element's resolved color,
//! and relative root dimensions become the rendered pixel size.
//!
//! The rewriting is plain string surgery on the serialized markup. The
//! output is consumed by an SVG parser downstream, which also decides what
//! to do when the markup still fails to parse.

use std::ops::Range;

use decal_engine::{DomId, RenderedPage, Result};

/// Inlining passes before giving up, bounding reference cycles.
const MAX_INLINE_PASSES: usize = 64;

/// Produces markup for a vector element that renders identically outside the
/// page it came from.
pub fn serialize(page: &dyn RenderedPage, node: DomId) -> Result<String> {
    let mut markup = page.outer_markup(node)?;
    markup = inline_references(page, markup)?;

    if let Some(color) = page.computed_style(node)?.color("color") {
        let resolved = color.to_string();
        markup = markup
            .replace("currentColor", &resolved)
            .replace("currentcolor", &resolved);
    }

    let rect = page.bounding_rect(node)?;
    Ok(fix_root_dimensions(markup, rect.w, rect.h))
}

/// Replaces every `<use>` with the content it references. Unresolvable
/// references render nothing in a detached context, so they are dropped.
fn inline_references(page: &dyn RenderedPage, mut markup: String) -> Result<String> {
    for _ in 0..MAX_INLINE_PASSES {
        let Some(span) = find_element_span(&markup, "use") else {
            break;
        };
        let replacement = resolve_reference(page, &markup[span.clone()])?.unwrap_or_default();
        markup.replace_range(span, &replacement);
    }
    Ok(markup)
}

fn resolve_reference(page: &dyn RenderedPage, use_markup: &str) -> Result<Option<String>> {
    let tag = opening_tag(use_markup);
    // `href=` also matches the legacy `xlink:href=` spelling.
    let Some(href) = attr_value(tag, "href") else {
        return Ok(None);
    };
    let Some(id) = href.strip_prefix('#') else {
        return Ok(None);
    };
    let Some(referenced) = page.markup_by_id(id)? else {
        return Ok(None);
    };

    // A symbol contributes its children; any other element is cloned whole.
    let is_symbol = referenced.trim_start().starts_with("<symbol");
    let body = if is_symbol {
        element_content(&referenced).unwrap_or("").to_owned()
    } else {
        referenced.clone()
    };

    let transform = if is_symbol {
        scale_transform(opening_tag(&referenced), tag)
    } else {
        None
    };
    Ok(Some(match transform {
        Some(transform) => format!("<g transform=\"{transform}\">{body}</g>"),
        None => format!("<g>{body}</g>"),
    }))
}

/// Uniform scale from the symbol's view box to the reference's requested
/// size. `None` when either is missing or the scale is identity.
fn scale_transform(symbol_tag: &str, use_tag: &str) -> Option<String> {
    let (view_w, view_h) = attr_value(symbol_tag, "viewBox").and_then(parse_view_box)?;
    if view_w <= 0.0 || view_h <= 0.0 {
        return None;
    }
    let want_w = attr_value(use_tag, "width").and_then(parse_number)?;
    let want_h = attr_value(use_tag, "height").and_then(parse_number)?;
    let sx = want_w / view_w;
    let sy = want_h / view_h;
    if (sx - 1.0).abs() < f32::EPSILON && (sy - 1.0).abs() < f32::EPSILON {
        return None;
    }
    Some(format!("scale({sx},{sy})"))
}

/// Rewrites relative root `width`/`height` to rendered pixel values, and
/// fills them in when absent.
fn fix_root_dimensions(markup: String, w: f32, h: f32) -> String {
    let Some(tag_end) = markup.find('>') else {
        return markup;
    };
    let mut tag = markup[..tag_end].to_owned();
    rewrite_dimension(&mut tag, "width", w);
    rewrite_dimension(&mut tag, "height", h);
    tag.push_str(&markup[tag_end..]);
    tag
}

fn rewrite_dimension(tag: &mut String, name: &str, pixels: f32) {
    let formatted = format!("{pixels}");
    match attr_value_span(tag, name) {
        Some(span) if is_relative(&tag[span.clone()]) => {
            tag.replace_range(span, &formatted);
        }
        Some(_) => {}
        None => {
            let attr = format!(" {name}=\"{formatted}\"");
            if tag.ends_with('/') {
                tag.insert_str(tag.len() - 1, &attr);
            } else {
                tag.push_str(&attr);
            }
        }
    }
}

/// A length that does not resolve to pixels on its own (`%`, `em`, `auto`).
fn is_relative(value: &str) -> bool {
    let value = value.trim();
    let numeric = value.strip_suffix("px").unwrap_or(value);
    numeric.parse::<f32>().is_err()
}

/// Byte range of the first `<name ...>...</name>` (or self-closed) element.
fn find_element_span(markup: &str, name: &str) -> Option<Range<usize>> {
    let open = format!("<{name}");
    let mut from = 0;
    let start = loop {
        let at = from + markup[from..].find(&open)?;
        let following = markup[at + open.len()..].chars().next();
        match following {
            Some(c) if c.is_whitespace() || c == '>' || c == '/' => break at,
            _ => from = at + open.len(),
        }
    };
    let tag_end = start + markup[start..].find('>')?;
    if markup[..tag_end].ends_with('/') {
        return Some(start..tag_end + 1);
    }
    let close = format!("</{name}>");
    let end = tag_end + markup[tag_end..].find(&close)? + close.len();
    Some(start..end)
}

fn opening_tag(markup: &str) -> &str {
    match markup.find('>') {
        Some(end) => &markup[..=end],
        None => markup,
    }
}

/// Content between the opening tag and the final closing tag.
fn element_content(markup: &str) -> Option<&str> {
    let start = markup.find('>')? + 1;
    let end = markup.rfind("</")?;
    (end >= start).then(|| &markup[start..end])
}

/// Value of a quoted attribute inside an opening tag. The name must be
/// preceded by whitespace or `:`, so `width` never matches `stroke-width`.
fn attr_value_span(tag: &str, name: &str) -> Option<Range<usize>> {
    let bytes = tag.as_bytes();
    let mut from = 0;
    while let Some(pos) = tag[from..].find(name) {
        let at = from + pos;
        let boundary = at == 0
            || bytes[at - 1].is_ascii_whitespace()
            || bytes[at - 1] == b':';
        let after = &tag[at + name.len()..];
        if boundary && after.starts_with('=') {
            let rest = &after[1..];
            if let Some(quote @ ('"' | '\'')) = rest.chars().next() {
                let value_start = at + name.len() + 2;
                if let Some(len) = rest[1..].find(quote) {
                    return Some(value_start..value_start + len);
                }
            }
        }
        from = at + name.len();
    }
    None
}

fn attr_value<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    attr_value_span(tag, name).map(|span| &tag[span])
}

fn parse_number(value: &str) -> Option<f32> {
    let value = value.trim();
    value.strip_suffix("px").unwrap_or(value).trim().parse().ok()
}

fn parse_view_box(value: &str) -> Option<(f32, f32)> {
    let parts: Vec<f32> = value
        .split([' ', ','])
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect::<std::result::Result<_, _>>()
        .ok()?;
    (parts.len() == 4).then(|| (parts[2], parts[3]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use decal_engine::StaticPage;

    fn svg_node(page: &StaticPage) -> DomId {
        page.children(page.root()).expect("body children")[0]
    }

    #[test]
    fn symbol_reference_inlines_with_scaled_group() {
        let page = StaticPage::from_html(
            r##"<html><body>
                <svg width="20" height="20"><use href="#star" width="20" height="20"/></svg>
                <svg width="0" height="0"><symbol id="star" viewBox="0 0 10 10">
                    <path d="M0 0h10v10z"/>
                </symbol></svg>
            </body></html>"##,
            (800.0, 600.0),
        )
        .unwrap();

        let markup = serialize(&page, svg_node(&page)).unwrap();
        assert!(markup.contains("scale(2,2)"), "markup: {markup}");
        assert!(markup.contains("M0 0h10v10z"));
        assert!(!markup.contains("<use"));
    }

    #[test]
    fn identity_scale_emits_a_plain_group() {
        let page = StaticPage::from_html(
            r##"<html><body>
                <svg width="10" height="10"><use href="#dot" width="10" height="10"/></svg>
                <svg width="0" height="0"><symbol id="dot" viewBox="0 0 10 10"><circle cx="5" cy="5" r="4"/></symbol></svg>
            </body></html>"##,
            (800.0, 600.0),
        )
        .unwrap();

        let markup = serialize(&page, svg_node(&page)).unwrap();
        assert!(!markup.contains("transform"));
        assert!(markup.contains("<g><circle"));
    }

    #[test]
    fn current_color_resolves_to_the_computed_color() {
        let page = StaticPage::from_html(
            r##"<html><body>
                <svg width="16" height="16" style="color: #ff0000">
                    <path fill="currentColor" d="M0 0h16v16z"/>
                </svg>
            </body></html>"##,
            (800.0, 600.0),
        )
        .unwrap();

        let markup = serialize(&page, svg_node(&page)).unwrap();
        assert!(markup.contains("fill=\"rgb(255, 0, 0)\""), "markup: {markup}");
        assert!(!markup.contains("currentColor"));
    }

    #[test]
    fn relative_dimensions_become_rendered_pixels() {
        let page = StaticPage::from_html(
            r##"<html><body>
                <svg width="100%" height="50%" style="width: 300px; height: 150px"></svg>
            </body></html>"##,
            (800.0, 600.0),
        )
        .unwrap();

        let markup = serialize(&page, svg_node(&page)).unwrap();
        assert!(markup.contains("width=\"300\""), "markup: {markup}");
        assert!(markup.contains("height=\"150\""));
    }

    #[test]
    fn absolute_dimensions_are_preserved() {
        let page = StaticPage::from_html(
            r#"<html><body><svg width="24" height="24"></svg></body></html>"#,
            (800.0, 600.0),
        )
        .unwrap();

        let markup = serialize(&page, svg_node(&page)).unwrap();
        assert!(markup.contains("width=\"24\""));
        assert!(markup.contains("height=\"24\""));
    }

    #[test]
    fn unresolvable_references_are_dropped() {
        let page = StaticPage::from_html(
            r##"<html><body>
                <svg width="10" height="10"><use href="#missing"/></svg>
            </body></html>"##,
            (800.0, 600.0),
        )
        .unwrap();

        let markup = serialize(&page, svg_node(&page)).unwrap();
        assert!(!markup.contains("<use"));
    }
}
