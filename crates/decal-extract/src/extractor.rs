//! The page walk.
//!
//! One pass, top down: each element becomes at most one IR node, children
//! recurse with their parent's border box as the coordinate origin. Text is
//! the delicate part. An element whose children are all inline markup merges
//! everything into a single text leaf with styled segments; anything else
//! walks positionally, turning each measured text run into its own synthetic
//! `"#text"` child so line structure survives.

use decal_css::Rgba;
use decal_engine::{ComputedStyle, DomId, PageRect, PseudoKind, RenderedPage};
use decal_ir::{
    AFTER_KIND, BEFORE_KIND, Display, IrNode, IrRect, IrStyle, Position, TEXT_KIND, TextSegment,
    weight_number,
};
use tracing::{debug, warn};
use url::Url;

use crate::style_map::{apply_text_style, surface_style};
use crate::{ExtractError, Result};

/// Layout passes requested before measurement starts.
pub const DEFAULT_SETTLE_PASSES: usize = 2;

/// Pseudo-element boxes without a declared size are estimated from their
/// text at these per-glyph factors.
const PSEUDO_ADVANCE_FACTOR: f32 = 0.6;
const PSEUDO_LINE_FACTOR: f32 = 1.2;
const FALLBACK_FONT_SIZE: f32 = 16.0;

/// Tags that never produce IR nodes. `br` still matters structurally: its
/// presence forces the positional walk.
const SKIP_TAGS: &[&str] = &[
    "script", "style", "meta", "link", "head", "title", "noscript", "template", "br",
];

/// Tags whose presence among an element's children permits the inline merge.
const INLINE_TAGS: &[&str] = &[
    "a", "b", "strong", "em", "i", "u", "span", "small", "abbr", "code", "sub", "sup", "mark",
    "time", "label",
];

/// Form controls that fall back to `value`/`placeholder` text.
const FORM_TAGS: &[&str] = &["input", "textarea", "select"];

/// Knobs for one extraction run.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Base for resolving relative image sources. Unresolvable values pass
    /// through unchanged.
    pub base_url: Option<Url>,
    /// Layout passes requested before measurement; at least one always runs.
    pub settle_passes: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            base_url: None,
            settle_passes: DEFAULT_SETTLE_PASSES,
        }
    }
}

/// Walks the page into an IR tree rooted at [`RenderedPage::root`].
pub fn extract(page: &mut dyn RenderedPage, options: &ExtractOptions) -> Result<IrNode> {
    for _ in 0..options.settle_passes.max(1) {
        page.settle()?;
    }
    let root = page.root();
    let (vw, vh) = page.viewport();
    let viewport = PageRect::new(0.0, 0.0, vw, vh);
    let mut tree = extract_element(page, root, viewport, options, true)?
        .ok_or(ExtractError::RootUnusable)?;
    merge_document_background(&*page, &mut tree)?;
    debug!(nodes = tree.count(), "extracted page into IR");
    Ok(tree)
}

/// The document background lives on the `html` element and does not inherit;
/// it is folded into the root node unless the root paints its own.
fn merge_document_background(page: &dyn RenderedPage, root: &mut IrNode) -> Result<()> {
    let style = page.computed_style(page.document_element())?;
    if root.style.background_color.is_none() {
        root.style.background_color = style.color("background-color");
    }
    if root.style.background_image.is_none() {
        root.style.background_image = style
            .get("background-image")
            .map(str::trim)
            .filter(|value| !value.is_empty() && *value != "none")
            .map(str::to_owned);
    }
    Ok(())
}

fn extract_element(
    page: &mut dyn RenderedPage,
    node: DomId,
    parent_rect: PageRect,
    options: &ExtractOptions,
    is_root: bool,
) -> Result<Option<IrNode>> {
    let tag = page.tag_name(node)?;
    if SKIP_TAGS.contains(&tag.as_str()) {
        return Ok(None);
    }
    let style = page.computed_style(node)?;
    if Display::from_css(style.get("display").unwrap_or_default()).is_none() {
        return Ok(None);
    }
    let position = Position::from_css(style.get("position").unwrap_or_default());
    if position == Position::Fixed && !is_root {
        let mut guard = ReflowGuard::engage(page, node)?;
        let built = build_element(guard.page, node, &tag, parent_rect, options)?;
        guard.restore()?;
        return Ok(built);
    }
    build_element(page, node, &tag, parent_rect, options)
}

fn build_element(
    page: &mut dyn RenderedPage,
    node: DomId,
    tag: &str,
    parent_rect: PageRect,
    options: &ExtractOptions,
) -> Result<Option<IrNode>> {
    let rect = page.bounding_rect(node)?;
    if rect.w < 1.0 || rect.h < 1.0 {
        debug!(tag, "skipping sub-pixel box");
        return Ok(None);
    }
    let style = page.computed_style(node)?;
    let rel = relative_rect(rect, parent_rect);
    let visible = !style.is("visibility", "hidden");

    // Replaced leaves: no walk, no pseudo-elements.
    if tag == "svg" {
        let mut ir = IrNode::new(tag, rel);
        ir.svg_markup = Some(decal_svg::serialize(&*page, node)?);
        ir.style = surface_style(&style);
        ir.visible = visible;
        return Ok(Some(ir));
    }
    if tag == "img" {
        let mut ir = IrNode::new(tag, rel);
        ir.image_url = page
            .attribute(node, "src")?
            .map(|src| resolve_source(&src, options));
        ir.style = surface_style(&style);
        ir.visible = visible;
        return Ok(Some(ir));
    }

    let mut ir = IrNode::new(tag, rel);
    ir.style = surface_style(&style);
    ir.visible = visible;

    let pieces = ordered_pieces(&*page, node)?;
    let has_elements = pieces
        .iter()
        .any(|piece| matches!(piece.kind, PieceKind::Element(..)));
    let has_break = pieces
        .iter()
        .any(|piece| matches!(&piece.kind, PieceKind::Element(_, tag) if tag == "br"));
    let all_inline = pieces.iter().all(|piece| match &piece.kind {
        PieceKind::Run(_) => true,
        PieceKind::Element(_, tag) => INLINE_TAGS.contains(&tag.as_str()),
    });

    let mut text = String::new();
    let mut segments: Vec<TextSegment> = Vec::new();
    let mut placeholder = false;
    let mut children: Vec<IrNode> = Vec::new();

    if has_elements && all_inline && !has_break {
        (text, segments) = merge_inline_content(&*page, &pieces, &style)?;
    }
    if text.trim().is_empty() {
        text.clear();
        segments.clear();
        if has_elements {
            // Positional walk: runs become their own leaves so line
            // structure and per-run placement survive.
            for piece in &pieces {
                match &piece.kind {
                    PieceKind::Run(run) => {
                        if run.trim().is_empty() {
                            continue;
                        }
                        let mut leaf = IrNode::new(TEXT_KIND, relative_rect(piece.rect, rect));
                        leaf.text = run.clone();
                        apply_text_style(&mut leaf.style, &style);
                        children.push(leaf);
                    }
                    PieceKind::Element(child, _) => {
                        if let Some(built) = extract_element(page, *child, rect, options, false)? {
                            children.push(built);
                        }
                    }
                }
            }
        } else {
            for piece in &pieces {
                if let PieceKind::Run(run) = &piece.kind {
                    append_run(&mut text, run);
                }
            }
            if text.trim().is_empty() {
                text.clear();
            }
        }
    }

    if text.is_empty() && children.is_empty() && FORM_TAGS.contains(&tag) {
        if let Some(value) = nonblank_attribute(&*page, node, "value")? {
            text = value;
        } else if let Some(hint) = nonblank_attribute(&*page, node, "placeholder")? {
            text = hint;
            placeholder = true;
        }
    }

    if let Some(before) = pseudo_node(&*page, node, PseudoKind::Before, &style, rect, &ir.style)? {
        children.insert(0, before);
    }
    if let Some(after) = pseudo_node(&*page, node, PseudoKind::After, &style, rect, &ir.style)? {
        children.push(after);
    }

    if !text.is_empty() {
        if children.is_empty() {
            ir.text = text;
            ir.text_segments = segments;
            apply_text_style(&mut ir.style, &style);
            ir.style.placeholder = placeholder;
        } else {
            // Text and children cannot coexist on one node; the text drops
            // into a synthetic child filling the padding box.
            let mut leaf = IrNode::new(TEXT_KIND, padding_box(rect, &ir.style));
            leaf.text = text;
            leaf.text_segments = segments;
            apply_text_style(&mut leaf.style, &style);
            leaf.style.placeholder = placeholder;
            let at = usize::from(children.first().is_some_and(|c| c.kind == BEFORE_KIND));
            children.insert(at, leaf);
        }
    }
    ir.children = children;
    Ok(Some(ir))
}

/// Element and text-run content of one node, ordered by rendered position.
/// The engine reports runs and children separately; sorting by the top-left
/// corner restores reading order for the merge and the positional walk.
fn ordered_pieces(page: &dyn RenderedPage, node: DomId) -> Result<Vec<Piece>> {
    let mut pieces = Vec::new();
    for run in page.text_runs(node)? {
        pieces.push(Piece {
            rect: run.rect,
            kind: PieceKind::Run(run.text),
        });
    }
    for child in page.children(node)? {
        let tag = page.tag_name(child)?;
        let rect = page.bounding_rect(child)?;
        pieces.push(Piece {
            rect,
            kind: PieceKind::Element(child, tag),
        });
    }
    pieces.sort_by(|a, b| {
        a.rect
            .y
            .total_cmp(&b.rect.y)
            .then(a.rect.x.total_cmp(&b.rect.x))
    });
    Ok(pieces)
}

struct Piece {
    rect: PageRect,
    kind: PieceKind,
}

enum PieceKind {
    Run(String),
    Element(DomId, String),
}

/// Flattens purely-inline content into one string plus styled segments.
/// The segment texts concatenate exactly to the merged string; segments are
/// dropped entirely when they carry no styling and no split.
fn merge_inline_content(
    page: &dyn RenderedPage,
    pieces: &[Piece],
    style: &ComputedStyle,
) -> Result<(String, Vec<TextSegment>)> {
    let base_color = style.color("color").unwrap_or(Rgba::BLACK);
    let mut text = String::new();
    let mut segments: Vec<TextSegment> = Vec::new();
    for piece in pieces {
        let start = text.len();
        match &piece.kind {
            PieceKind::Run(run) => {
                append_run(&mut text, run);
                if text.len() > start {
                    segments.push(TextSegment {
                        text: text[start..].to_owned(),
                        bold: false,
                        color: None,
                    });
                }
            }
            PieceKind::Element(child, _) => {
                let content = text_content(page, *child)?;
                if content.is_empty() {
                    continue;
                }
                let child_style = page.computed_style(*child)?;
                let bold = weight_number(child_style.get("font-weight")) >= 700;
                let color = child_style
                    .color("color")
                    .filter(|color| *color != base_color);
                append_run(&mut text, &content);
                segments.push(TextSegment {
                    text: text[start..].to_owned(),
                    bold,
                    color,
                });
            }
        }
    }
    let segments = coalesce(segments);
    let notable = segments
        .iter()
        .any(|segment| segment.bold || segment.color.is_some());
    if segments.len() < 2 && !notable {
        return Ok((text, Vec::new()));
    }
    Ok((text, segments))
}

/// Recursive text of a subtree, pieces in rendered order.
fn text_content(page: &dyn RenderedPage, node: DomId) -> Result<String> {
    let mut out = String::new();
    for piece in ordered_pieces(page, node)? {
        match piece.kind {
            PieceKind::Run(run) => append_run(&mut out, &run),
            PieceKind::Element(child, _) => append_run(&mut out, &text_content(page, child)?),
        }
    }
    Ok(out)
}

/// Joins a run onto accumulated text, inserting the collapsed inter-run
/// space engines trim from line edges.
fn append_run(out: &mut String, run: &str) {
    if run.is_empty() {
        return;
    }
    if !out.is_empty() && !out.ends_with(' ') && !run.starts_with(' ') {
        out.push(' ');
    }
    out.push_str(run);
}

/// Merges neighboring segments with identical styling.
fn coalesce(segments: Vec<TextSegment>) -> Vec<TextSegment> {
    let mut out: Vec<TextSegment> = Vec::new();
    for segment in segments {
        match out.last_mut() {
            Some(last) if last.bold == segment.bold && last.color == segment.color => {
                last.text.push_str(&segment.text);
            }
            _ => out.push(segment),
        }
    }
    out
}

fn pseudo_node(
    page: &dyn RenderedPage,
    node: DomId,
    kind: PseudoKind,
    host_style: &ComputedStyle,
    host_rect: PageRect,
    host_box: &IrStyle,
) -> Result<Option<IrNode>> {
    let Some(style) = page.pseudo_style(node, kind)? else {
        return Ok(None);
    };
    let Some(content) = style
        .get("content")
        .map(str::trim)
        .filter(|value| !value.is_empty() && *value != "none" && *value != "normal")
    else {
        return Ok(None);
    };
    let text = quoted_literal(content).unwrap_or_default();

    let font_size = style
        .px("font-size")
        .or_else(|| host_style.px("font-size"))
        .unwrap_or(FALLBACK_FONT_SIZE);
    let w = style
        .px("width")
        .unwrap_or_else(|| text.chars().count() as f32 * font_size * PSEUDO_ADVANCE_FACTOR);
    let h = style.px("height").unwrap_or_else(|| {
        if text.is_empty() {
            0.0
        } else {
            font_size * PSEUDO_LINE_FACTOR
        }
    });
    if w < 1.0 || h < 1.0 {
        return Ok(None);
    }

    let content_x = host_box.border_widths.left + host_box.padding.left;
    let content_y = host_box.border_widths.top + host_box.padding.top;
    let (x, y) = if style.is("position", "absolute") {
        // Absolute pseudo-elements anchor to the host border box.
        (style.px("left").unwrap_or(0.0), style.px("top").unwrap_or(0.0))
    } else {
        match kind {
            PseudoKind::Before => (content_x, content_y),
            PseudoKind::After => {
                let trailing =
                    host_rect.w - host_box.border_widths.right - host_box.padding.right - w;
                (trailing.max(content_x), content_y)
            }
        }
    };

    let label = match kind {
        PseudoKind::Before => BEFORE_KIND,
        PseudoKind::After => AFTER_KIND,
    };
    let mut ir = IrNode::new(label, IrRect::new(x, y, w, h).rounded());
    ir.style = surface_style(&style);
    if !text.is_empty() {
        ir.text = text;
        apply_text_style(&mut ir.style, &style);
    }
    ir.visible = !style.is("visibility", "hidden");
    Ok(Some(ir))
}

/// `content` keeps its CSS quoting; only literal strings become node text.
fn quoted_literal(content: &str) -> Option<String> {
    let inner = content
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .or_else(|| {
            content
                .strip_prefix('\'')
                .and_then(|rest| rest.strip_suffix('\''))
        })?;
    Some(inner.replace("\\\"", "\"").replace("\\'", "'"))
}

fn nonblank_attribute(
    page: &dyn RenderedPage,
    node: DomId,
    name: &str,
) -> Result<Option<String>> {
    Ok(page
        .attribute(node, name)?
        .filter(|value| !value.trim().is_empty()))
}

fn resolve_source(raw: &str, options: &ExtractOptions) -> String {
    if let Some(base) = &options.base_url {
        if let Ok(joined) = base.join(raw) {
            return joined.into();
        }
    }
    raw.to_owned()
}

fn relative_rect(rect: PageRect, parent: PageRect) -> IrRect {
    IrRect::new(rect.x - parent.x, rect.y - parent.y, rect.w, rect.h).rounded()
}

/// Host-relative padding box: the border box inset by the border widths.
fn padding_box(host: PageRect, style: &IrStyle) -> IrRect {
    let borders = &style.border_widths;
    IrRect::new(
        borders.left,
        borders.top,
        (host.w - borders.left - borders.right).max(0.0),
        (host.h - borders.top - borders.bottom).max(0.0),
    )
    .rounded()
}

/// Clears `position: fixed` for the duration of one subtree build so the
/// element measures where it sits in the flow rather than glued to the
/// viewport. Restores the saved inline style on drop if the build errors
/// out before the explicit restore.
struct ReflowGuard<'a> {
    page: &'a mut dyn RenderedPage,
    node: DomId,
    saved: Option<String>,
    restored: bool,
}

const UNFIX_OVERRIDE: &str = "position: relative; top: auto; left: auto; right: auto; bottom: auto";

impl<'a> ReflowGuard<'a> {
    fn engage(page: &'a mut dyn RenderedPage, node: DomId) -> Result<Self> {
        let saved = page.inline_style(node)?;
        let unfixed = match &saved {
            Some(existing) => format!("{existing}; {UNFIX_OVERRIDE}"),
            None => UNFIX_OVERRIDE.to_owned(),
        };
        page.set_inline_style(node, Some(&unfixed))?;
        let mut guard = Self {
            page,
            node,
            saved,
            restored: false,
        };
        guard.page.settle()?;
        Ok(guard)
    }

    fn restore(&mut self) -> Result<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        self.page.set_inline_style(self.node, self.saved.as_deref())?;
        self.page.settle()?;
        Ok(())
    }
}

impl Drop for ReflowGuard<'_> {
    fn drop(&mut self) {
        if !self.restored {
            if let Err(error) = self.restore() {
                warn!(%error, "failed to restore fixed-position inline style");
            }
        }
    }
}
