//! Deterministic in-process rendered-page backend.
//!
//! [`StaticPage`] parses a document with `scraper`, resolves styles with a
//! small single-compound-selector cascade, and runs a simplified layout:
//! block stacking, single-line inline flow, one-level flex placement, and
//! absolute/fixed positioning. Text advances are a fixed fraction of the font
//! size, so every measurement is reproducible across machines.
//!
//! The point is not CSS completeness. It is answering the same questions a
//! real engine answers, deterministically, so extraction logic can be tested
//! end to end without a browser.

use std::collections::HashMap;
use std::path::Path;

use ego_tree::NodeId as TreeId;
use scraper::{ElementRef, Html, Node, Selector};

use decal_css::{parse_px, split_top_level};

use crate::error::{EngineError, Result};
use crate::page::{ComputedStyle, DomId, PageRect, PseudoKind, RenderedPage, TextRun};

/// Average glyph advance as a fraction of font size.
const GLYPH_ADVANCE_FACTOR: f32 = 0.6;
/// Line height used when `line-height` computes to `normal`.
const NORMAL_LINE_FACTOR: f32 = 1.2;

const INPUT_DEFAULT_SIZE: (f32, f32) = (160.0, 24.0);
const TEXTAREA_DEFAULT_SIZE: (f32, f32) = (200.0, 60.0);

const INHERITED_PROPERTIES: &[&str] = &[
    "color",
    "font-family",
    "font-size",
    "font-style",
    "font-weight",
    "letter-spacing",
    "line-height",
    "text-align",
    "visibility",
];

type StyleMap = HashMap<String, String>;

pub struct StaticPage {
    document: Html,
    viewport: (f32, f32),
    handles: Vec<TreeId>,
    ids: HashMap<TreeId, DomId>,
    html_id: DomId,
    body_id: DomId,
    rules: Vec<StyleRule>,
    inline_overrides: HashMap<usize, Option<String>>,
    styles: Vec<StyleMap>,
    pseudo_styles: Vec<[Option<StyleMap>; 2]>,
    rects: Vec<PageRect>,
    runs: HashMap<usize, Vec<TextRun>>,
}

impl StaticPage {
    pub fn from_html(html: &str, viewport: (f32, f32)) -> Result<Self> {
        let document = Html::parse_document(html);

        let mut handles = Vec::new();
        let mut ids = HashMap::new();
        for node in document.tree.root().descendants() {
            if let Node::Element(_) = node.value() {
                let id = DomId(handles.len());
                ids.insert(node.id(), id);
                handles.push(node.id());
            }
        }

        let html_id = find_by_tag(&document, &ids, "html")
            .ok_or_else(|| EngineError::LoadFailed("document has no html element".to_owned()))?;
        let body_id = find_by_tag(&document, &ids, "body").ok_or(EngineError::MissingBody)?;
        let rules = collect_rules(&document);

        let count = handles.len();
        let mut page = Self {
            document,
            viewport,
            handles,
            ids,
            html_id,
            body_id,
            rules,
            inline_overrides: HashMap::new(),
            styles: vec![StyleMap::new(); count],
            pseudo_styles: vec![[None, None]; count],
            rects: vec![PageRect::default(); count],
            runs: HashMap::new(),
        };
        page.settle()?;
        Ok(page)
    }

    pub fn from_file(path: &Path, viewport: (f32, f32)) -> Result<Self> {
        let html = std::fs::read_to_string(path)?;
        Self::from_html(&html, viewport)
    }

    fn tree_id(&self, node: DomId) -> Result<TreeId> {
        self.handles
            .get(node.0)
            .copied()
            .ok_or(EngineError::StaleNode(node))
    }

    fn element(&self, node: DomId) -> Result<ElementRef<'_>> {
        let id = self.tree_id(node)?;
        let node_ref = self
            .document
            .tree
            .get(id)
            .ok_or(EngineError::StaleNode(node))?;
        ElementRef::wrap(node_ref).ok_or(EngineError::StaleNode(node))
    }

    fn tag(&self, node: DomId) -> Result<String> {
        Ok(self.element(node)?.value().name().to_ascii_lowercase())
    }

    fn effective_inline_style(&self, node: DomId) -> Result<Option<String>> {
        if let Some(overridden) = self.inline_overrides.get(&node.0) {
            return Ok(overridden.clone());
        }
        Ok(self
            .element(node)?
            .value()
            .attr("style")
            .map(str::to_owned))
    }

    /// Element and text children, in document order. Whitespace runs inside
    /// text collapse to single spaces; a single edge space survives so
    /// inter-element spacing is preserved until line boxes trim it.
    fn child_items(&self, node: DomId) -> Result<Vec<ChildItem>> {
        let element = self.element(node)?;
        let mut items = Vec::new();
        for child in element.children() {
            match child.value() {
                Node::Element(_) => {
                    if let Some(id) = self.ids.get(&child.id()) {
                        items.push(ChildItem::Element(*id));
                    }
                }
                Node::Text(text) => {
                    let raw: &str = &text.text;
                    let collapsed = collapse_whitespace(raw);
                    if !collapsed.is_empty() {
                        items.push(ChildItem::Text(collapsed));
                    }
                }
                _ => {}
            }
        }
        Ok(items)
    }

    fn resolve_styles(&mut self) -> Result<()> {
        let count = self.handles.len();
        let mut styles = vec![StyleMap::new(); count];
        let mut pseudos: Vec<[Option<StyleMap>; 2]> = vec![[None, None]; count];

        let mut stack: Vec<(DomId, Option<usize>)> = vec![(self.html_id, None)];
        while let Some((node, parent)) = stack.pop() {
            let element = self.element(node)?;
            let tag = element.value().name().to_ascii_lowercase();

            let inherited: Vec<(String, String)> = match parent {
                Some(parent_index) => INHERITED_PROPERTIES
                    .iter()
                    .filter_map(|prop| {
                        styles[parent_index]
                            .get(*prop)
                            .map(|value| ((*prop).to_owned(), value.clone()))
                    })
                    .collect(),
                None => base_defaults(),
            };

            let inline = self.effective_inline_style(node)?;
            let map =
                self.resolve_one(&element, &tag, &inherited, inline.as_deref(), None);
            for pseudo in [PseudoKind::Before, PseudoKind::After] {
                let index = pseudo_index(pseudo);
                pseudos[node.0][index] = self.resolve_pseudo(&element, &map, pseudo);
            }
            styles[node.0] = map;

            for child in self.child_items(node)? {
                if let ChildItem::Element(id) = child {
                    stack.push((id, Some(node.0)));
                }
            }
        }

        self.styles = styles;
        self.pseudo_styles = pseudos;
        Ok(())
    }

    fn resolve_one(
        &self,
        element: &ElementRef<'_>,
        tag: &str,
        inherited: &[(String, String)],
        inline: Option<&str>,
        pseudo: Option<PseudoKind>,
    ) -> StyleMap {
        let mut map = StyleMap::new();
        for (name, value) in inherited {
            map.insert(name.clone(), value.clone());
        }
        if pseudo.is_none() {
            apply_tag_defaults(tag, &mut map);
        } else {
            map.insert("display".to_owned(), "inline".to_owned());
        }

        let mut matching: Vec<&StyleRule> = self
            .rules
            .iter()
            .filter(|rule| rule.pseudo == pseudo && rule.selector.matches(element))
            .collect();
        matching.sort_by_key(|rule| (rule.specificity, rule.order));
        for rule in matching {
            for (name, value) in &rule.declarations {
                apply_declaration(&mut map, name, value);
            }
        }

        if let Some(inline) = inline {
            for (name, value) in parse_declarations(inline) {
                apply_declaration(&mut map, &name, &value);
            }
        }

        finalize_style(&mut map, inherited);
        map
    }

    fn resolve_pseudo(
        &self,
        element: &ElementRef<'_>,
        owner: &StyleMap,
        pseudo: PseudoKind,
    ) -> Option<StyleMap> {
        let applies = self
            .rules
            .iter()
            .any(|rule| rule.pseudo == Some(pseudo) && rule.selector.matches(element));
        if !applies {
            return None;
        }
        let inherited: Vec<(String, String)> = INHERITED_PROPERTIES
            .iter()
            .filter_map(|prop| owner.get(*prop).map(|v| ((*prop).to_owned(), v.clone())))
            .collect();
        Some(self.resolve_one(element, "", &inherited, None, Some(pseudo)))
    }
}

impl RenderedPage for StaticPage {
    fn viewport(&self) -> (f32, f32) {
        self.viewport
    }

    fn root(&self) -> DomId {
        self.body_id
    }

    fn document_element(&self) -> DomId {
        self.html_id
    }

    fn tag_name(&self, node: DomId) -> Result<String> {
        self.tag(node)
    }

    fn attribute(&self, node: DomId, name: &str) -> Result<Option<String>> {
        if name == "style" {
            return self.effective_inline_style(node);
        }
        Ok(self.element(node)?.value().attr(name).map(str::to_owned))
    }

    fn children(&self, node: DomId) -> Result<Vec<DomId>> {
        Ok(self
            .child_items(node)?
            .into_iter()
            .filter_map(|item| match item {
                ChildItem::Element(id) => Some(id),
                ChildItem::Text(_) => None,
            })
            .collect())
    }

    fn computed_style(&self, node: DomId) -> Result<ComputedStyle> {
        let map = self
            .styles
            .get(node.0)
            .ok_or(EngineError::StaleNode(node))?;
        Ok(ComputedStyle::from_properties(map.clone()))
    }

    fn pseudo_style(&self, node: DomId, pseudo: PseudoKind) -> Result<Option<ComputedStyle>> {
        let slot = self
            .pseudo_styles
            .get(node.0)
            .ok_or(EngineError::StaleNode(node))?;
        Ok(slot[pseudo_index(pseudo)]
            .as_ref()
            .map(|map| ComputedStyle::from_properties(map.clone())))
    }

    fn bounding_rect(&self, node: DomId) -> Result<PageRect> {
        self.rects
            .get(node.0)
            .copied()
            .ok_or(EngineError::StaleNode(node))
    }

    fn text_runs(&self, node: DomId) -> Result<Vec<TextRun>> {
        self.tree_id(node)?;
        Ok(self.runs.get(&node.0).cloned().unwrap_or_default())
    }

    fn outer_markup(&self, node: DomId) -> Result<String> {
        Ok(self.element(node)?.html())
    }

    fn markup_by_id(&self, id: &str) -> Result<Option<String>> {
        for (index, _) in self.handles.iter().enumerate() {
            let element = self.element(DomId(index))?;
            if element.value().attr("id") == Some(id) {
                return Ok(Some(element.html()));
            }
        }
        Ok(None)
    }

    fn inline_style(&self, node: DomId) -> Result<Option<String>> {
        self.effective_inline_style(node)
    }

    fn set_inline_style(&mut self, node: DomId, style: Option<&str>) -> Result<()> {
        self.tree_id(node)?;
        self.inline_overrides
            .insert(node.0, style.map(str::to_owned));
        Ok(())
    }

    fn settle(&mut self) -> Result<()> {
        self.resolve_styles()?;
        let (rects, runs) = {
            let mut layouter = Layouter {
                page: self,
                rects: vec![PageRect::default(); self.handles.len()],
                runs: HashMap::new(),
            };
            layouter.run()?;
            (layouter.rects, layouter.runs)
        };
        self.rects = rects;
        self.runs = runs;
        Ok(())
    }
}

enum ChildItem {
    Element(DomId),
    Text(String),
}

fn pseudo_index(pseudo: PseudoKind) -> usize {
    match pseudo {
        PseudoKind::Before => 0,
        PseudoKind::After => 1,
    }
}

fn find_by_tag(document: &Html, ids: &HashMap<TreeId, DomId>, tag: &str) -> Option<DomId> {
    let selector = Selector::parse(tag).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|element| ids.get(&element.id()).copied())
}

fn collapse_whitespace(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_space = false;
    for ch in input.chars() {
        if ch.is_whitespace() {
            in_space = true;
            continue;
        }
        if in_space {
            out.push(' ');
            in_space = false;
        }
        out.push(ch);
    }
    if in_space {
        out.push(' ');
    }
    out
}

// ---------------------------------------------------------------------------
// Cascade
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct StyleRule {
    selector: SimpleSelector,
    pseudo: Option<PseudoKind>,
    declarations: Vec<(String, String)>,
    specificity: Specificity,
    order: usize,
}

#[derive(Debug, Clone, Default)]
struct SimpleSelector {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl SimpleSelector {
    fn matches(&self, element: &ElementRef<'_>) -> bool {
        if let Some(tag) = &self.tag {
            if !element.value().name().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            match element.value().attr("id") {
                Some(value) if value == id => {}
                _ => return false,
            }
        }
        for class in &self.classes {
            let has_class = element
                .value()
                .classes()
                .any(|candidate| candidate.eq_ignore_ascii_case(class));
            if !has_class {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
struct Specificity {
    ids: u32,
    classes: u32,
    elements: u32,
}

impl Specificity {
    fn for_selector(selector: &SimpleSelector) -> Self {
        Self {
            ids: u32::from(selector.id.is_some()),
            classes: selector.classes.len() as u32,
            elements: u32::from(selector.tag.is_some()),
        }
    }
}

fn collect_rules(document: &Html) -> Vec<StyleRule> {
    let mut rules = Vec::new();
    let Ok(selector) = Selector::parse("style") else {
        return rules;
    };
    let mut order = 0usize;
    for node in document.select(&selector) {
        let css = node.text().collect::<String>();
        parse_stylesheet(&css, &mut order, &mut rules);
    }
    rules
}

fn parse_stylesheet(css: &str, order: &mut usize, rules: &mut Vec<StyleRule>) {
    let css = strip_comments(css);
    let mut rest = css.as_str();
    while let Some(open) = rest.find('{') {
        let selector_part = rest[..open].trim();
        // Skip at-rules together with their nested block.
        if selector_part.starts_with('@') {
            match skip_block(&rest[open..]) {
                Some(consumed) => rest = &rest[open + consumed..],
                None => return,
            }
            continue;
        }
        let Some(close) = rest[open..].find('}') else {
            return;
        };
        let body = &rest[open + 1..open + close];
        let declarations = parse_declarations(body);
        if !declarations.is_empty() {
            for raw_selector in selector_part.split(',') {
                if let Some((selector, pseudo)) = parse_selector(raw_selector) {
                    rules.push(StyleRule {
                        specificity: Specificity::for_selector(&selector),
                        selector,
                        pseudo,
                        declarations: declarations.clone(),
                        order: *order,
                    });
                    *order += 1;
                }
            }
        }
        rest = &rest[open + close + 1..];
    }
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start..].find("*/") {
            Some(end) => rest = &rest[start + end + 2..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

/// Byte length of a balanced `{...}` block, starting at the opening brace.
fn skip_block(input: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, ch) in input.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parses one compound selector, optionally suffixed with `::before` or
/// `::after`. Combinators, attribute selectors, and other pseudo-classes are
/// not supported; such selectors are dropped.
fn parse_selector(raw: &str) -> Option<(SimpleSelector, Option<PseudoKind>)> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let (base, pseudo) = if let Some(stripped) = raw.strip_suffix("::before") {
        (stripped, Some(PseudoKind::Before))
    } else if let Some(stripped) = raw.strip_suffix("::after") {
        (stripped, Some(PseudoKind::After))
    } else if let Some(stripped) = raw.strip_suffix(":before") {
        (stripped, Some(PseudoKind::Before))
    } else if let Some(stripped) = raw.strip_suffix(":after") {
        (stripped, Some(PseudoKind::After))
    } else {
        (raw, None)
    };
    let base = base.trim();
    if base == "*" || base.is_empty() {
        return Some((SimpleSelector::default(), pseudo));
    }
    if base.chars().any(char::is_whitespace)
        || base.contains(['>', '+', '~', '[', ':'])
    {
        return None;
    }

    let mut selector = SimpleSelector::default();
    let mut rest = base;
    if !rest.starts_with(['.', '#']) {
        let end = rest.find(['.', '#']).unwrap_or(rest.len());
        selector.tag = Some(rest[..end].to_ascii_lowercase());
        rest = &rest[end..];
    }
    while !rest.is_empty() {
        let marker = rest.as_bytes()[0];
        let end = rest[1..].find(['.', '#']).map_or(rest.len(), |i| i + 1);
        let name = &rest[1..end];
        if name.is_empty() {
            return None;
        }
        match marker {
            b'.' => selector.classes.push(name.to_owned()),
            b'#' => selector.id = Some(name.to_owned()),
            _ => return None,
        }
        rest = &rest[end..];
    }
    Some((selector, pseudo))
}

fn parse_declarations(body: &str) -> Vec<(String, String)> {
    let mut declarations = Vec::new();
    for piece in body.split(';') {
        let Some((name, value)) = piece.split_once(':') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        let mut value = value.trim();
        if let Some(stripped) = value.strip_suffix("!important") {
            value = stripped.trim_end();
        }
        if !name.is_empty() && !value.is_empty() {
            declarations.push((name, value.to_owned()));
        }
    }
    declarations
}

/// Applies one declaration, expanding the shorthands the layout and
/// extraction sides read back as longhands.
fn apply_declaration(map: &mut StyleMap, name: &str, value: &str) {
    const SIDES: [&str; 4] = ["top", "right", "bottom", "left"];
    const CORNERS: [&str; 4] = [
        "border-top-left-radius",
        "border-top-right-radius",
        "border-bottom-right-radius",
        "border-bottom-left-radius",
    ];

    match name {
        "padding" | "margin" => {
            if let Some(values) = expand_sides(value) {
                for (side, side_value) in SIDES.iter().zip(values) {
                    map.insert(format!("{name}-{side}"), side_value);
                }
            }
        }
        "border" => {
            for token in split_top_level(value, ' ') {
                if parse_px(token).is_some() {
                    for side in SIDES {
                        map.insert(format!("border-{side}-width"), token.to_owned());
                    }
                } else if is_border_style(token) {
                    map.insert("border-style".to_owned(), token.to_owned());
                    for side in SIDES {
                        map.insert(format!("border-{side}-style"), token.to_owned());
                    }
                } else {
                    map.insert("border-color".to_owned(), token.to_owned());
                    for side in SIDES {
                        map.insert(format!("border-{side}-color"), token.to_owned());
                    }
                }
            }
        }
        "border-width" | "border-style" | "border-color" => {
            let leaf = &name["border-".len()..];
            if leaf != "width" {
                map.insert(name.to_owned(), value.to_owned());
            }
            if let Some(values) = expand_sides(value) {
                for (side, side_value) in SIDES.iter().zip(values) {
                    map.insert(format!("border-{side}-{leaf}"), side_value);
                }
            }
        }
        "border-radius" => {
            if let Some(values) = expand_sides(value) {
                for (corner, corner_value) in CORNERS.iter().zip(values) {
                    map.insert((*corner).to_owned(), corner_value);
                }
            }
        }
        "gap" => {
            let values = split_top_level(value, ' ');
            if let Some(first) = values.first() {
                map.insert("row-gap".to_owned(), (*first).to_owned());
                let second = values.get(1).copied().unwrap_or(first);
                map.insert("column-gap".to_owned(), second.to_owned());
            }
        }
        "background" => {
            if value.contains("gradient(") {
                map.insert("background-image".to_owned(), value.to_owned());
            } else {
                map.insert("background-color".to_owned(), value.to_owned());
            }
        }
        "text-decoration" => {
            map.insert("text-decoration-line".to_owned(), value.to_owned());
        }
        _ => {
            map.insert(name.to_owned(), value.to_owned());
        }
    }
}

/// CSS 1-to-4 value expansion, in top/right/bottom/left order.
fn expand_sides(value: &str) -> Option<[String; 4]> {
    let parts = split_top_level(value, ' ');
    let pick = |index: usize| -> String { parts[index].to_owned() };
    match parts.len() {
        1 => Some([pick(0), pick(0), pick(0), pick(0)]),
        2 => Some([pick(0), pick(1), pick(0), pick(1)]),
        3 => Some([pick(0), pick(1), pick(2), pick(1)]),
        4 => Some([pick(0), pick(1), pick(2), pick(3)]),
        _ => None,
    }
}

fn is_border_style(token: &str) -> bool {
    matches!(
        token,
        "none" | "hidden" | "solid" | "dashed" | "dotted" | "double" | "groove" | "ridge"
            | "inset" | "outset"
    )
}

fn base_defaults() -> Vec<(String, String)> {
    [
        ("font-size", "16px"),
        ("font-family", "Arial"),
        ("font-weight", "400"),
        ("font-style", "normal"),
        ("color", "rgb(0, 0, 0)"),
        ("visibility", "visible"),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_owned(), value.to_owned()))
    .collect()
}

fn apply_tag_defaults(tag: &str, map: &mut StyleMap) {
    map.insert("display".to_owned(), ua_display(tag).to_owned());
    let mut set = |name: &str, value: &str| {
        map.insert(name.to_owned(), value.to_owned());
    };
    match tag {
        "h1" => {
            set("font-size", "32px");
            set("font-weight", "700");
        }
        "h2" => {
            set("font-size", "28px");
            set("font-weight", "700");
        }
        "h3" => {
            set("font-size", "24px");
            set("font-weight", "700");
        }
        "h4" => {
            set("font-size", "20px");
            set("font-weight", "700");
        }
        "h5" => {
            set("font-size", "18px");
            set("font-weight", "700");
        }
        "h6" => {
            set("font-size", "16px");
            set("font-weight", "700");
        }
        "b" | "strong" => set("font-weight", "700"),
        "em" | "i" => set("font-style", "italic"),
        "u" => set("text-decoration-line", "underline"),
        "a" => {
            set("color", "rgb(0, 0, 238)");
            set("text-decoration-line", "underline");
        }
        "code" | "pre" => set("font-family", "monospace"),
        _ => {}
    }
}

fn ua_display(tag: &str) -> &'static str {
    match tag {
        "span" | "a" | "b" | "strong" | "em" | "i" | "u" | "small" | "code" | "label" | "sub"
        | "sup" | "br" => "inline",
        "img" | "svg" | "button" | "input" | "select" | "textarea" => "inline-block",
        "head" | "script" | "style" | "meta" | "link" | "title" | "template" | "noscript" => {
            "none"
        }
        _ => "block",
    }
}

fn finalize_style(map: &mut StyleMap, inherited: &[(String, String)]) {
    let explicit_inherits: Vec<String> = map
        .iter()
        .filter(|(_, value)| value.as_str() == "inherit")
        .map(|(name, _)| name.clone())
        .collect();
    for name in explicit_inherits {
        match inherited.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => {
                map.insert(name, value.clone());
            }
            None => {
                map.remove(&name);
            }
        }
    }

    // Unitless line-height multiplies the font size.
    if let Some(raw) = map.get("line-height").cloned() {
        let trimmed = raw.trim();
        if !trimmed.ends_with("px") {
            if let Ok(factor) = trimmed.parse::<f32>() {
                let font_size = map.get("font-size").and_then(|v| parse_px(v)).unwrap_or(16.0);
                map.insert("line-height".to_owned(), format!("{}px", font_size * factor));
            }
        }
    }

    // A border side without a painting line style has used width zero.
    for side in ["top", "right", "bottom", "left"] {
        let style_key = format!("border-{side}-style");
        let paints = !matches!(map.get(&style_key).map(String::as_str), None | Some("none"));
        if !paints {
            map.insert(format!("border-{side}-width"), "0px".to_owned());
        }
    }

    map.entry("position".to_owned())
        .or_insert_with(|| "static".to_owned());
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
struct EdgeValues {
    top: f32,
    right: f32,
    bottom: f32,
    left: f32,
}

impl EdgeValues {
    fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

fn prop<'s>(style: &'s StyleMap, name: &str) -> Option<&'s str> {
    style.get(name).map(String::as_str)
}

fn prop_px(style: &StyleMap, name: &str) -> Option<f32> {
    prop(style, name).and_then(parse_px)
}

fn edge_values(style: &StyleMap, prefix: &str) -> EdgeValues {
    EdgeValues {
        top: prop_px(style, &format!("{prefix}-top")).unwrap_or(0.0),
        right: prop_px(style, &format!("{prefix}-right")).unwrap_or(0.0),
        bottom: prop_px(style, &format!("{prefix}-bottom")).unwrap_or(0.0),
        left: prop_px(style, &format!("{prefix}-left")).unwrap_or(0.0),
    }
}

fn border_widths(style: &StyleMap) -> EdgeValues {
    EdgeValues {
        top: prop_px(style, "border-top-width").unwrap_or(0.0),
        right: prop_px(style, "border-right-width").unwrap_or(0.0),
        bottom: prop_px(style, "border-bottom-width").unwrap_or(0.0),
        left: prop_px(style, "border-left-width").unwrap_or(0.0),
    }
}

fn font_size_of(style: &StyleMap) -> f32 {
    prop_px(style, "font-size").unwrap_or(16.0)
}

fn line_height_of(style: &StyleMap) -> f32 {
    prop_px(style, "line-height").unwrap_or_else(|| font_size_of(style) * NORMAL_LINE_FACTOR)
}

fn letter_spacing_of(style: &StyleMap) -> f32 {
    prop_px(style, "letter-spacing").unwrap_or(0.0)
}

fn advance(text: &str, style: &StyleMap) -> f32 {
    let per_glyph = font_size_of(style) * GLYPH_ADVANCE_FACTOR + letter_spacing_of(style);
    text.chars().count() as f32 * per_glyph
}

fn is_flex(style: &StyleMap) -> bool {
    matches!(prop(style, "display"), Some("flex") | Some("inline-flex"))
}

fn is_inline_level(style: &StyleMap) -> bool {
    matches!(
        prop(style, "display"),
        Some("inline") | Some("inline-block") | Some("inline-flex")
    )
}

fn is_out_of_flow(style: &StyleMap) -> bool {
    matches!(prop(style, "position"), Some("absolute") | Some("fixed"))
}

fn is_replaced_tag(tag: &str) -> bool {
    matches!(tag, "img" | "svg" | "input" | "select" | "textarea")
}

struct Layouter<'a> {
    page: &'a StaticPage,
    rects: Vec<PageRect>,
    runs: HashMap<usize, Vec<TextRun>>,
}

enum LineItemKind {
    Run(String),
    Child(DomId),
}

struct LineItem {
    kind: LineItemKind,
    w: f32,
    h: f32,
}

impl LineItem {
    fn is_blank_run(&self) -> bool {
        matches!(&self.kind, LineItemKind::Run(text) if text.trim().is_empty())
    }
}

impl<'a> Layouter<'a> {
    fn run(&mut self) -> Result<()> {
        let page = self.page;
        let (vw, vh) = page.viewport;
        let body = page.body_id;
        let style = &page.styles[body.0];
        let margin = edge_values(style, "margin");
        let width =
            prop_px(style, "width").unwrap_or_else(|| (vw - margin.horizontal()).max(0.0));
        let height = self.layout_child(body, margin.left, margin.top, width)?;
        let document_height = vh.max(margin.top + height + margin.bottom);
        self.rects[page.html_id.0] = PageRect::new(0.0, 0.0, vw, document_height);
        Ok(())
    }

    /// Lays the element's border box at `(x, y)` with the given border-box
    /// width, then applies any relative offset to the whole subtree.
    /// Returns the border-box height.
    fn layout_child(&mut self, node: DomId, x: f32, y: f32, width: f32) -> Result<f32> {
        let height = self.layout_element(node, x, y, width)?;
        let style = &self.page.styles[node.0];
        if prop(style, "position") == Some("relative") {
            let dx = prop_px(style, "left")
                .or_else(|| prop_px(style, "right").map(|v| -v))
                .unwrap_or(0.0);
            let dy = prop_px(style, "top")
                .or_else(|| prop_px(style, "bottom").map(|v| -v))
                .unwrap_or(0.0);
            if dx != 0.0 || dy != 0.0 {
                self.shift_subtree(node, dx, dy)?;
            }
        }
        Ok(height)
    }

    fn layout_element(&mut self, node: DomId, x: f32, y: f32, width: f32) -> Result<f32> {
        let page = self.page;
        let style = &page.styles[node.0];
        if prop(style, "display") == Some("none") {
            self.rects[node.0] = PageRect::default();
            return Ok(0.0);
        }

        let tag = page.tag(node)?;
        let spec_h = prop_px(style, "height");
        if is_replaced_tag(&tag) {
            let (_, natural_h) = replaced_size(page, node, style)?;
            let height = spec_h.unwrap_or(natural_h);
            self.rects[node.0] = PageRect::new(x, y, width, height);
            return Ok(height);
        }

        let padding = edge_values(style, "padding");
        let border = border_widths(style);
        let content_x = x + padding.left + border.left;
        let content_y = y + padding.top + border.top;
        let content_w = (width - padding.horizontal() - border.horizontal()).max(0.0);
        let fixed_content_h =
            spec_h.map(|h| (h - padding.vertical() - border.vertical()).max(0.0));

        let flowed_h = if is_flex(style) {
            self.layout_flex(node, content_x, content_y, content_w, fixed_content_h)?
        } else {
            self.layout_flow(node, content_x, content_y, content_w, fixed_content_h)?
        };

        let height = spec_h.unwrap_or(flowed_h + padding.vertical() + border.vertical());
        self.rects[node.0] = PageRect::new(x, y, width, height);
        Ok(height)
    }

    /// Block and inline flow: inline-level items share single lines, block
    /// children stack. Returns the flowed content height.
    fn layout_flow(
        &mut self,
        node: DomId,
        cx: f32,
        cy: f32,
        cw: f32,
        fixed_content_h: Option<f32>,
    ) -> Result<f32> {
        let page = self.page;
        let node_style = &page.styles[node.0];
        let mut cursor_y = cy;
        let mut line: Vec<LineItem> = Vec::new();
        let mut deferred: Vec<DomId> = Vec::new();

        for item in page.child_items(node)? {
            match item {
                ChildItem::Text(text) => {
                    // A whitespace-only run at the start of a line collapses.
                    if line.is_empty() && text.trim().is_empty() {
                        continue;
                    }
                    let w = advance(&text, node_style);
                    let h = line_height_of(node_style);
                    line.push(LineItem { kind: LineItemKind::Run(text), w, h });
                }
                ChildItem::Element(child) => {
                    let child_style = &page.styles[child.0];
                    if prop(child_style, "display") == Some("none") {
                        self.rects[child.0] = PageRect::default();
                        continue;
                    }
                    if is_out_of_flow(child_style) {
                        deferred.push(child);
                        continue;
                    }
                    let child_tag = page.tag(child)?;
                    if child_tag == "br" {
                        cursor_y = self.flush_line(node, &mut line, cx, cw, cursor_y)?;
                        self.rects[child.0] = PageRect::new(cx, cursor_y, 0.0, 0.0);
                        continue;
                    }
                    if is_inline_level(child_style) || is_replaced_tag(&child_tag) {
                        let (w, h) = self.measure_box(child, cw)?;
                        line.push(LineItem { kind: LineItemKind::Child(child), w, h });
                    } else {
                        cursor_y = self.flush_line(node, &mut line, cx, cw, cursor_y)?;
                        let margin = edge_values(child_style, "margin");
                        let child_w = prop_px(child_style, "width")
                            .unwrap_or_else(|| (cw - margin.horizontal()).max(0.0));
                        let child_h = self.layout_child(
                            child,
                            cx + margin.left,
                            cursor_y + margin.top,
                            child_w,
                        )?;
                        cursor_y += margin.top + child_h + margin.bottom;
                    }
                }
            }
        }
        cursor_y = self.flush_line(node, &mut line, cx, cw, cursor_y)?;

        let content_h = fixed_content_h.unwrap_or(cursor_y - cy);
        for child in deferred {
            self.place_out_of_flow(child, PageRect::new(cx, cy, cw, content_h))?;
        }
        Ok(cursor_y - cy)
    }

    fn flush_line(
        &mut self,
        node: DomId,
        line: &mut Vec<LineItem>,
        cx: f32,
        cw: f32,
        cursor_y: f32,
    ) -> Result<f32> {
        let mut items = std::mem::take(line);
        let node_style = &self.page.styles[node.0];

        // Line boxes drop trailing whitespace and trim run edges.
        while matches!(items.last(), Some(item) if item.is_blank_run()) {
            items.pop();
        }
        if let Some(first) = items.first_mut() {
            if let LineItemKind::Run(text) = &mut first.kind {
                let trimmed = text.trim_start();
                if trimmed.len() != text.len() {
                    *text = trimmed.to_owned();
                    first.w = advance(text, node_style);
                }
            }
        }
        if let Some(last) = items.last_mut() {
            if let LineItemKind::Run(text) = &mut last.kind {
                let trimmed = text.trim_end();
                if trimmed.len() != text.len() {
                    *text = trimmed.to_owned();
                    last.w = advance(text, node_style);
                }
            }
        }
        if items.is_empty() {
            return Ok(cursor_y);
        }
        let line_w: f32 = items.iter().map(|item| item.w).sum();
        let line_h = items.iter().map(|item| item.h).fold(0.0f32, f32::max);
        let mut x = cx
            + match prop(node_style, "text-align") {
                Some("center") => ((cw - line_w) / 2.0).max(0.0),
                Some("right") | Some("end") => (cw - line_w).max(0.0),
                _ => 0.0,
            };
        for item in items {
            match item.kind {
                LineItemKind::Run(text) => {
                    self.runs.entry(node.0).or_default().push(TextRun {
                        text,
                        rect: PageRect::new(x, cursor_y, item.w, item.h),
                    });
                }
                LineItemKind::Child(child) => {
                    self.layout_child(child, x, cursor_y, item.w)?;
                }
            }
            x += item.w;
        }
        Ok(cursor_y + line_h)
    }

    /// One-level flex placement along the main axis with gaps, justify, and
    /// align offsets. Wrapping is not modeled.
    fn layout_flex(
        &mut self,
        node: DomId,
        cx: f32,
        cy: f32,
        cw: f32,
        fixed_content_h: Option<f32>,
    ) -> Result<f32> {
        let page = self.page;
        let style = &page.styles[node.0];
        let column = matches!(
            prop(style, "flex-direction"),
            Some("column") | Some("column-reverse")
        );
        let align = prop(style, "align-items").unwrap_or("stretch");
        let justify = prop(style, "justify-content").unwrap_or("flex-start");
        let main_gap = if column {
            prop_px(style, "row-gap").unwrap_or(0.0)
        } else {
            prop_px(style, "column-gap").unwrap_or(0.0)
        };

        let mut in_flow = Vec::new();
        let mut deferred = Vec::new();
        for item in page.child_items(node)? {
            let ChildItem::Element(child) = item else {
                continue;
            };
            let child_style = &page.styles[child.0];
            if prop(child_style, "display") == Some("none") {
                self.rects[child.0] = PageRect::default();
            } else if is_out_of_flow(child_style) {
                deferred.push(child);
            } else {
                in_flow.push(child);
            }
        }

        let mut sizes = Vec::with_capacity(in_flow.len());
        for child in &in_flow {
            sizes.push(self.measure_box(*child, cw)?);
        }
        let gaps = main_gap * in_flow.len().saturating_sub(1) as f32;

        let content_h = if column {
            let total: f32 = sizes.iter().map(|(_, h)| *h).sum::<f32>() + gaps;
            let ch = fixed_content_h.unwrap_or(total);
            let mut y = cy + main_offset(justify, ch, total);
            let extra = justify_extra(justify, ch, total, in_flow.len());
            for (child, (w, h)) in in_flow.iter().zip(&sizes) {
                let child_style = &page.styles[child.0];
                let stretch =
                    align == "stretch" && prop_px(child_style, "width").is_none();
                let child_w = if stretch { cw } else { *w };
                let x = cx + cross_offset(align, cw, child_w);
                self.layout_child(*child, x, y, child_w)?;
                y += h + main_gap + extra;
            }
            ch
        } else {
            let total: f32 = sizes.iter().map(|(w, _)| *w).sum::<f32>() + gaps;
            let max_h = sizes.iter().map(|(_, h)| *h).fold(0.0f32, f32::max);
            let ch = fixed_content_h.unwrap_or(max_h);
            let mut x = cx + main_offset(justify, cw, total);
            let extra = justify_extra(justify, cw, total, in_flow.len());
            for (child, (w, h)) in in_flow.iter().zip(&sizes) {
                let y = cy + cross_offset(align, ch, *h);
                self.layout_child(*child, x, y, *w)?;
                x += w + main_gap + extra;
            }
            ch
        };

        for child in deferred {
            self.place_out_of_flow(child, PageRect::new(cx, cy, cw, content_h))?;
        }
        Ok(content_h)
    }

    fn place_out_of_flow(&mut self, node: DomId, containing: PageRect) -> Result<()> {
        let page = self.page;
        let style = &page.styles[node.0];
        let containing = if prop(style, "position") == Some("fixed") {
            let (vw, vh) = page.viewport;
            PageRect::new(0.0, 0.0, vw, vh)
        } else {
            containing
        };
        let (w, h) = self.measure_box(node, containing.w)?;
        let x = containing.x
            + prop_px(style, "left").unwrap_or_else(|| {
                prop_px(style, "right").map_or(0.0, |right| containing.w - right - w)
            });
        let y = containing.y
            + prop_px(style, "top").unwrap_or_else(|| {
                prop_px(style, "bottom").map_or(0.0, |bottom| containing.h - bottom - h)
            });
        self.layout_element(node, x, y, w)?;
        Ok(())
    }

    fn shift_subtree(&mut self, node: DomId, dx: f32, dy: f32) -> Result<()> {
        let rect = &mut self.rects[node.0];
        rect.x += dx;
        rect.y += dy;
        if let Some(runs) = self.runs.get_mut(&node.0) {
            for run in runs {
                run.rect.x += dx;
                run.rect.y += dy;
            }
        }
        for item in self.page.child_items(node)? {
            if let ChildItem::Element(child) = item {
                self.shift_subtree(child, dx, dy)?;
            }
        }
        Ok(())
    }

    /// Shrink-to-fit border-box size of an element, without positioning it.
    fn measure_box(&self, node: DomId, avail: f32) -> Result<(f32, f32)> {
        let page = self.page;
        let style = &page.styles[node.0];
        if prop(style, "display") == Some("none") {
            return Ok((0.0, 0.0));
        }
        let tag = page.tag(node)?;
        if is_replaced_tag(&tag) {
            return replaced_size(page, node, style);
        }

        let padding = edge_values(style, "padding");
        let border = border_widths(style);
        let spec_w = prop_px(style, "width");
        let spec_h = prop_px(style, "height");
        let inner_avail = (spec_w.unwrap_or(avail) - padding.horizontal() - border.horizontal())
            .max(0.0);

        let (content_w, content_h) = if is_flex(style) {
            self.measure_flex_content(node, inner_avail)?
        } else {
            self.measure_flow_content(node, inner_avail)?
        };
        let w = spec_w
            .unwrap_or(content_w + padding.horizontal() + border.horizontal());
        let h = spec_h.unwrap_or(content_h + padding.vertical() + border.vertical());
        Ok((w, h))
    }

    fn measure_flow_content(&self, node: DomId, avail: f32) -> Result<(f32, f32)> {
        let page = self.page;
        let node_style = &page.styles[node.0];
        let mut max_w = 0.0f32;
        let mut total_h = 0.0f32;
        let mut line_w = 0.0f32;
        let mut line_h = 0.0f32;

        for item in page.child_items(node)? {
            match item {
                ChildItem::Text(text) => {
                    if line_w == 0.0 && text.trim().is_empty() {
                        continue;
                    }
                    line_w += advance(&text, node_style);
                    line_h = line_h.max(line_height_of(node_style));
                }
                ChildItem::Element(child) => {
                    let child_style = &page.styles[child.0];
                    if prop(child_style, "display") == Some("none")
                        || is_out_of_flow(child_style)
                    {
                        continue;
                    }
                    let child_tag = page.tag(child)?;
                    if child_tag == "br" {
                        max_w = max_w.max(line_w);
                        total_h += line_h;
                        line_w = 0.0;
                        line_h = 0.0;
                        continue;
                    }
                    if is_inline_level(child_style) || is_replaced_tag(&child_tag) {
                        let (w, h) = self.measure_box(child, avail)?;
                        line_w += w;
                        line_h = line_h.max(h);
                    } else {
                        max_w = max_w.max(line_w);
                        total_h += line_h;
                        line_w = 0.0;
                        line_h = 0.0;
                        let margin = edge_values(child_style, "margin");
                        let (w, h) = self.measure_box(child, avail)?;
                        max_w = max_w.max(w + margin.horizontal());
                        total_h += h + margin.vertical();
                    }
                }
            }
        }
        max_w = max_w.max(line_w);
        total_h += line_h;
        Ok((max_w, total_h))
    }

    fn measure_flex_content(&self, node: DomId, avail: f32) -> Result<(f32, f32)> {
        let page = self.page;
        let style = &page.styles[node.0];
        let column = matches!(
            prop(style, "flex-direction"),
            Some("column") | Some("column-reverse")
        );
        let main_gap = if column {
            prop_px(style, "row-gap").unwrap_or(0.0)
        } else {
            prop_px(style, "column-gap").unwrap_or(0.0)
        };

        let mut sizes = Vec::new();
        for item in page.child_items(node)? {
            let ChildItem::Element(child) = item else {
                continue;
            };
            let child_style = &page.styles[child.0];
            if prop(child_style, "display") == Some("none") || is_out_of_flow(child_style) {
                continue;
            }
            sizes.push(self.measure_box(child, avail)?);
        }
        let gaps = main_gap * sizes.len().saturating_sub(1) as f32;
        if column {
            let w = sizes.iter().map(|(w, _)| *w).fold(0.0f32, f32::max);
            let h = sizes.iter().map(|(_, h)| *h).sum::<f32>() + gaps;
            Ok((w, h))
        } else {
            let w = sizes.iter().map(|(w, _)| *w).sum::<f32>() + gaps;
            let h = sizes.iter().map(|(_, h)| *h).fold(0.0f32, f32::max);
            Ok((w, h))
        }
    }
}

fn main_offset(justify: &str, extent: f32, total: f32) -> f32 {
    match justify {
        "center" => ((extent - total) / 2.0).max(0.0),
        "flex-end" | "end" => (extent - total).max(0.0),
        _ => 0.0,
    }
}

fn justify_extra(justify: &str, extent: f32, total: f32, count: usize) -> f32 {
    if justify == "space-between" && count > 1 {
        ((extent - total) / (count - 1) as f32).max(0.0)
    } else {
        0.0
    }
}

fn cross_offset(align: &str, extent: f32, size: f32) -> f32 {
    match align {
        "center" => ((extent - size) / 2.0).max(0.0),
        "flex-end" | "end" => (extent - size).max(0.0),
        _ => 0.0,
    }
}

fn replaced_size(page: &StaticPage, node: DomId, style: &StyleMap) -> Result<(f32, f32)> {
    let tag = page.tag(node)?;
    let attr_px = |name: &str| -> Result<Option<f32>> {
        Ok(page
            .element(node)?
            .value()
            .attr(name)
            .and_then(parse_px))
    };
    let (natural_w, natural_h) = match tag.as_str() {
        "img" => (attr_px("width")?.unwrap_or(0.0), attr_px("height")?.unwrap_or(0.0)),
        "svg" => {
            let view_box = page
                .element(node)?
                .value()
                .attr("viewBox")
                .and_then(parse_view_box);
            let (vb_w, vb_h) = view_box.unwrap_or((0.0, 0.0));
            (
                attr_px("width")?.unwrap_or(vb_w),
                attr_px("height")?.unwrap_or(vb_h),
            )
        }
        "textarea" => TEXTAREA_DEFAULT_SIZE,
        _ => INPUT_DEFAULT_SIZE,
    };
    Ok((
        prop_px(style, "width").unwrap_or(natural_w),
        prop_px(style, "height").unwrap_or(natural_h),
    ))
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
