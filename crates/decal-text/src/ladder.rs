//! Weight bucketing and the font-candidate retry ladder.

use std::collections::HashSet;
use std::fmt;

use crate::family::{CJK_FALLBACK_FAMILY, DEFAULT_FAMILY, resolve_family};
use crate::{FontError, Result};

/// A concrete family + named style pair a catalog can try to load.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontId {
    pub family: String,
    pub style: String,
}

impl FontId {
    pub fn new(family: impl Into<String>, style: impl Into<String>) -> Self {
        Self { family: family.into(), style: style.into() }
    }
}

impl fmt::Display for FontId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.family, self.style)
    }
}

/// Maps a numeric CSS weight onto the nine conventional style buckets.
pub fn weight_bucket(weight: u16) -> &'static str {
    match ((weight + 50) / 100).clamp(1, 9) {
        1 => "Thin",
        2 => "ExtraLight",
        3 => "Light",
        4 => "Regular",
        5 => "Medium",
        6 => "SemiBold",
        7 => "Bold",
        8 => "ExtraBold",
        _ => "Black",
    }
}

/// Catalog style name for a weight, with the conventional italic spellings
/// ("Italic" alone for regular weight, "{bucket} Italic" otherwise).
pub fn style_name(weight: u16, italic: bool) -> String {
    let bucket = weight_bucket(weight);
    match (bucket, italic) {
        ("Regular", true) => "Italic".to_owned(),
        (_, true) => format!("{bucket} Italic"),
        (_, false) => bucket.to_owned(),
    }
}

/// "SemiBold" ↔ "Semi Bold": catalogs disagree on interior spacing. Returns
/// the spaced spelling when it differs from the input.
fn spaced_variant(style: &str) -> Option<String> {
    let mut out = String::with_capacity(style.len() + 1);
    let mut prev_lower = false;
    for ch in style.chars() {
        if ch.is_uppercase() && prev_lower {
            out.push(' ');
        }
        out.push(ch);
        prev_lower = ch.is_lowercase();
    }
    (out != style).then_some(out)
}

/// Ordered candidate list for a CSS font request: the resolved family's
/// spelling variants, the same ladder against the CJK fallback for
/// CJK-cluster families, and the universal default last.
pub fn candidates(family_list: &str, weight: u16, italic: bool) -> Vec<FontId> {
    let resolved = resolve_family(family_list);
    let mut out = Vec::new();
    push_family_ladder(&mut out, resolved.name, weight, italic);
    if resolved.cjk && resolved.name != CJK_FALLBACK_FAMILY {
        push_family_ladder(&mut out, CJK_FALLBACK_FAMILY, weight, italic);
    }
    let universal = FontId::new(DEFAULT_FAMILY, "Regular");
    if !out.contains(&universal) {
        out.push(universal);
    }
    out
}

fn push_family_ladder(out: &mut Vec<FontId>, family: &str, weight: u16, italic: bool) {
    let exact = style_name(weight, italic);
    let spaced = spaced_variant(&exact);
    let without_italic = if italic { Some(style_name(weight, false)) } else { None };

    let mut push = |style: &str| {
        let id = FontId::new(family, style);
        if !out.contains(&id) {
            out.push(id);
        }
    };
    push(&exact);
    if let Some(style) = &spaced {
        push(style);
    }
    if let Some(style) = &without_italic {
        push(style);
    }
    push("Regular");
}

/// A font catalog that can attempt to load one family+style pair at a time.
/// Loads are independent attempts; the resolver never inspects why one
/// failed, it just moves down the ladder.
pub trait FontCatalog {
    fn try_load(&mut self, id: &FontId) -> bool;
}

/// Walks the candidate ladder until the catalog loads one entry.
pub fn resolve_font(
    catalog: &mut dyn FontCatalog,
    family_list: &str,
    weight: u16,
    italic: bool,
) -> Result<FontId> {
    let ladder = candidates(family_list, weight, italic);
    let attempts = ladder.len();
    for id in ladder {
        if catalog.try_load(&id) {
            return Ok(id);
        }
    }
    Err(FontError::LadderExhausted { attempts })
}

/// Fixed catalog of known-loadable styles. The test and recording backends
/// use this in place of a real font service.
#[derive(Debug, Default)]
pub struct StaticCatalog {
    available: HashSet<FontId>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_styles(pairs: &[(&str, &str)]) -> Self {
        let mut catalog = Self::new();
        for (family, style) in pairs {
            catalog.add(family, style);
        }
        catalog
    }

    pub fn add(&mut self, family: &str, style: &str) {
        self.available.insert(FontId::new(family, style));
    }
}

impl FontCatalog for StaticCatalog {
    fn try_load(&mut self, id: &FontId) -> bool {
        self.available.contains(id)
    }
}

/// Catalog backed by the fonts installed on the running system.
pub struct SystemCatalog {
    db: fontdb::Database,
}

impl SystemCatalog {
    pub fn from_system() -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        Self { db }
    }
}

impl FontCatalog for SystemCatalog {
    fn try_load(&mut self, id: &FontId) -> bool {
        use fontdb::{Family, Query, Style, Weight};

        let (weight, italic) = parse_style_name(&id.style);
        self.db
            .query(&Query {
                families: &[Family::Name(id.family.as_str())],
                weight: Weight(weight),
                style: if italic { Style::Italic } else { Style::Normal },
                ..Query::default()
            })
            .is_some()
    }
}

/// Inverse of [`style_name`], for querying weight-indexed catalogs.
fn parse_style_name(style: &str) -> (u16, bool) {
    let italic = style == "Italic" || style.ends_with(" Italic");
    let base = style.strip_suffix(" Italic").unwrap_or(style);
    let base = if base == "Italic" { "Regular" } else { base };
    let compact: String = base.chars().filter(|c| !c.is_whitespace()).collect();
    let weight = match compact.as_str() {
        "Thin" => 100,
        "ExtraLight" => 200,
        "Light" => 300,
        "Medium" => 500,
        "SemiBold" => 600,
        "Bold" => 700,
        "ExtraBold" => 800,
        "Black" => 900,
        _ => 400,
    };
    (weight, italic)
}
