//! Typography mapping between CSS font requests and canvas font identifiers.
//!
//! CSS speaks in family lists, numeric weights, and an italic flag. Font
//! catalogs speak in named styles ("SemiBold Italic") with inconsistent
//! spacing conventions. This crate bridges the two: a static alias table maps
//! web and system families onto catalog families, weights bucket into nine
//! named styles, and [`resolve_font`] walks a retry ladder of candidate
//! spellings until one loads.
//!
//! The [`policy`] module holds the text layout heuristics applied during
//! reconstruction (single-line detection, fixed-width promotion, alignment
//! anchoring). They are policy shared by every canvas backend, so they live
//! here next to the font mapping rather than in any one backend.

pub mod family;
pub mod ladder;
pub mod policy;

use thiserror::Error;

/// Errors that can occur while resolving fonts.
#[derive(Debug, Error)]
pub enum FontError {
    /// Every candidate spelling failed to load. Fatal for the text node that
    /// requested the font, recoverable for the rest of the tree.
    #[error("no loadable font style after {attempts} candidates")]
    LadderExhausted { attempts: usize },
}

pub type Result<T> = std::result::Result<T, FontError>;

pub use family::{CJK_FALLBACK_FAMILY, DEFAULT_FAMILY, ResolvedFamily, resolve_family};
pub use ladder::{
    FontCatalog, FontId, StaticCatalog, SystemCatalog, candidates, resolve_font, style_name,
    weight_bucket,
};
pub use policy::{
    FIXED_WIDTH_PROMOTION_FACTOR, HorizontalAnchor, SINGLE_LINE_HEIGHT_FACTOR, TextPlan,
    WidthMode, plan,
};
