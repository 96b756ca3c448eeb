//! Style and geometry extraction.
//!
//! [`extract`] walks a [`decal_engine::RenderedPage`] and flattens it into
//! the [`decal_ir::IrNode`] tree that crosses the serialization boundary.
//! Everything the reconstruction side needs is resolved here, while the
//! rendering engine is still reachable: geometry relative to each parent,
//! typed colors and lengths, merged or demoted text, self-contained svg
//! markup, and synthetic pseudo-element children.

use thiserror::Error;

use decal_engine::EngineError;

pub mod extractor;
pub mod style_map;

pub use extractor::{DEFAULT_SETTLE_PASSES, ExtractOptions, extract};
pub use style_map::{apply_text_style, surface_style};

/// Result type for extraction.
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Errors that abort extraction outright. Per-element oddities (missing
/// attributes, unparseable values) degrade to absent fields instead.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The designated root element has no usable rendered box.
    #[error("root element has no rendered box")]
    RootUnusable,

    /// The page backend failed to answer a query.
    #[error(transparent)]
    Engine(#[from] EngineError),
}
