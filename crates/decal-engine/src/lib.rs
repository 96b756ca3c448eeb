//! Rendered-page access for the import pipeline.
//!
//! Extraction never touches a DOM directly. It talks to a [`RenderedPage`]:
//! an engine that has parsed a document, resolved styles, and settled layout,
//! and can answer geometry and computed-style queries for opaque node
//! handles. [`StaticPage`] is the built-in deterministic backend; embedders
//! with a real browser engine implement the same trait.

pub mod error;
pub mod page;
pub mod static_page;

pub use error::{EngineError, Result};
pub use page::{ComputedStyle, DomId, PageRect, PseudoKind, RenderedPage, TextRun};
pub use static_page::StaticPage;
