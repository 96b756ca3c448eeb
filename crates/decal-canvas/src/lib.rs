//! Canvas-side reconstruction: turns an IR tree back into design-canvas
//! objects.
//!
//! - `canvas`: the [`Canvas`] collaborator trait plus its paint and text
//!   vocabulary
//! - `builder`: the per-node rebuild state machine ([`TreeBuilder`])
//! - `recording`: a deterministic in-memory [`Canvas`] used by tests and the
//!   CLI, with a serializable scene dump
//!
//! The builder never talks to a concrete backend. Creating primitives,
//! styling them, loading fonts, and measuring text all go through
//! [`Canvas`], so the same traversal drives the recording backend and any
//! real bridge alike.

mod builder;
mod canvas;
mod recording;

use decal_text::FontError;
use thiserror::Error;

/// Errors that can abort building a node. Failures below the root are caught
/// at the child loop and downgrade to a skipped subtree.
#[derive(Debug, Error)]
pub enum CanvasError {
    #[error(transparent)]
    Font(#[from] FontError),
}

pub type Result<T> = std::result::Result<T, CanvasError>;

pub use builder::{BuildOptions, BuildReport, BuildStats, TreeBuilder, reconstruct};
pub use canvas::{
    Canvas, CanvasId, Paint, SegmentSpan, Stroke, TextStyleSpec, to_gradient_paint, to_solid_paint,
};
pub use recording::{
    Recorded, RecordedText, RecordingCanvas, SceneKind, SceneNode, SceneSpan, SceneText,
    default_catalog,
};
