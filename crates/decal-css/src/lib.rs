//! CSS value parsing shared by both sides of the import pipeline.
//!
//! Everything here is canvas-agnostic: colors normalize to one canonical
//! channel representation, linear gradients reduce to an axis transform plus
//! stops, and the helpers never error. An unrecognized value is "no value",
//! which callers treat as absent paint.

pub mod color;
pub mod gradient;
pub mod shadow;
pub mod values;

pub use color::{Rgba, normalize, parse_color, resolve_side_aggregate};
pub use gradient::{GradientStop, GradientTransform, LinearGradient, parse_linear_gradient};
pub use shadow::{BoxShadow, parse_box_shadow};
pub use values::{parse_px, split_top_level};
