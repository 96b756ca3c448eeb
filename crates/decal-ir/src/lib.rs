//! Intermediate representation for imported documents.
//!
//! A rendered page is flattened into a tree of [`IrNode`] values: plain data,
//! parent-relative geometry, and a typed style record. The tree crosses the
//! process boundary as JSON inside an [`ImportRequest`] and is answered with
//! an [`ImportReply`]. [`schema`] validates either side of that exchange.

pub mod message;
pub mod node;
pub mod schema;
pub mod style;

pub use message::{ImportReply, ImportRequest};
pub use node::{AFTER_KIND, BEFORE_KIND, IrNode, IrRect, TEXT_KIND, TextSegment};
pub use style::{
    CornerRadii, Display, Edges, FlexHints, IrStyle, LayoutAlign, LayoutDirection, LayoutJustify,
    Overflow, Position, TextAlign, TextDecoration, weight_number,
};
